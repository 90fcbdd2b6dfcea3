//! # Review Indexer Shared
//!
//! This crate defines the review data structures shared across the review indexer.
//! It includes the full `Review` entity as stored in the source database and the
//! partial `ReviewFields` form carried by change events.

pub mod types;

pub use types::review::{Review, ReviewStatus, Tag};
pub use types::review_fields::ReviewFields;
