//! This module defines the core data structures used across the review indexer.
//! It re-exports the review entity and its partial field set.

pub mod review;
pub mod review_fields;

pub use review::{Review, ReviewStatus, Tag};
pub use review_fields::ReviewFields;
