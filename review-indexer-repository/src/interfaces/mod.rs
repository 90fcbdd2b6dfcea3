//! Interface definitions for the index store.
//!
//! This module defines the abstract `ReviewIndexProvider` trait that allows
//! for dependency injection and swappable search backend implementations.

mod review_index_provider;

pub use review_index_provider::ReviewIndexProvider;
