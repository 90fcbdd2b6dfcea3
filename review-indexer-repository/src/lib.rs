//! # Review Indexer Repository
//!
//! This crate provides the trait and implementations for writing review
//! documents to the search index. It includes definitions for errors,
//! write results, index configuration, and a concrete implementation for
//! OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::IndexConfig;
pub use errors::IndexStoreError;
pub use interfaces::ReviewIndexProvider;
pub use opensearch::OpenSearchProvider;
pub use types::WriteResult;
