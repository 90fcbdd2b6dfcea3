//! OpenSearch implementation of the review index provider.
//!
//! This module provides a concrete implementation of `ReviewIndexProvider`
//! using OpenSearch as the backend.

mod mappings;
mod provider;

pub use mappings::get_index_body;
pub use provider::OpenSearchProvider;
