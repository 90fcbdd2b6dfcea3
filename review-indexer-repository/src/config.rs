//! Configuration types for the review search index.

/// Default number of primary shards for a new review index.
const DEFAULT_NUMBER_OF_SHARDS: u32 = 1;

/// Default number of replicas for a new review index.
const DEFAULT_NUMBER_OF_REPLICAS: u32 = 1;

/// Configuration for the review search index.
///
/// All document operations go through `alias`. The physical index behind it is
/// versioned (`{alias}_v{version}`) so a new mapping can be rolled out by
/// building a new index and moving the alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// The alias name used for all document operations.
    pub alias: String,
    /// The version number of the physical index (e.g., 0 for "reviews_v0").
    pub version: u32,
    /// Number of primary shards used when the index is created.
    pub number_of_shards: u32,
    /// Number of replicas used when the index is created.
    pub number_of_replicas: u32,
}

impl IndexConfig {
    /// Create a new index configuration with default sharding.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
            number_of_shards: DEFAULT_NUMBER_OF_SHARDS,
            number_of_replicas: DEFAULT_NUMBER_OF_REPLICAS,
        }
    }

    /// Override the shard and replica counts.
    pub fn with_sharding(mut self, number_of_shards: u32, number_of_replicas: u32) -> Self {
        self.number_of_shards = number_of_shards;
        self.number_of_replicas = number_of_replicas;
        self
    }

    /// The name of the physical index behind the alias.
    pub fn versioned_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}
