//! Configuration module for the review indexer.
//!
//! Reads settings from the environment and wires the pipeline dependencies.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{ConnectionMode, Settings};
