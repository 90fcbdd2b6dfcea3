//! Decoder module for the review indexer.
//!
//! Turns raw log records into typed change events.

mod change_event_decoder;

pub use change_event_decoder::{ChangeEventDecoder, CHANGE_RECORD_VERSION};
