//! Structured logging setup for iamgen.
//!
//! Console output (plain or JSON) on stderr, plus optional NDJSON file rotation.

pub mod logger;

pub use logger::{build_filter, init_logger, LOG_FILE_PREFIX};
