//! # dwarfdecl Utilities
//!
//! Shared helpers for the dwarfdecl workspace. At the moment that is the
//! logging setup built on `tracing`, shared by the CLI and the tests.

pub mod logging;

pub use logging::{
    default_log_file, init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
