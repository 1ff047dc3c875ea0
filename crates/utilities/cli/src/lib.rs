//! Shared CLI utilities for the supervisor binaries.

pub mod backtrace;

mod log;
pub use log::{FileLogConfig, LogArgs, LogConfig, LogRotation, StdoutLogConfig};

mod tracing;
pub use tracing::{LogFormat, init_test_tracing};
