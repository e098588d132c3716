//! Core logger types and traits

pub mod appender;
pub mod error;
pub mod fields;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod output_format;

pub use appender::{shared, Output};
pub use error::{LoggerError, Result};
pub use fields::{ErrorValue, FieldValue, Fields, StackProvider};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{
    FatalHandler, Logger, LoggerBuilder, MetricsFunc, Options, ProcessExit, LEVEL_ERROR_KEY,
    REQUESTED_LEVEL_KEY,
};
pub use output_format::{Formatter, OutputFormat};
