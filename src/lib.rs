//! # Rust Service Foundation
//!
//! Two pieces of infrastructure every service process leans on:
//!
//! - **Structured logging facade**: leveled, field-annotated logging with
//!   lazy formatting, caller attribution, a metrics hook for Error/Fatal
//!   records and a replaceable process-wide logger.
//! - **Hot-reloadable configuration**: a TOML snapshot store that swaps in a
//!   freshly decoded snapshot whenever the file changes, keeping the old one
//!   when an edit does not decode.
//!
//! ## Features
//!
//! - **Immutable loggers**: `with_field` derives a child, the parent is untouched
//! - **Pluggable sinks**: stdout, plain files, rotating files with retention
//! - **Testable termination**: Fatal and Panic go through a [`FatalHandler`]
//! - **Cancellable watch**: reloads run on one thread, stopped by its handle
//!
//! ```no_run
//! use rust_service_foundation::bootstrap::{self, StartupOptions};
//! use rust_service_foundation::{config, registry};
//!
//! let _watch = bootstrap::startup(
//!     "/etc/node/config.toml",
//!     StartupOptions::new().with_log_file("node"),
//! )
//! .unwrap();
//!
//! if let Some(addr) = config::server_addr() {
//!     registry::with_field("addr", addr).info("listening");
//! }
//! ```

pub mod appenders;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod macros;
pub mod registry;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, FileAppender, RotatingFileAppender};
    pub use crate::config::{ConfigStore, Snapshot};
    pub use crate::core::{
        FatalHandler, FieldValue, LogLevel, Logger, LoggerBuilder, LoggerError, Options,
        OutputFormat, Result, StackProvider,
    };
}

pub use appenders::{ConsoleAppender, FileAppender, RotatingFileAppender};
pub use config::{ConfigError, ConfigStore, Snapshot, WatchHandle};
pub use crate::core::{
    FatalHandler, FieldValue, Fields, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError,
    MetricsFunc, Options, Output, OutputFormat, ProcessExit, Result, StackProvider,
};
