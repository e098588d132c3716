//! Appender implementations
//!
//! Every appender is a plain [`std::io::Write`]; wrap one with [`shared`] to
//! hand it to a logger as its [`Output`].

pub mod console;
pub mod file;
pub mod rotating_file;

pub use console::{ConsoleAppender, ConsoleStream};
pub use file::FileAppender;
pub use rotating_file::{RotatingFileAppender, RotationPeriod, RotationPolicy};

pub use crate::core::appender::{shared, Output};

/// Standard output as an [`Output`]. The default destination of every logger.
pub fn stdout() -> Output {
    shared(ConsoleAppender::new())
}

/// Standard error as an [`Output`].
pub fn stderr() -> Output {
    shared(ConsoleAppender::stderr())
}
