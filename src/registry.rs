//! Process-wide logger.
//!
//! One current [`Logger`] is reachable from anywhere in the process through
//! the free functions below. It starts out as a JSON logger at Info with
//! caller reporting on, writing to standard output, and can be replaced with
//! [`set_logger`] once configuration is available.
//!
//! Replacement is last-writer-wins. Swap the logger during startup, before
//! other threads begin logging; the holder lives until process exit.
//!
//! # Examples
//!
//! ```
//! use rust_service_foundation::registry;
//!
//! registry::with_field("request_id", "r-42").info("request accepted");
//! registry::warnf(format_args!("queue at {}%", 85));
//! ```

use crate::core::{
    FieldValue, LogLevel, Logger, MetricsFunc, OutputFormat, Output, StackProvider,
};
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;

struct Registry {
    logger: RwLock<Logger>,
    metrics: RwLock<Option<MetricsFunc>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry {
        logger: RwLock::new(default_logger()),
        metrics: RwLock::new(None),
    })
}

/// The logger the registry starts out with.
pub fn default_logger() -> Logger {
    Logger::builder()
        .formatter(OutputFormat::Json)
        .level(LogLevel::Info)
        .report_caller(true)
        .build()
}

/// The current logger. Cheap to call; the handle shares its backend with the registry.
pub fn logger() -> Logger {
    registry().logger.read().clone()
}

/// Replace the current logger, returning the previous one.
///
/// A metrics callback registered with [`set_metrics_func`] is installed on
/// the new logger.
pub fn set_logger(logger: Logger) -> Logger {
    let reg = registry();
    if let Some(func) = reg.metrics.read().clone() {
        logger.set_metrics_func(Some(func));
    }
    std::mem::replace(&mut *reg.logger.write(), logger)
}

/// Register (or clear) the observer of Error and Fatal records.
pub fn set_metrics_func(func: Option<MetricsFunc>) {
    let reg = registry();
    *reg.metrics.write() = func.clone();
    reg.logger.read().set_metrics_func(func);
}

pub fn enabled(level: LogLevel) -> bool {
    logger().enabled(level)
}

pub fn level() -> LogLevel {
    logger().level()
}

pub fn set_level(level: LogLevel) {
    logger().set_level(level);
}

pub fn output() -> Output {
    logger().output()
}

pub fn set_output(output: Output) {
    logger().set_output(output);
}

pub fn flush() -> std::io::Result<()> {
    logger().flush()
}

pub fn with_field<K, V>(key: K, value: V) -> Logger
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    logger().with_field(key, value)
}

pub fn with_fields<I, K, V>(fields: I) -> Logger
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    logger().with_fields(fields)
}

pub fn with_error(err: &(dyn StdError + 'static)) -> Logger {
    logger().with_error(err)
}

pub fn with_stack_error<E>(err: &E) -> Logger
where
    E: StackProvider + 'static,
{
    logger().with_stack_error(err)
}

#[track_caller]
pub fn log(level: LogLevel, message: impl fmt::Display) {
    logger().log(level, message);
}

#[track_caller]
pub fn logf(level: LogLevel, args: fmt::Arguments<'_>) {
    logger().logf(level, args);
}

#[track_caller]
pub fn log_named(level: &str, message: impl fmt::Display) {
    logger().log_named(level, message);
}

#[track_caller]
pub fn trace(message: impl fmt::Display) {
    logger().trace(message);
}

#[track_caller]
pub fn debug(message: impl fmt::Display) {
    logger().debug(message);
}

#[track_caller]
pub fn info(message: impl fmt::Display) {
    logger().info(message);
}

#[track_caller]
pub fn warn(message: impl fmt::Display) {
    logger().warn(message);
}

#[track_caller]
pub fn error(message: impl fmt::Display) {
    logger().error(message);
}

/// Log at Fatal, then run the current logger's fatal handler (exit code 1 by default).
#[track_caller]
pub fn fatal(message: impl fmt::Display) {
    logger().fatal(message);
}

#[track_caller]
pub fn panic(message: impl fmt::Display) {
    logger().panic(message);
}

#[track_caller]
pub fn tracef(args: fmt::Arguments<'_>) {
    logger().tracef(args);
}

#[track_caller]
pub fn debugf(args: fmt::Arguments<'_>) {
    logger().debugf(args);
}

#[track_caller]
pub fn infof(args: fmt::Arguments<'_>) {
    logger().infof(args);
}

#[track_caller]
pub fn warnf(args: fmt::Arguments<'_>) {
    logger().warnf(args);
}

#[track_caller]
pub fn errorf(args: fmt::Arguments<'_>) {
    logger().errorf(args);
}

#[track_caller]
pub fn fatalf(args: fmt::Arguments<'_>) {
    logger().fatalf(args);
}

#[track_caller]
pub fn panicf(args: fmt::Arguments<'_>) {
    logger().panicf(args);
}
