//! Main logger implementation
//!
//! A [`Logger`] is a cheap, immutable handle: a shared backend (threshold,
//! output, formatter, metrics hook, fatal handler) plus the field set owned
//! by this particular instance. `with_*` methods return a new handle with an
//! extended field set and leave the receiver untouched.
//!
//! The backend is the one piece of shared mutable state. [`Logger::set_level`]
//! and [`Logger::set_output`] change it for every logger derived from the same
//! construction call, children included. Those setters race with concurrent
//! log calls; nothing stronger than the backend's own locks is guaranteed.

use super::{
    appender::Output,
    fields::{FieldValue, Fields, StackProvider, ERROR_KEY, ERROR_STACK_KEY, FILE_KEY},
    log_entry::LogEntry,
    log_level::LogLevel,
    output_format::{Formatter, OutputFormat},
};
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::Arc;

/// Observer notified with the level tag (`"ERROR"`, `"FATAL"`) of alerting records.
///
/// Runs synchronously on the logging thread. It is neither timed out nor
/// isolated: a panic inside it unwinds into the caller of the log method.
pub type MetricsFunc = Arc<dyn Fn(&str) + Send + Sync>;

/// Field set when a level name could not be resolved.
pub const LEVEL_ERROR_KEY: &str = "level_error";
/// The unresolved level name.
pub const REQUESTED_LEVEL_KEY: &str = "requested_level";

/// Termination path taken after a Fatal or Panic record has been written.
pub trait FatalHandler: Send + Sync {
    /// Called after a Fatal record. The process handler exits with code 1.
    fn on_fatal(&self, message: &str);

    /// Called after a Panic record. The process handler panics with `message`.
    fn on_panic(&self, message: &str);
}

/// Default [`FatalHandler`]: exit on Fatal, unwind on Panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl FatalHandler for ProcessExit {
    fn on_fatal(&self, _message: &str) {
        std::process::exit(1);
    }

    fn on_panic(&self, message: &str) {
        panic!("{}", message);
    }
}

/// Construction-time options. Read once by [`Logger::new`].
#[derive(Clone)]
pub struct Options {
    pub output: Output,
    pub level: LogLevel,
    pub formatter: OutputFormat,
    pub enable_html_escape: bool,
    pub report_caller: bool,
    /// Path segment caller locations are trimmed to, e.g. `"my-service/"`.
    pub caller_marker: Option<String>,
    /// Colour level tokens in text output.
    pub colors: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output: crate::appenders::stdout(),
            level: LogLevel::Info,
            formatter: OutputFormat::Json,
            enable_html_escape: false,
            report_caller: false,
            caller_marker: None,
            colors: false,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("level", &self.level)
            .field("formatter", &self.formatter)
            .field("enable_html_escape", &self.enable_html_escape)
            .field("report_caller", &self.report_caller)
            .field("caller_marker", &self.caller_marker)
            .field("colors", &self.colors)
            .finish_non_exhaustive()
    }
}

struct Backend {
    level: RwLock<LogLevel>,
    output: RwLock<Output>,
    formatter: Formatter,
    metrics: RwLock<Option<MetricsFunc>>,
    fatal_handler: Arc<dyn FatalHandler>,
}

impl Backend {
    fn write(&self, entry: &LogEntry) {
        let line = self.formatter.format(entry);
        let output = Arc::clone(&self.output.read());
        let mut writer = output.lock();
        if let Err(e) = writer.write_all(line.as_bytes()) {
            eprintln!("[LOGGER ERROR] Failed to write log entry: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct Logger {
    backend: Arc<Backend>,
    fields: Arc<Fields>,
    report_caller: bool,
    caller_marker: Option<Arc<str>>,
}

impl Logger {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self::with_handler(options, Arc::new(ProcessExit))
    }

    fn with_handler(options: Options, fatal_handler: Arc<dyn FatalHandler>) -> Self {
        let formatter = Formatter::new(options.formatter)
            .with_html_escape(options.enable_html_escape)
            .with_colors(options.colors);

        Self {
            backend: Arc::new(Backend {
                level: RwLock::new(options.level),
                output: RwLock::new(options.output),
                formatter,
                metrics: RwLock::new(None),
                fatal_handler,
            }),
            fields: Arc::new(Fields::new()),
            report_caller: options.report_caller,
            caller_marker: options.caller_marker.map(Arc::from),
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_service_foundation::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .level(LogLevel::Debug)
    ///     .formatter(OutputFormat::Text)
    ///     .report_caller(true)
    ///     .build();
    /// logger.debug("ready");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Whether a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= *self.backend.level.read()
    }

    pub fn level(&self) -> LogLevel {
        *self.backend.level.read()
    }

    /// Change the threshold of the shared backend.
    pub fn set_level(&self, level: LogLevel) {
        *self.backend.level.write() = level;
    }

    pub fn output(&self) -> Output {
        Arc::clone(&self.backend.output.read())
    }

    /// Redirect the shared backend. Records already being written finish on the old output.
    pub fn set_output(&self, output: Output) {
        *self.backend.output.write() = output;
    }

    pub fn set_metrics_func(&self, func: Option<MetricsFunc>) {
        *self.backend.metrics.write() = func;
    }

    pub fn metrics_func(&self) -> Option<MetricsFunc> {
        self.backend.metrics.read().clone()
    }

    pub fn reports_caller(&self) -> bool {
        self.report_caller
    }

    /// Fields owned by this instance.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn flush(&self) -> std::io::Result<()> {
        let output = self.output();
        let mut writer = output.lock();
        writer.flush()
    }

    /// Derive a logger carrying one more field.
    #[must_use]
    pub fn with_field<K, V>(&self, key: K, value: V) -> Logger
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.with_fields([(key, value)])
    }

    /// Derive a logger carrying extra fields. New keys shadow inherited ones.
    #[must_use]
    pub fn with_fields<I, K, V>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut merged = (*self.fields).clone();
        for (key, value) in fields {
            let key = key.into();
            let value = value.into();
            if self.report_caller && key == ERROR_KEY {
                if let Some(frames) = value.stack() {
                    merged.insert(ERROR_STACK_KEY.to_string(), frames.join(";").into());
                }
            }
            merged.insert(key, value);
        }

        Logger {
            backend: Arc::clone(&self.backend),
            fields: Arc::new(merged),
            report_caller: self.report_caller,
            caller_marker: self.caller_marker.clone(),
        }
    }

    /// Attach an error under the `"error"` key.
    #[must_use]
    pub fn with_error(&self, err: &(dyn StdError + 'static)) -> Logger {
        self.with_field(ERROR_KEY, FieldValue::from_error(err))
    }

    /// Attach an error that exposes its stack; with caller reporting on, the
    /// frames also land in `"err.stack"`.
    #[must_use]
    pub fn with_stack_error<E>(&self, err: &E) -> Logger
    where
        E: StackProvider + 'static,
    {
        self.with_field(ERROR_KEY, FieldValue::from_stack_error(err))
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.dispatch(level, &message);
    }

    #[track_caller]
    pub fn logf(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.dispatch(level, &args);
    }

    /// Log at a level given by name.
    ///
    /// An unknown name is not an error for the caller: the message is written
    /// at Warn with `level_error` and `requested_level` fields instead.
    #[track_caller]
    pub fn log_named(&self, level: &str, message: impl fmt::Display) {
        match LogLevel::resolve(level) {
            Some(resolved) => self.dispatch(resolved, &message),
            None => self
                .with_field(LEVEL_ERROR_KEY, "unknown logger level")
                .with_field(REQUESTED_LEVEL_KEY, level)
                .emit(LogLevel::Warn, &message),
        }
    }

    #[track_caller]
    fn dispatch(&self, level: LogLevel, message: &dyn fmt::Display) {
        match level {
            LogLevel::Fatal | LogLevel::Panic => {
                let rendered = message.to_string();
                self.emit(level, &rendered);
                if let Err(e) = self.flush() {
                    eprintln!("[LOGGER ERROR] Failed to flush before termination: {}", e);
                }
                if level == LogLevel::Fatal {
                    self.backend.fatal_handler.on_fatal(&rendered);
                } else {
                    self.backend.fatal_handler.on_panic(&rendered);
                }
            }
            _ => self.emit(level, message),
        }
    }

    #[track_caller]
    fn emit(&self, level: LogLevel, message: &dyn fmt::Display) {
        if !self.enabled(level) {
            return;
        }

        let mut fields = (*self.fields).clone();
        if self.report_caller {
            let location = Location::caller();
            fields.insert(
                FILE_KEY.to_string(),
                format!(
                    "{}:{}",
                    trim_caller_path(location.file(), self.caller_marker.as_deref()),
                    location.line()
                )
                .into(),
            );
        }

        let entry = LogEntry::new(level, &message.to_string(), fields);
        self.backend.write(&entry);

        if level.is_alerting() {
            // Clone out so the callback can re-register without deadlocking.
            let metrics = self.metrics_func();
            if let Some(func) = metrics {
                func(level.as_str());
            }
        }
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Trace, &message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Debug, &message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Info, &message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Warn, &message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Error, &message);
    }

    /// Log at Fatal, then hand over to the fatal handler (process exit by default).
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Fatal, &message);
    }

    /// Log at Panic, then hand over to the fatal handler (unwind by default).
    #[track_caller]
    pub fn panic(&self, message: impl fmt::Display) {
        self.dispatch(LogLevel::Panic, &message);
    }

    #[inline]
    #[track_caller]
    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Trace, &args);
    }

    #[inline]
    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Debug, &args);
    }

    #[inline]
    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Info, &args);
    }

    #[inline]
    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Warn, &args);
    }

    #[inline]
    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Error, &args);
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Fatal, &args);
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) {
        self.dispatch(LogLevel::Panic, &args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("fields", &self.fields)
            .field("report_caller", &self.report_caller)
            .finish_non_exhaustive()
    }
}

/// Drop everything before `marker` so locations read the same on every build host.
fn trim_caller_path<'a>(file: &'a str, marker: Option<&str>) -> &'a str {
    match marker {
        Some(marker) if !marker.is_empty() => match file.find(marker) {
            Some(idx) => &file[idx..],
            None => file,
        },
        _ => file,
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_service_foundation::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Warn)
///     .output(rust_service_foundation::appenders::stderr())
///     .html_escape(true)
///     .build();
/// assert!(!logger.enabled(LogLevel::Info));
/// ```
pub struct LoggerBuilder {
    options: Options,
    fatal_handler: Arc<dyn FatalHandler>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            fatal_handler: Arc::new(ProcessExit),
        }
    }

    /// Start from existing options.
    pub fn from_options(options: Options) -> Self {
        Self {
            options,
            fatal_handler: Arc::new(ProcessExit),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.options.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output(mut self, output: Output) -> Self {
        self.options.output = output;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, format: OutputFormat) -> Self {
        self.options.formatter = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn html_escape(mut self, enabled: bool) -> Self {
        self.options.enable_html_escape = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn report_caller(mut self, enabled: bool) -> Self {
        self.options.report_caller = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn caller_marker(mut self, marker: impl Into<String>) -> Self {
        self.options.caller_marker = Some(marker.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enabled: bool) -> Self {
        self.options.colors = enabled;
        self
    }

    /// Replace the termination path, e.g. with a recorder in tests.
    #[must_use = "builder methods return a new value"]
    pub fn fatal_handler<H: FatalHandler + 'static>(mut self, handler: H) -> Self {
        self.fatal_handler = Arc::new(handler);
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        Logger::with_handler(self.options, self.fatal_handler)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
