//! Process startup: load configuration, route logs, start the reload watch.
//!
//! Failures here stop the process through the registry's fatal path. Once the
//! watch is running, a bad edit is only logged and the previous snapshot
//! stays in force.

use crate::appenders::{self, RotatingFileAppender, RotationPolicy};
use crate::config::{self, ConfigStore, WatchHandle};
use crate::registry;
use std::path::Path;
use std::sync::Arc;

/// What [`startup`] does besides loading and watching the configuration.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Redirect the process logger to a rotating file under the snapshot's
    /// `log_dir`, named with this prefix.
    pub log_file_prefix: Option<String>,
    pub rotation: RotationPolicy,
}

impl StartupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_log_file(mut self, prefix: impl Into<String>) -> Self {
        self.log_file_prefix = Some(prefix.into());
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Bring up the process-wide configuration store from `path`.
///
/// On a load or watch setup failure a Fatal record is written, which exits
/// the process under the default fatal handler. The error is returned for
/// handlers that do not exit.
pub fn startup(path: impl AsRef<Path>, options: StartupOptions) -> config::Result<WatchHandle> {
    startup_with(config::global(), path, options)
}

/// [`startup`] against an explicit store.
pub fn startup_with(
    store: &Arc<ConfigStore>,
    path: impl AsRef<Path>,
    options: StartupOptions,
) -> config::Result<WatchHandle> {
    let path = path.as_ref();
    let log = registry::with_field("path", path.display().to_string());

    let snapshot = match store.load(path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log.with_error(&e).fatal("failed to load configuration");
            return Err(e);
        }
    };

    if let Some(prefix) = options.log_file_prefix.as_deref() {
        if snapshot.log_dir.as_os_str().is_empty() {
            log.warn("log_dir is not set, keeping current log output");
        } else {
            match RotatingFileAppender::with_policy(&snapshot.log_dir, prefix, options.rotation) {
                Ok(appender) => {
                    registry::with_field("log_dir", snapshot.log_dir.display().to_string())
                        .with_field("log_file", appender.current_path().display().to_string())
                        .info("redirecting logs to rotating file");
                    registry::set_output(appenders::shared(appender));
                }
                Err(e) => log
                    .with_field("log_dir", snapshot.log_dir.display().to_string())
                    .with_error(&e)
                    .error("cannot open log file, keeping current log output"),
            }
        }
    }

    match store.watch(path) {
        Ok(handle) => Ok(handle),
        Err(e) => {
            log.with_error(&e).fatal("failed to watch configuration");
            Err(e)
        }
    }
}
