//! Tests for process startup
//!
//! Startup writes through the global logger, so tests serialize on one guard.

use parking_lot::{const_mutex, Mutex};
use rust_service_foundation::appenders::RotationPolicy;
use rust_service_foundation::bootstrap::{self, StartupOptions};
use rust_service_foundation::config::{ConfigError, ConfigStore};
use rust_service_foundation::core::{FatalHandler, Logger, Output};
use rust_service_foundation::registry;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

static GLOBAL_STATE: Mutex<()> = const_mutex(());

#[derive(Default)]
struct Recorder {
    fatal: Mutex<Vec<String>>,
}

/// Shares a [`Recorder`] with the logger (local newtype for the orphan rule).
struct SharedRecorder(Arc<Recorder>);

impl FatalHandler for SharedRecorder {
    fn on_fatal(&self, message: &str) {
        self.0.fatal.lock().push(message.to_string());
    }

    fn on_panic(&self, _message: &str) {}
}

fn install(recorder: &Arc<Recorder>) -> Arc<Mutex<Vec<u8>>> {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let output: Output = buffer.clone();
    registry::set_logger(
        Logger::builder()
            .output(output)
            .fatal_handler(SharedRecorder(Arc::clone(recorder)))
            .build(),
    );
    buffer
}

#[test]
fn test_startup_redirects_logs_and_watches() {
    let _guard = GLOBAL_STATE.lock();
    let recorder = Arc::new(Recorder::default());
    let console = install(&recorder);

    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        format!("log_dir = {:?}\n[server]\nport = 7000\n", log_dir.display().to_string()),
    )
    .unwrap();

    let store = Arc::new(ConfigStore::new());
    let options = StartupOptions::new()
        .with_log_file("node")
        .with_rotation(RotationPolicy::new().with_host("test-host"));
    let handle = bootstrap::startup_with(&store, &path, options).expect("startup");

    assert!(handle.is_running());
    assert_eq!(store.get().unwrap().server.port, 7000);
    assert!(recorder.fatal.lock().is_empty());

    registry::info("after redirect");
    registry::flush().unwrap();
    handle.stop();

    let files: Vec<_> = fs::read_dir(&log_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("node.test-host."), "unexpected file {}", name);
    assert!(fs::read_to_string(&files[0]).unwrap().contains("after redirect"));

    let console = String::from_utf8(console.lock().clone()).unwrap();
    assert!(console.contains("redirecting logs to rotating file"));
    assert!(!console.contains("after redirect"));
}

#[test]
fn test_startup_load_failure_is_fatal() {
    let _guard = GLOBAL_STATE.lock();
    let recorder = Arc::new(Recorder::default());
    let buffer = install(&recorder);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

    let store = Arc::new(ConfigStore::new());
    let err = bootstrap::startup_with(&store, &path, StartupOptions::new()).unwrap_err();

    assert!(matches!(err, ConfigError::Decode(_)));
    assert!(!store.is_loaded());
    assert_eq!(
        *recorder.fatal.lock(),
        vec!["failed to load configuration".to_string()]
    );

    let text = String::from_utf8(buffer.lock().clone()).unwrap();
    let record: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(record["level"], "fatal");
    assert_eq!(record["path"], path.display().to_string());
}

#[test]
fn test_startup_without_log_file_keeps_output() {
    let _guard = GLOBAL_STATE.lock();
    let recorder = Arc::new(Recorder::default());
    let buffer = install(&recorder);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "token = \"t\"\n").unwrap();

    let store = Arc::new(ConfigStore::new());
    let handle = bootstrap::startup_with(&store, &path, StartupOptions::new()).unwrap();
    registry::info("still here");
    drop(handle);

    let text = String::from_utf8(buffer.lock().clone()).unwrap();
    assert!(text.contains("still here"));
    assert!(recorder.fatal.lock().is_empty());
}
