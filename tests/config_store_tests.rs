//! Integration tests for the configuration store
//!
//! These tests verify:
//! - Load followed by get returns the decoded document
//! - Failed loads keep the previous snapshot
//! - Readers never observe a torn snapshot
//! - A live file watch picks up edits and can be stopped

use rust_service_foundation::config::{self, ConfigStore, RunMode, Snapshot};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BASE: &str = r#"
mode = "release"
token = "node-a"
log_dir = "/var/log/a/"
official_domain = "example.org"
alternate_domains = ["example.net"]

[server]
host = "0.0.0.0"
port = 7000
protocol = "tcp"

[http]
host = "0.0.0.0"
port = 8080

[limits]
api_message_size = 1048576
file_message_size = 8388608
"#;

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    done()
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn test_load_then_get_matches_document() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);

    let store = ConfigStore::new();
    store.load(&path).expect("valid config");
    let snapshot = store.get().expect("loaded");

    assert_eq!(snapshot.mode, RunMode::Release);
    assert_eq!(snapshot.token, "node-a");
    assert_eq!(snapshot.log_dir, Path::new("/var/log/a/"));
    assert_eq!(snapshot.server_addr(), "0.0.0.0:7000");
    assert_eq!(snapshot.http_addr(), "0.0.0.0:8080");
    assert_eq!(snapshot.server_protocol(), "tcp");
    assert_eq!(snapshot.limits.api_message_size, 1_048_576);
    assert!(snapshot.is_allowed_domain("example.net"));
    assert!(!snapshot.tls_enabled());
}

#[test]
fn test_malformed_reload_keeps_previous() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);

    let store = ConfigStore::new();
    let first = store.load(&path).unwrap();

    fs::write(&path, "[server\nport = 7000\n").unwrap();
    assert!(store.load(&path).is_err());
    fs::write(&path, "unknown_key = 1\n").unwrap();
    assert!(store.load(&path).is_err());

    assert!(Arc::ptr_eq(&first, &store.get().unwrap()));
}

#[test]
fn test_no_torn_reads() {
    let a = Snapshot::decode(BASE.as_bytes()).unwrap();
    let b = Snapshot::decode(
        BASE.replace("node-a", "node-b")
            .replace("/var/log/a/", "/var/log/b/")
            .replace("7000", "7001")
            .replace("8080", "8081")
            .as_bytes(),
    )
    .unwrap();

    let store = Arc::new(ConfigStore::new());
    store.replace(a.clone());
    let running = Arc::new(AtomicBool::new(true));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let running = Arc::clone(&running);
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                let mut reads = 0usize;
                while running.load(Ordering::Relaxed) {
                    let current = store.get().expect("loaded");
                    assert!(*current == a || *current == b, "torn snapshot observed");
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 0..2_000 {
        store.replace(if i % 2 == 0 { b.clone() } else { a.clone() });
    }
    running.store(false, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().expect("reader panicked") > 0);
    }
}

#[test]
fn test_watch_picks_up_log_dir_change() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);

    let store = Arc::new(ConfigStore::new());
    store.load(&path).unwrap();
    let earlier = store.get().unwrap();

    let handle = store.watch(&path).expect("watch setup");
    fs::write(&path, BASE.replace("/var/log/a/", "/var/log/b/")).unwrap();

    let reloaded = wait_until(Duration::from_secs(10), || {
        store.get().unwrap().log_dir == Path::new("/var/log/b/")
    });
    assert!(reloaded, "watch did not pick up the edit");

    assert_eq!(earlier.log_dir, Path::new("/var/log/a/"));
    assert_eq!(store.get().unwrap().token, "node-a");

    handle.stop();
}

#[test]
fn test_watch_readers_see_whole_documents_during_rewrites() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);
    let document_b = BASE.replace("node-a", "node-b").replace("/var/log/a/", "/var/log/b/");
    let a = Snapshot::decode(BASE.as_bytes()).unwrap();
    let b = Snapshot::decode(document_b.as_bytes()).unwrap();

    let store = Arc::new(ConfigStore::new());
    store.load(&path).unwrap();
    let handle = store.watch(&path).unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let reader = {
        let store = Arc::clone(&store);
        let running = Arc::clone(&running);
        let (a, b) = (a.clone(), b.clone());
        thread::spawn(move || {
            let mut foreign = 0usize;
            while running.load(Ordering::Relaxed) {
                let current = store.get().expect("loaded");
                if *current != a && *current != b {
                    foreign += 1;
                }
            }
            foreign
        })
    };

    for i in 0..40 {
        let content = if i % 2 == 0 { document_b.as_str() } else { BASE };
        fs::write(&path, content).unwrap();
        // Mostly bursts, with regular pauses long enough for a reload.
        let pause = if i % 5 == 4 { 250 } else { 5 };
        thread::sleep(Duration::from_millis(pause));
    }
    fs::write(&path, &document_b).unwrap();

    assert!(wait_until(Duration::from_secs(10), || *store.get().unwrap() == b));
    running.store(false, Ordering::Relaxed);
    handle.stop();

    assert_eq!(reader.join().expect("reader panicked"), 0);
}

#[test]
fn test_watch_survives_bad_edit() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);

    let store = Arc::new(ConfigStore::new());
    store.load(&path).unwrap();
    let handle = store.watch(&path).unwrap();

    fs::write(&path, "token = [\n").unwrap();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(store.get().unwrap().token, "node-a");

    fs::write(&path, BASE.replace("node-a", "node-c")).unwrap();
    assert!(wait_until(Duration::from_secs(10), || {
        store.get().unwrap().token == "node-c"
    }));
    assert!(handle.is_running());

    drop(handle);
}

#[test]
fn test_watch_setup_failure() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ConfigStore::new());

    let err = store.watch(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, config::ConfigError::Io { .. }));
}

#[test]
fn test_global_accessors_read_current_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, BASE);

    assert!(config::server_addr().is_none());
    config::global().load(&path).unwrap();

    assert_eq!(config::server_addr().as_deref(), Some("0.0.0.0:7000"));
    assert_eq!(config::http_addr().as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config::server_protocol().as_deref(), Some("tcp"));

    config::global().load_bytes(b"[server]\nhost = \"10.0.0.1\"\nport = 9\n").unwrap();
    assert_eq!(config::server_addr().as_deref(), Some("10.0.0.1:9"));
    assert_eq!(config::get().unwrap().server_protocol(), "");
}
