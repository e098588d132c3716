//! Background reload of a configuration file.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by writing a new file and renaming it over the old one
//! keep triggering reloads.

use super::error::{ConfigError, Result};
use super::store::ConfigStore;
use crate::registry;
use crossbeam_channel::{after, bounded, select, unbounded, Receiver, Sender};
use notify::{Event, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Running watch on one configuration file.
///
/// [`stop`](WatchHandle::stop) or dropping the handle ends the watch and
/// joins its thread.
#[derive(Debug)]
pub struct WatchHandle {
    path: PathBuf,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                eprintln!("[LOGGER ERROR] configuration watch thread panicked");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(crate) fn spawn(store: Arc<ConfigStore>, path: &Path) -> Result<WatchHandle> {
    fs::metadata(path).map_err(|e| ConfigError::io(path, e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (event_tx, event_rx) = unbounded();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // Receiver gone means the loop already stopped.
        let _ = event_tx.send(res);
    })
    .map_err(|e| ConfigError::watch(path, e))?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| ConfigError::watch(path, e))?;

    let (stop_tx, stop_rx) = bounded(1);
    let target = path.to_path_buf();
    let thread = thread::Builder::new()
        .name("config-watch".to_string())
        .spawn(move || {
            // Dropping the watcher ends event delivery, so it lives as long as the loop.
            let _watcher = watcher;
            run(&store, &target, &event_rx, &stop_rx);
        })
        .map_err(ConfigError::Spawn)?;

    registry::with_field("path", path.display().to_string()).info("watching configuration");

    Ok(WatchHandle {
        path: path.to_path_buf(),
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

/// Quiet period that ends a burst of file events.
pub(crate) const DEBOUNCE: Duration = Duration::from_millis(100);

/// Process events until a stop signal arrives or either channel closes.
pub(crate) fn run(
    store: &ConfigStore,
    path: &Path,
    events: &Receiver<notify::Result<Event>>,
    stop: &Receiver<()>,
) {
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(Ok(event)) => {
                    if is_write(&event) && names_file(&event, path) {
                        match settle(path, events, stop) {
                            Settled::Quiet => reload(store, path),
                            Settled::Closed => {
                                reload(store, path);
                                break;
                            }
                            Settled::Stopped => break,
                        }
                    }
                }
                Ok(Err(e)) => report_watch_error(path, &e),
                Err(_) => break,
            },
        }
    }
}

enum Settled {
    Quiet,
    Closed,
    Stopped,
}

/// Drain events until none has arrived for [`DEBOUNCE`].
///
/// An in-place rewrite truncates the file before writing it, so the first
/// event of a burst can see an empty or partial document.
fn settle(
    path: &Path,
    events: &Receiver<notify::Result<Event>>,
    stop: &Receiver<()>,
) -> Settled {
    loop {
        select! {
            recv(stop) -> _ => return Settled::Stopped,
            recv(events) -> msg => match msg {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => report_watch_error(path, &e),
                Err(_) => return Settled::Closed,
            },
            recv(after(DEBOUNCE)) -> _ => return Settled::Quiet,
        }
    }
}

fn report_watch_error(path: &Path, e: &notify::Error) {
    registry::with_field("path", path.display().to_string())
        .with_error(e)
        .error("configuration watch error");
}

fn is_write(event: &Event) -> bool {
    event.kind.is_modify() || event.kind.is_create()
}

fn names_file(event: &Event, path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

fn reload(store: &ConfigStore, path: &Path) {
    let log = registry::with_field("path", path.display().to_string());
    match read_populated(path).and_then(|bytes| store.load_bytes(&bytes)) {
        Ok(snapshot) => log
            .with_field("log_dir", snapshot.log_dir.display().to_string())
            .info("configuration reloaded"),
        Err(e) => log
            .with_error(&e)
            .error("configuration reload failed, keeping previous snapshot"),
    }
}

/// Read the source, refusing a document with no content.
fn read_populated(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConfigError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }
    Ok(bytes)
}
