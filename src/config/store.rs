//! Hot-reloadable configuration store

use super::error::{ConfigError, Result};
use super::schema::Snapshot;
use super::watcher::{self, WatchHandle};
use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Holds the current [`Snapshot`].
///
/// The store starts out empty and becomes loaded on the first successful
/// [`load`](ConfigStore::load); a failed load never clears or alters what is
/// already there. Replacement is a single pointer swap under the write lock,
/// so readers see either the old snapshot or the new one, never a mix.
///
/// # Examples
///
/// ```
/// use rust_service_foundation::config::ConfigStore;
///
/// let store = ConfigStore::new();
/// assert!(store.get().is_none());
///
/// store.load_bytes(b"[server]\nhost = \"0.0.0.0\"\nport = 7000\n").unwrap();
/// assert_eq!(store.get().unwrap().server_addr(), "0.0.0.0:7000");
/// ```
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and decode `path`, then install the result.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Snapshot>> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        self.load_bytes(&bytes)
    }

    /// Decode `bytes` and install the result.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Arc<Snapshot>> {
        let snapshot = Snapshot::decode(bytes)?;
        Ok(self.replace(snapshot))
    }

    /// Install an already decoded snapshot.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// The current snapshot, or `None` before the first successful load.
    ///
    /// The returned value is a point-in-time view; a later reload does not
    /// change it.
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Reload `path` on every change until the returned handle is stopped or dropped.
    ///
    /// Fails when the file cannot be read or its directory cannot be
    /// monitored. Reload failures after that point are logged and the
    /// previous snapshot stays in place.
    pub fn watch(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<WatchHandle> {
        watcher::spawn(Arc::clone(self), path.as_ref())
    }
}

static GLOBAL: OnceLock<Arc<ConfigStore>> = OnceLock::new();

/// The process-wide store.
pub fn global() -> &'static Arc<ConfigStore> {
    GLOBAL.get_or_init(|| Arc::new(ConfigStore::new()))
}

/// Current snapshot of the process-wide store.
pub fn get() -> Option<Arc<Snapshot>> {
    global().get()
}

/// RPC server address from the current global snapshot, if loaded.
pub fn server_addr() -> Option<String> {
    get().map(|s| s.server_addr())
}

pub fn http_addr() -> Option<String> {
    get().map(|s| s.http_addr())
}

pub fn server_protocol() -> Option<String> {
    get().map(|s| s.server_protocol().to_string())
}
