//! Hot-reloadable configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → schema.rs (strict decode into Snapshot)
//!     → store.rs (pointer swap under the write lock)
//!     → readers take Arc<Snapshot> with get()
//!
//! On file change:
//!     watcher.rs receives the event
//!     → store reloads the file
//!     → failure: logged, previous snapshot kept
//! ```

pub mod error;
pub mod schema;
pub mod store;
pub mod watcher;

pub use error::{ConfigError, Result};
pub use schema::{HttpConfig, MessageLimits, RunMode, ServerConfig, Snapshot, TlsConfig};
pub use store::{get, global, http_addr, server_addr, server_protocol, ConfigStore};
pub use watcher::WatchHandle;
