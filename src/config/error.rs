//! Error types for the configuration store

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration source could not be read
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source bytes are not UTF-8
    #[error("Configuration is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Document does not match the snapshot schema
    #[error("Failed to decode configuration: {0}")]
    Decode(#[from] toml::de::Error),

    /// Source was empty while a populated document was expected
    #[error("Configuration '{path}' is empty")]
    EmptyDocument { path: PathBuf },

    /// Monitoring the source could not be set up
    #[error("Failed to watch configuration '{path}': {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to spawn configuration watcher: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn watch(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        Self::Watch {
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from the document itself rather than from reaching it.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Encoding(_))
    }
}
