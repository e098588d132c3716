//! Configuration snapshot schema.
//!
//! A [`Snapshot`] is decoded wholesale from a TOML document. Unknown keys and
//! type mismatches fail the decode; keys that are absent take their zero
//! value.

use super::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deployment mode the process runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Debug,
    Release,
    Test,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Debug => "debug",
            RunMode::Release => "release",
            RunMode::Test => "test",
        }
    }
}

/// One immutable, fully decoded configuration value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Snapshot {
    pub mode: RunMode,

    /// Node token presented to peers.
    pub token: String,

    /// Directory log files are written to.
    pub log_dir: PathBuf,

    pub official_domain: String,
    pub alternate_domains: Vec<String>,

    /// Personal identifiers allowed to use this node.
    pub personal_allow_list: Vec<String>,
    /// Organization identifiers allowed to use this node.
    pub organization_allow_list: Vec<String>,

    pub server: ServerConfig,
    pub http: HttpConfig,
    pub limits: MessageLimits,
    pub tls: TlsConfig,
}

/// Bind address of the main RPC server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Transport name, e.g. `"tcp"`.
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Maximum message sizes in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageLimits {
    pub api_message_size: u64,
    pub file_message_size: u64,
}

/// PEM material paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    pub ca: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl Snapshot {
    /// Decode a snapshot from raw TOML bytes.
    pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
        let text = std::str::from_utf8(bytes)?;
        Ok(toml::from_str(text)?)
    }

    /// `host:port` of the RPC server.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// `host:port` of the HTTP server.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    pub fn server_protocol(&self) -> &str {
        &self.server.protocol
    }

    /// Whether `domain` is the official domain or one of the alternates.
    pub fn is_allowed_domain(&self, domain: &str) -> bool {
        !domain.is_empty()
            && (self.official_domain.eq_ignore_ascii_case(domain)
                || self
                    .alternate_domains
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(domain)))
    }

    /// Whether the server has a CA, certificate and key configured.
    pub fn tls_enabled(&self) -> bool {
        [&self.tls.ca, &self.tls.server_cert, &self.tls.server_key]
            .iter()
            .all(|p| !is_unset(p))
    }
}

fn is_unset(path: &Path) -> bool {
    path.as_os_str().is_empty()
}
