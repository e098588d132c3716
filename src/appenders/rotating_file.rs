//! Rotating file appender with scheduled rotation and retention
//!
//! Files are named `<prefix>.<host>.<period>.log` inside a log directory,
//! where `<period>` is `YYYY-MM-DD` for daily rotation and `YYYY-MM-DD-HH`
//! for hourly rotation. When the period changes the current file is closed
//! (and optionally gzipped) and files whose period ended before the
//! retention window are deleted.

use crate::core::error::{LoggerError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DAILY_FORMAT: &str = "%Y-%m-%d";
const HOURLY_FORMAT: &str = "%Y-%m-%d-%H";

/// How often a new file is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPeriod {
    Hourly,
    #[default]
    Daily,
}

impl RotationPeriod {
    fn key(&self, at: &DateTime<Local>) -> String {
        match self {
            RotationPeriod::Hourly => at.format(HOURLY_FORMAT).to_string(),
            RotationPeriod::Daily => at.format(DAILY_FORMAT).to_string(),
        }
    }

    /// End of the period a key names, in local time.
    fn period_end(&self, key: &str) -> Option<DateTime<Local>> {
        let start = match self {
            RotationPeriod::Hourly => {
                NaiveDateTime::parse_from_str(&format!("{}:00:00", key), "%Y-%m-%d-%H:%M:%S")
                    .ok()?
            }
            RotationPeriod::Daily => NaiveDate::parse_from_str(key, DAILY_FORMAT)
                .ok()?
                .and_hms_opt(0, 0, 0)?,
        };
        let length = match self {
            RotationPeriod::Hourly => ChronoDuration::hours(1),
            RotationPeriod::Daily => ChronoDuration::days(1),
        };
        Local.from_local_datetime(&(start + length)).earliest()
    }
}

/// Configuration for rotating file appender
///
/// # Examples
///
/// ```
/// use rust_service_foundation::appenders::{RotationPeriod, RotationPolicy};
/// use std::time::Duration;
///
/// let policy = RotationPolicy::new()
///     .with_period(RotationPeriod::Daily)
///     .with_retention(Duration::from_secs(14 * 24 * 3600))
///     .with_compression(true);
/// assert_eq!(policy.period, RotationPeriod::Daily);
/// ```
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub period: RotationPeriod,
    /// Files whose period ended longer ago than this are deleted.
    pub retention: Duration,
    /// Whether to gzip files once they are rotated out
    pub compress: bool,
    /// Host identifier in file names; the machine hostname when unset.
    pub host: Option<String>,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            period: RotationPeriod::Daily,
            retention: Duration::from_secs(7 * 24 * 3600),
            compress: false,
            host: None,
        }
    }
}

impl RotationPolicy {
    /// Create a new rotation policy with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_period(mut self, period: RotationPeriod) -> Self {
        self.period = period;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// Rotating file appender
///
/// # Examples
///
/// ```no_run
/// use rust_service_foundation::appenders::{self, RotatingFileAppender};
/// use rust_service_foundation::Logger;
///
/// let appender = RotatingFileAppender::new("/var/log/gateway", "gateway").unwrap();
/// let logger = Logger::builder().output(appenders::shared(appender)).build();
/// logger.info("written to /var/log/gateway/gateway.<host>.<date>.log");
/// ```
pub struct RotatingFileAppender {
    dir: PathBuf,
    /// `<prefix>.<host>.`, shared by every file this appender owns.
    stem: String,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_key: String,
    current_path: PathBuf,
}

impl RotatingFileAppender {
    /// Create a daily rotating appender with a seven day retention window.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn new(dir: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        Self::with_policy(dir, prefix, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn with_policy(dir: impl AsRef<Path>, prefix: &str, policy: RotationPolicy) -> Result<Self> {
        Self::open_at(dir.as_ref(), prefix, policy, Local::now())
    }

    fn open_at(
        dir: &Path,
        prefix: &str,
        policy: RotationPolicy,
        now: DateTime<Local>,
    ) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", dir.display()),
                e,
            )
        })?;

        let host = policy.host.clone().unwrap_or_else(local_hostname);
        let mut appender = Self {
            dir: dir.to_path_buf(),
            stem: format!("{}.{}.", prefix, host),
            current_key: policy.period.key(&now),
            current_path: PathBuf::new(),
            policy,
            writer: None,
        };
        appender.open_current()?;
        appender.remove_expired(now);
        Ok(appender)
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.log", self.stem, key))
    }

    fn open_current(&mut self) -> Result<()> {
        let path = self.file_path(&self.current_key);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_appender(
                    path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;
        self.writer = Some(BufWriter::new(file));
        self.current_path = path;
        Ok(())
    }

    /// Close the current file and start the one for `key`.
    fn rotate(&mut self, key: String) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.current_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let finished = std::mem::take(&mut self.current_path);
        if self.policy.compress && finished.exists() {
            if let Err(e) = compress_file(&finished) {
                eprintln!("[WARN] Failed to compress rotated log {}: {}", finished.display(), e);
            }
        }

        self.current_key = key;
        self.open_current()
    }

    /// Delete files owned by this appender whose period ended before the retention window.
    fn remove_expired(&self, now: DateTime<Local>) {
        let retention = match ChronoDuration::from_std(self.policy.retention) {
            Ok(retention) => retention,
            Err(_) => return,
        };
        let cutoff = now - retention;

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("[WARN] Cannot scan log directory {}: {}", self.dir.display(), e);
                return;
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(key) = self.period_key_of(name) else { continue };
            if key == self.current_key {
                continue;
            }
            let expired = self
                .policy
                .period
                .period_end(key)
                .is_some_and(|end| end < cutoff);
            if expired {
                if let Err(e) = fs::remove_file(entry.path()) {
                    eprintln!("[WARN] Failed to remove expired log {}: {}", name, e);
                }
            }
        }
    }

    /// Period key embedded in one of our file names.
    fn period_key_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        let rest = name.strip_prefix(self.stem.as_str())?;
        rest.strip_suffix(".log.gz")
            .or_else(|| rest.strip_suffix(".log"))
    }

    fn write_at(&mut self, buf: &[u8], now: DateTime<Local>) -> io::Result<usize> {
        let key = self.policy.period.key(&now);
        if key != self.current_key {
            if let Err(e) = self.rotate(key) {
                eprintln!("[WARN] Log rotation failed: {}. Continuing with current file.", e);
            }
            self.remove_expired(now);
        }

        if self.writer.is_none() {
            self.open_current().map_err(io::Error::from)?;
        }
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "Writer not initialized")
        })?;
        let written = writer.write(buf)?;
        // Complete records go straight to disk.
        if buf[..written].ends_with(b"\n") {
            writer.flush()?;
        }
        Ok(written)
    }

    /// Path of the file currently written to
    #[must_use]
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

impl Write for RotatingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(buf, Local::now())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for RotatingFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}

fn local_hostname() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    if host.is_empty() {
        "localhost".to_string()
    } else {
        host
    }
}

/// Gzip `path` into `path.gz`, removing the original only once the archive is complete.
fn compress_file(path: &Path) -> Result<()> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);
    let mut tmp_name = gz_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| -> Result<()> {
        let mut input = io::BufReader::new(File::open(path).map_err(|e| {
            LoggerError::io_operation(
                "compress log file",
                format!("Failed to open file for compression: {}", path.display()),
                e,
            )
        })?);
        let output = BufWriter::new(File::create(&tmp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&tmp_path, &gz_path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return result;
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[WARN] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}
