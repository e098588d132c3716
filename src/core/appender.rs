//! Shared byte sinks that formatted records are written to

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// A byte-stream destination shared by every logger built from one backend.
///
/// The mutex serializes concurrent writers, so the facade never takes a
/// lock of its own around a write.
pub type Output = Arc<Mutex<dyn Write + Send>>;

/// Wrap any writer as an [`Output`].
pub fn shared<W>(writer: W) -> Output
where
    W: Write + Send + 'static,
{
    Arc::new(Mutex::new(writer))
}
