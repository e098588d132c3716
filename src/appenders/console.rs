//! Console appender implementation

use std::io::{self, Write};

/// Which standard stream a [`ConsoleAppender`] writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

/// Writes formatted records to a standard stream, flushing after every line.
///
/// The standard handles are line buffered only on terminals; flushing on
/// newline keeps ordering intact when the output is piped to a collector.
#[derive(Debug, Default)]
pub struct ConsoleAppender {
    stream: ConsoleStream,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stderr() -> Self {
        Self {
            stream: ConsoleStream::Stderr,
        }
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }
}

impl Write for ConsoleAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream {
            ConsoleStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf)?;
                if buf.ends_with(b"\n") {
                    out.flush()?;
                }
            }
            ConsoleStream::Stderr => io::stderr().lock().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }
}
