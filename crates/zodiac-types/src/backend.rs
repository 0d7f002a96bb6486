//! Byte-stream trait the transport and TLS layers are written against.

use std::io;
use std::time::Duration;

/// A bidirectional, blocking byte stream (TCP or TLS over TCP).
///
/// `Read`/`Write` carry the data. Errors stay as [`io::Error`] so the
/// transport can tell a timeout from a reset from a clean close.
/// Dropping the stream closes it.
pub trait NetworkStream: io::Read + io::Write + Send {
    /// Signal that no more data will be written.
    fn shutdown_write(&mut self) -> io::Result<()>;

    /// Bound how long a single `read` may block. `None` blocks forever.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}
