use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A duplex byte stream connected to a scanner device.
///
/// Reads block for at most [`read_timeout`](Transport::read_timeout) and then
/// fail with [`ErrorKind::TimedOut`] (or [`ErrorKind::WouldBlock`]), which is
/// how serial ports report "no data yet". Framing layers build
/// read-until-terminator on top of that.
pub trait Transport: Read + Write + Send {
    /// Set the maximum time a single `read` call may block.
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Current read timeout.
    fn read_timeout(&self) -> Duration;

    /// Drop any bytes the device has sent that have not been read yet.
    fn discard_input(&mut self) -> Result<()>;

    /// Create a second handle to the same underlying device.
    ///
    /// Used to split one connection into independent reader and writer halves.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Transport name for diagnostics (port path, "mock", ...).
    fn name(&self) -> &str;
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, Some(timeout)).map_err(Into::into)
    }

    fn read_timeout(&self) -> Duration {
        std::os::unix::net::UnixStream::read_timeout(self)
            .ok()
            .flatten()
            .unwrap_or(Duration::ZERO)
    }

    fn discard_input(&mut self) -> Result<()> {
        self.set_nonblocking(true)?;
        let mut scratch = [0u8; 256];
        let drained = loop {
            match self.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => break Err(err),
            }
        };
        self.set_nonblocking(false)?;
        drained.map_err(Into::into)
    }

    fn try_clone(&self) -> Result<Self> {
        std::os::unix::net::UnixStream::try_clone(self).map_err(Into::into)
    }

    fn name(&self) -> &str {
        "unix-stream"
    }
}
