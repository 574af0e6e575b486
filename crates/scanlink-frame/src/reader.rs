use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use scanlink_transport::{Transport, TransportError};
use tracing::debug;

use crate::codec::{decode_line, Response};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;
const READ_CHUNK_SIZE: usize = 256;

/// Longest line kept while waiting for its terminator.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Default time to wait for a complete reply line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads `\n`-terminated lines from any `Read` stream.
///
/// Handles partial reads internally. The underlying stream is expected to
/// report "no data yet" as `TimedOut`/`WouldBlock`; the reader keeps polling
/// until its own deadline passes. The deadline also bounds a stream that keeps
/// delivering bytes without ever completing a line.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    timeout: Duration,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with the default timeout.
    pub fn new(inner: T) -> Self {
        Self::with_timeout(inner, DEFAULT_READ_TIMEOUT)
    }

    /// Create a new line reader with an explicit timeout.
    pub fn with_timeout(inner: T, timeout: Duration) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            timeout,
        }
    }

    /// Read the next complete line, terminator included (blocking).
    ///
    /// Returns `Ok(None)` if the deadline passes first or the pending line
    /// grows past [`MAX_LINE_LENGTH`]; any partial line read so far is dropped
    /// so that its tail cannot be mistaken for the next reply. Returns `Err(FrameError::ConnectionClosed)` on EOF with nothing
    /// buffered; EOF after a partial line yields that partial line.
    pub fn read_line(&mut self) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.buf.split_to(pos + 1).freeze()));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    if Instant::now() >= deadline {
                        return Ok(self.give_up("timeout"));
                    }
                    continue;
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(FrameError::ConnectionClosed);
                }
                return Ok(Some(self.buf.split().freeze()));
            }

            self.buf.extend_from_slice(&chunk[..read]);

            if self.buf.contains(&b'\n') {
                continue;
            }
            if self.buf.len() > MAX_LINE_LENGTH {
                return Ok(self.give_up("line too long"));
            }
            if Instant::now() >= deadline {
                return Ok(self.give_up("timeout"));
            }
        }
    }

    fn give_up(&mut self, reason: &str) -> Option<Bytes> {
        if !self.buf.is_empty() {
            debug!(bytes = self.buf.len(), reason, "dropping partial line");
            self.buf.clear();
        }
        None
    }

    /// Read and decode the next reply.
    ///
    /// A timed-out read decodes as the empty-line case.
    pub fn read_response(&mut self) -> Result<Response> {
        let response = match self.read_line()? {
            Some(line) => decode_line(&line),
            None => Response::empty(),
        };
        Ok(response)
    }

    /// Drop any buffered bytes that have not been returned yet.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of buffered bytes not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the line timeout for subsequent reads.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Current line timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<T: Transport> LineReader<T> {
    /// Create a line reader for a transport and apply `timeout` as its
    /// per-read timeout.
    pub fn with_transport(mut inner: T, timeout: Duration) -> Result<Self> {
        inner
            .set_read_timeout(timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_timeout(inner, timeout))
    }

    /// Drop buffered bytes here and in the transport.
    pub fn discard_input(&mut self) -> Result<()> {
        self.buf.clear();
        self.inner
            .discard_input()
            .map_err(transport_to_frame_error)
    }
}

fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
