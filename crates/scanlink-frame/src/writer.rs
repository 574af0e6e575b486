use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::encode_frame;
use crate::error::{FrameError, Result};

/// Longest expected request line (`M-180+-180\r\n` plus slack).
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Writes complete frames to any `Write` stream.
///
/// A frame is fully encoded before the first byte goes out, so an invalid tag
/// or payload never leaves a partial frame on the wire.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode `tag ++ payload ++ "\r\n"`, write all of it and flush.
    pub fn send(&mut self, tag: char, payload: &str) -> Result<()> {
        self.buf.clear();
        encode_frame(tag, payload, &mut self.buf)?;

        let mut remaining = &self.buf[..];
        while !remaining.is_empty() {
            let written = retry(|| self.inner.write(remaining))?;
            if written == 0 {
                return Err(FrameError::ConnectionClosed);
            }
            remaining = &remaining[written..];
        }
        trace!(%tag, bytes = self.buf.len(), "frame written");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        retry(|| self.inner.flush())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Repeat `op` while it reports a transient condition.
fn retry<R>(mut op: impl FnMut() -> std::io::Result<R>) -> Result<R> {
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
