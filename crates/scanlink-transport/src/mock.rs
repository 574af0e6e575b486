//! In-memory transport for tests and simulated devices.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::Result;
use crate::traits::Transport;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// Mock transport.
///
/// Bytes queued with [`inject_read`](MockTransport::inject_read) are served to
/// readers; when a responder is installed, every complete line written
/// (terminated by `\n`) is passed to it and its output is queued for reading,
/// which makes the mock behave like a device answering commands. An empty read
/// queue blocks for the read timeout and then reports `TimedOut`, as a serial
/// port would.
///
/// Clones share state, so a test can keep a handle after moving the transport
/// into a link.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    written: Vec<u8>,
    pending_line: Vec<u8>,
    responder: Option<Responder>,
    read_timeout: Duration,
    discards: usize,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport with a 10ms read timeout.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                written: Vec::new(),
                pending_line: Vec::new(),
                responder: None,
                read_timeout: Duration::from_millis(10),
                discards: 0,
                closed: false,
            })),
        }
    }

    /// Create a mock that answers each written line with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let mock = Self::new();
        mock.lock().responder = Some(Box::new(responder));
        mock
    }

    /// Queue bytes to be read.
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().read_buffer.extend(data);
    }

    /// All bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Written bytes split into lines (terminators stripped).
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.lock().written)
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }

    /// Forget everything written so far.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// Number of times `discard_input` was called.
    pub fn discard_count(&self) -> usize {
        self.lock().discards
    }

    /// Simulate the device disconnecting: reads return EOF once drained.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let timeout = {
            let mut inner = self.lock();
            if !inner.read_buffer.is_empty() {
                let n = inner.read_buffer.len().min(buf.len());
                for (slot, byte) in buf.iter_mut().zip(inner.read_buffer.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if inner.closed {
                return Ok(0);
            }
            inner.read_timeout
        };

        std::thread::sleep(timeout);
        Err(std::io::Error::from(ErrorKind::TimedOut))
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.written.extend_from_slice(buf);

        for &byte in buf {
            inner.pending_line.push(byte);
            if byte != b'\n' {
                continue;
            }
            let line = std::mem::take(&mut inner.pending_line);
            if let Some(responder) = inner.responder.as_mut() {
                let reply = responder(&line);
                inner.read_buffer.extend(reply);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.lock().read_timeout = timeout;
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.lock().read_timeout
    }

    fn discard_input(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.read_buffer.clear();
        inner.discards += 1;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockTransport")
            .field("pending_read", &inner.read_buffer.len())
            .field("written", &inner.written.len())
            .field("responder", &inner.responder.is_some())
            .finish()
    }
}
