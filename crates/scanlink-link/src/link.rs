use std::fmt;
use std::time::Duration;

use scanlink_frame::{FrameWriter, LineReader, MessageType, Response, DEFAULT_READ_TIMEOUT};
use scanlink_transport::Transport;
use tracing::{debug, info_span, warn, Span};

use crate::delay::{Delay, ThreadDelay};
use crate::error::{LinkError, Result};
use crate::handshake::{perform_handshake, HandshakeConfig};

/// Readiness of a link after its handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// The device echoed the handshake nonce.
    Ready,
    /// The handshake did not verify; commands may still be attempted.
    Degraded(String),
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Ready => f.write_str("ready"),
            LinkState::Degraded(reason) => write!(f, "degraded ({reason})"),
        }
    }
}

/// Link behavior configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Maximum wait for a reply line.
    pub read_timeout: Duration,
    /// Handshake performed when the link is established.
    pub handshake: HandshakeConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            handshake: HandshakeConfig::default(),
        }
    }
}

/// A request/response session with one scanner device.
///
/// Owns the transport for its whole lifetime; dropping the link releases the
/// device. Exactly one request is in flight at a time.
pub struct Link<T> {
    name: String,
    reader: LineReader<T>,
    writer: FrameWriter<T>,
    state: LinkState,
    span: Span,
}

impl<T: Transport> Link<T> {
    /// Open a session on `stream` and run the handshake, sleeping through the
    /// device settle delay.
    pub fn establish(stream: T, config: &LinkConfig) -> Result<Self> {
        let span = info_span!("link", port = %stream.name());
        Self::establish_with(stream, config, span, &mut ThreadDelay)
    }

    /// Open a session with an explicit tracing span and delay source.
    ///
    /// All link logging is emitted inside `span`. A handshake that completes
    /// but does not verify yields a [`LinkState::Degraded`] link rather than
    /// an error; transport failures during the handshake are returned and the
    /// transport is released.
    pub fn establish_with<D: Delay + ?Sized>(
        stream: T,
        config: &LinkConfig,
        span: Span,
        delay: &mut D,
    ) -> Result<Self> {
        let mut link = Self::open(stream, config.read_timeout, span)?;
        let span = link.span.clone();
        let state = span.in_scope(|| perform_handshake(&mut link, &config.handshake, delay))?;
        link.state = state;
        Ok(link)
    }

    fn open(stream: T, read_timeout: Duration, span: Span) -> Result<Self> {
        let name = stream.name().to_string();
        let reader_stream = stream.try_clone()?;
        let reader = LineReader::with_transport(reader_stream, read_timeout)?;
        let writer = FrameWriter::new(stream);

        Ok(Self {
            name,
            reader,
            writer,
            state: LinkState::Ready,
            span,
        })
    }

    /// Encode and write one frame.
    ///
    /// An invalid tag fails before anything is written.
    pub fn send(&mut self, tag: char, payload: &str) -> Result<()> {
        let _entered = self.span.enter();
        self.writer.send(tag, payload)?;
        debug!(%tag, payload, "sent frame");
        Ok(())
    }

    /// Wait for the next reply line.
    ///
    /// Timeouts and unrecognized tags are returned as data (see
    /// [`ResponseCode`](scanlink_frame::ResponseCode)), not as errors.
    pub fn receive(&mut self) -> Result<Response> {
        let _entered = self.span.enter();
        let response = self.reader.read_response()?;
        debug!(%response, "received frame");
        Ok(response)
    }

    /// Send a request and wait for its reply.
    ///
    /// The reply must echo the request tag; anything else (a stale line, a
    /// timeout, garbage) fails with [`LinkError::ProtocolMismatch`]. Mismatches
    /// are not retried, since a retry on a desynchronized line tends to read
    /// the previous reply.
    pub fn send_receive(&mut self, tag: char, payload: &str) -> Result<Response> {
        self.send(tag, payload)?;
        let response = self.receive()?;

        if response.message_type != MessageType::Tag(tag) {
            let _entered = self.span.enter();
            warn!(expected = %tag, %response, "reply tag mismatch");
            return Err(LinkError::ProtocolMismatch {
                expected: tag,
                response,
            });
        }

        Ok(response)
    }

    /// Drop anything the device sent that has not been read.
    pub fn discard_input(&mut self) -> Result<()> {
        self.reader.discard_input()?;
        Ok(())
    }

    /// Handshake outcome.
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// True if the handshake verified.
    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    /// Transport name (port path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Span all link logging is recorded in.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Reply timeout.
    pub fn read_timeout(&self) -> Duration {
        self.reader.timeout()
    }

    /// Close the session and return the transport.
    pub fn into_inner(self) -> T {
        self.writer.into_inner()
    }
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}
