use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::tags::{is_receive_tag, is_send_tag};

/// End-of-message terminator.
pub const EOM: &[u8; 2] = b"\r\n";

/// Data reported for an empty or timed-out read.
pub const EMPTY_DATA: &str = "EMPTY";

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬──────────────────┬───────────┐
/// │ Tag (1ch) │ Payload (UTF-8)  │ EOM       │
/// │ M / S / T │ no CR or LF      │ 0x0D 0x0A │
/// └───────────┴──────────────────┴───────────┘
/// ```
pub fn encode_frame(tag: char, payload: &str, dst: &mut BytesMut) -> Result<()> {
    if !is_send_tag(tag) {
        return Err(FrameError::InvalidMessageType(tag));
    }
    if payload.contains(['\r', '\n']) {
        return Err(FrameError::InvalidPayload);
    }

    let mut tag_buf = [0u8; 4];
    let tag = tag.encode_utf8(&mut tag_buf);

    dst.reserve(tag.len() + payload.len() + EOM.len());
    dst.put_slice(tag.as_bytes());
    dst.put_slice(payload.as_bytes());
    dst.put_slice(EOM);
    Ok(())
}

/// Type of a decoded reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// A recognized reply tag.
    Tag(char),
    /// Sentinel for lines that could not be attributed to a tag.
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Tag(tag) => write!(f, "{tag}"),
            MessageType::Error => f.write_str("ERROR"),
        }
    }
}

/// Decode status carried alongside every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    /// The leading character is not a known reply tag.
    UnrecognizedType,
    /// Nothing was read before the timeout.
    Empty,
}

impl ResponseCode {
    /// Numeric code as reported in diagnostics (0, 1, 2).
    pub fn code(self) -> u8 {
        match self {
            ResponseCode::Ok => 0,
            ResponseCode::UnrecognizedType => 1,
            ResponseCode::Empty => 2,
        }
    }
}

/// A decoded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub message_type: MessageType,
    pub data: String,
    pub code: ResponseCode,
}

impl Response {
    /// The reply produced by an empty or timed-out read.
    pub fn empty() -> Self {
        Self {
            message_type: MessageType::Error,
            data: EMPTY_DATA.to_string(),
            code: ResponseCode::Empty,
        }
    }

    /// True if the reply decoded cleanly.
    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }

    /// The reply tag, if one was recognized.
    pub fn tag(&self) -> Option<char> {
        match self.message_type {
            MessageType::Tag(tag) => Some(tag),
            MessageType::Error => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} (code {})",
            self.message_type,
            self.data,
            self.code.code()
        )
    }
}

/// Decode one received line.
///
/// The line may or may not still carry its terminator. Lines whose first
/// character is not a reply tag come back verbatim with
/// [`ResponseCode::UnrecognizedType`].
pub fn decode_line(raw: &[u8]) -> Response {
    if raw.is_empty() {
        return Response::empty();
    }

    let text = String::from_utf8_lossy(raw);
    let mut chars = text.chars();
    let Some(tag) = chars.next() else {
        return Response::empty();
    };

    if !is_receive_tag(tag) {
        return Response {
            message_type: MessageType::Error,
            data: text.into_owned(),
            code: ResponseCode::UnrecognizedType,
        };
    }

    let rest = chars.as_str();
    let data = rest.split(['\r', '\n']).next().unwrap_or_default();

    Response {
        message_type: MessageType::Tag(tag),
        data: data.to_string(),
        code: ResponseCode::Ok,
    }
}
