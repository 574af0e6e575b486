/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message tag is not in the send alphabet.
    #[error("invalid message type {0:?} (expected one of M, S, T)")]
    InvalidMessageType(char),

    /// The payload contains a line terminator and would split the frame.
    #[error("payload contains a line terminator")]
    InvalidPayload,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before any line data was received.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
