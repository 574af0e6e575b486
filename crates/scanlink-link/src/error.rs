use scanlink_frame::Response;

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error (including `DeviceNotFound` from discovery).
    #[error("transport error: {0}")]
    Transport(#[from] scanlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] scanlink_frame::FrameError),

    /// The reply tag did not echo the request tag.
    #[error("protocol mismatch: sent {expected:?}, got {response}")]
    ProtocolMismatch { expected: char, response: Response },
}

impl LinkError {
    /// True if discovery found no device to open.
    pub fn is_device_not_found(&self) -> bool {
        matches!(
            self,
            LinkError::Transport(scanlink_transport::TransportError::DeviceNotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
