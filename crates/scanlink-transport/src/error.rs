/// Errors that can occur in scanner transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified serial port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Failed to enumerate serial ports on this host.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// A serial port control operation failed (timeouts, buffer clearing).
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No port candidate matched the discovery policy.
    #[error("no scanner device found ({hint})")]
    DeviceNotFound { hint: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;
