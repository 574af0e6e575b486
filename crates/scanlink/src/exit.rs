use std::fmt;
use std::io;

use scanlink_frame::{FrameError, ResponseCode};
use scanlink_link::LinkError;
use scanlink_scan::ScanError;
use scanlink_transport::TransportError;

// Exit codes follow sysexits-style ranges.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_NOT_FOUND: i32 = 4;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = io_code(err.kind());
    CliError::new(code, format!("{context}: {err}"))
}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => DEVICE_NOT_FOUND,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => FAILURE,
        _ => INTERNAL,
    }
}

fn serial_code(err: &serialport::Error) -> i32 {
    match err.kind() {
        serialport::ErrorKind::NoDevice => DEVICE_NOT_FOUND,
        serialport::ErrorKind::InvalidInput => USAGE,
        serialport::ErrorKind::Io(kind) => io_code(kind),
        serialport::ErrorKind::Unknown => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::DeviceNotFound { .. } => {
            CliError::new(DEVICE_NOT_FOUND, format!("{context}: {err}"))
        }
        TransportError::Open { ref source, .. }
        | TransportError::Enumerate(ref source)
        | TransportError::Serial(ref source) => {
            CliError::new(serial_code(source), format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidMessageType(_) | FrameError::InvalidPayload => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::ProtocolMismatch { ref response, .. } => {
            let code = if response.code == ResponseCode::Empty {
                TIMEOUT
            } else {
                DATA_INVALID
            };
            CliError::new(code, format!("{context}: {err}"))
        }
    }
}

pub fn scan_error(context: &str, err: ScanError) -> CliError {
    match err {
        ScanError::Link(err) => link_error(context, err),
        ScanError::AngleOutOfRange { .. }
        | ScanError::ResolutionTooHigh { .. }
        | ScanError::ResolutionZero => CliError::new(USAGE, format!("{context}: {err}")),
        ScanError::MalformedResponse { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ScanError::ActuatorNotResponding { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
