use std::fmt;

/// Scanner axis, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pitch,
    Yaw,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pitch => f.write_str("pitch"),
            Axis::Yaw => f.write_str("yaw"),
        }
    }
}

/// Errors that can occur while driving the scanner.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Link-level error (transport, framing, protocol mismatch).
    #[error("link error: {0}")]
    Link(#[from] scanlink_link::LinkError),

    /// Requested angle is beyond the actuator limit.
    #[error("{axis} angle {angle} out of range (limit ±{limit})")]
    AngleOutOfRange { axis: Axis, angle: i32, limit: i32 },

    /// The device reported a zero settle time for a move.
    #[error("actuator did not acknowledge move to pitch {pitch}, yaw {yaw}")]
    ActuatorNotResponding { pitch: i32, yaw: i32 },

    /// The reply payload could not be interpreted.
    #[error("malformed {what} reply: {data:?}")]
    MalformedResponse { what: &'static str, data: String },

    /// Sweep resolution above the planner ceiling.
    #[error("resolution {resolution} too high (max {max})")]
    ResolutionTooHigh { resolution: usize, max: usize },

    /// Sweep resolution of zero.
    #[error("resolution must be at least 1")]
    ResolutionZero,
}

pub type Result<T> = std::result::Result<T, ScanError>;
