//! Pan/tilt distance scanner control over a framed serial link.
//!
//! scanlink talks to a two-servo scanner with a distance sensor using a
//! line-oriented `<tag><payload>\r\n` protocol, and sweeps it across a
//! pitch/yaw grid to collect calibrated distance readings.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream abstraction, serial backend and port discovery
//! - [`frame`]: message tags, line encoding/decoding and buffered I/O
//! - [`link`]: request/response sessions with the echo handshake
//! - [`scan`]: move/measure commands, calibration and grid sweeps

/// Re-export transport types.
pub mod transport {
    pub use scanlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use scanlink_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use scanlink_link::*;
}

/// Re-export scanner control types.
pub mod scan {
    pub use scanlink_scan::*;
}
