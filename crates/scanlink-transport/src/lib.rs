//! Serial transport abstraction for scanlink.
//!
//! Provides a unified byte-stream interface over:
//! - Serial ports (via the `serialport` crate)
//! - Unix stream sockets (simulators, tests)
//! - An in-memory mock (behind the `mock` feature)
//!
//! This is the lowest layer of scanlink. Everything else builds on top of the
//! [`Transport`] trait provided here. Port enumeration and ranking live in
//! [`discovery`] so the protocol layers never pick devices themselves.

pub mod discovery;
pub mod error;
pub mod serial;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use discovery::{
    available_candidates, discover, rank_candidates, select_candidates, DeviceMatcher,
    PortCandidate,
};
pub use error::{Result, TransportError};
pub use serial::{SerialStream, DEFAULT_BAUD_RATE};
pub use traits::Transport;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
