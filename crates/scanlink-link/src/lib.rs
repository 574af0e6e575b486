//! Request/response session management for scanlink.
//!
//! A [`Link`] owns one device connection, verifies it with an echo
//! handshake, and enforces that every reply echoes the tag of its request.

pub mod connector;
pub mod delay;
pub mod error;
pub mod handshake;
pub mod link;

pub use connector::{connect, connect_with, select_port, select_port_from, ConnectConfig};
pub use delay::{Delay, RecordingDelay, ThreadDelay};
pub use error::{LinkError, Result};
pub use handshake::{perform_handshake, HandshakeConfig, DEFAULT_NONCE, DEFAULT_SETTLE_DELAY};
pub use link::{Link, LinkConfig, LinkState};
