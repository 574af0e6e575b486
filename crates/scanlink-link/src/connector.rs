use std::time::Duration;

use scanlink_transport::{
    discover, select_candidates, DeviceMatcher, PortCandidate, SerialStream, Transport,
    TransportError, DEFAULT_BAUD_RATE,
};
use tracing::info;

use crate::error::Result;
use crate::link::{Link, LinkConfig};

/// Where and how to open a scanner connection.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Explicit port. When `None` the port is picked by discovery.
    pub port: Option<String>,
    /// Baud rate, fixed for the session.
    pub baud_rate: u32,
    /// Discovery ranking policy.
    pub matcher: DeviceMatcher,
    /// Session behavior.
    pub link: LinkConfig,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            matcher: DeviceMatcher::default(),
            link: LinkConfig::default(),
        }
    }
}

/// Resolve the port to open: the explicit one, or the best-ranked candidate.
pub fn select_port(config: &ConnectConfig) -> Result<String> {
    if let Some(port) = &config.port {
        return Ok(port.clone());
    }
    let ranked = discover(&config.matcher)?;
    first_candidate(ranked)
}

/// Like [`select_port`], but ranks an externally supplied candidate list.
pub fn select_port_from(candidates: Vec<PortCandidate>, config: &ConnectConfig) -> Result<String> {
    if let Some(port) = &config.port {
        return Ok(port.clone());
    }
    let ranked = select_candidates(candidates, &config.matcher)?;
    first_candidate(ranked)
}

fn first_candidate(ranked: Vec<PortCandidate>) -> Result<String> {
    let considered = ranked.len();
    let chosen = ranked
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::DeviceNotFound {
            hint: "no ranked candidates".to_string(),
        })?;
    info!(port = %chosen.port, description = ?chosen.description, considered, "selected scanner port");
    Ok(chosen.port)
}

/// Open the configured (or discovered) serial port and establish a link.
pub fn connect(config: &ConnectConfig) -> Result<Link<SerialStream>> {
    connect_with(config, SerialStream::open)
}

/// Like [`connect`], but the stream for the selected port comes from `open`,
/// called with the port name, baud rate and read timeout.
pub fn connect_with<T, F>(config: &ConnectConfig, open: F) -> Result<Link<T>>
where
    T: Transport,
    F: FnOnce(&str, u32, Duration) -> scanlink_transport::Result<T>,
{
    let port = select_port(config)?;
    let stream = open(&port, config.baud_rate, config.link.read_timeout)?;
    Link::establish(stream, &config.link)
}
