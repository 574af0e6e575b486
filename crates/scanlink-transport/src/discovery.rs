//! Port discovery.
//!
//! Discovery is a policy over an externally supplied candidate list: the host
//! enumerates ports, a ranking function scores each one, and callers receive
//! the matches best-first. The protocol layers never enumerate ports
//! themselves.

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::error::{Result, TransportError};

/// A serial port that might host a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Port path or name (e.g. `/dev/ttyACM0`, `COM3`).
    pub port: String,
    /// Advertised device description (USB product string), if any.
    pub description: Option<String>,
    /// Advertised manufacturer, if any.
    pub manufacturer: Option<String>,
    /// USB vendor/product id, if the port is USB-backed.
    pub usb_id: Option<(u16, u16)>,
}

impl PortCandidate {
    /// Candidate with only a port name.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            description: None,
            manufacturer: None,
            usb_id: None,
        }
    }

    /// Attach an advertised description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<SerialPortInfo> for PortCandidate {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: info.port_name,
                description: usb.product,
                manufacturer: usb.manufacturer,
                usb_id: Some((usb.vid, usb.pid)),
            },
            _ => Self::new(info.port_name),
        }
    }
}

/// Default ranking policy: prefer an advertised description match, fall back
/// to a port-name substring match.
#[derive(Debug, Clone)]
pub struct DeviceMatcher {
    /// Case-insensitive substrings matched against description/manufacturer.
    pub descriptions: Vec<String>,
    /// Substrings matched against the port name.
    pub port_names: Vec<String>,
}

impl Default for DeviceMatcher {
    fn default() -> Self {
        Self {
            descriptions: vec!["arduino".to_string()],
            port_names: vec![
                "ttyACM".to_string(),
                "ttyUSB".to_string(),
                "usbmodem".to_string(),
            ],
        }
    }
}

impl DeviceMatcher {
    /// Rank score for a candidate. Lower is better; `None` rejects it.
    pub fn score(&self, candidate: &PortCandidate) -> Option<u32> {
        let advertised = [&candidate.description, &candidate.manufacturer];
        let described = advertised.iter().filter_map(|field| field.as_deref()).any(|text| {
            let text = text.to_ascii_lowercase();
            self.descriptions
                .iter()
                .any(|needle| text.contains(&needle.to_ascii_lowercase()))
        });
        if described {
            return Some(0);
        }

        if self
            .port_names
            .iter()
            .any(|needle| candidate.port.contains(needle.as_str()))
        {
            return Some(1);
        }

        None
    }

    fn hint(&self) -> String {
        format!(
            "no port advertised {:?} or was named like {:?}",
            self.descriptions, self.port_names
        )
    }
}

/// Filter and order candidates with an arbitrary ranking function.
///
/// Candidates the function rejects are dropped; ties keep enumeration order.
pub fn rank_candidates<F>(candidates: Vec<PortCandidate>, rank: F) -> Vec<PortCandidate>
where
    F: Fn(&PortCandidate) -> Option<u32>,
{
    let mut scored: Vec<(u32, PortCandidate)> = candidates
        .into_iter()
        .filter_map(|candidate| rank(&candidate).map(|score| (score, candidate)))
        .collect();
    scored.sort_by_key(|(score, _)| *score);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Enumerate the serial ports present on this host.
pub fn available_candidates() -> Result<Vec<PortCandidate>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports.into_iter().map(PortCandidate::from).collect())
}

/// Rank the supplied candidates with `matcher`, failing if none match.
pub fn select_candidates(
    candidates: Vec<PortCandidate>,
    matcher: &DeviceMatcher,
) -> Result<Vec<PortCandidate>> {
    let ranked = rank_candidates(candidates, |candidate| matcher.score(candidate));
    if ranked.is_empty() {
        return Err(TransportError::DeviceNotFound {
            hint: matcher.hint(),
        });
    }
    Ok(ranked)
}

/// Enumerate host ports and rank them with `matcher`.
pub fn discover(matcher: &DeviceMatcher) -> Result<Vec<PortCandidate>> {
    select_candidates(available_candidates()?, matcher)
}
