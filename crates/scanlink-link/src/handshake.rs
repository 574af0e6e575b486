use std::time::Duration;

use scanlink_frame::TEST;
use scanlink_transport::Transport;
use tracing::{debug, info, warn};

use crate::delay::Delay;
use crate::error::{LinkError, Result};
use crate::link::{Link, LinkState};

/// Nonce the firmware echoes back during the link test.
pub const DEFAULT_NONCE: &str = "12345";

/// Time the device needs after the port opens (boards reset on open).
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Configuration for the link-readiness handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Wait before the first attempt, covering the device boot/reset.
    pub settle_delay: Duration,
    /// Tag the handshake is sent with.
    pub tag: char,
    /// Payload the device must echo verbatim.
    pub nonce: String,
    /// Attempts before the link is declared degraded (minimum 1).
    pub attempts: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            tag: TEST,
            nonce: DEFAULT_NONCE.to_string(),
            attempts: 1,
        }
    }
}

/// Run the handshake on a freshly opened link.
///
/// Waits out the settle delay, then for each attempt discards buffered input
/// (boot banners, half-sent lines) and sends the nonce. A verified echo gives
/// [`LinkState::Ready`]. Exhausting the attempts gives
/// [`LinkState::Degraded`] and a warning; only transport and framing failures
/// are returned as errors.
pub fn perform_handshake<T, D>(
    link: &mut Link<T>,
    config: &HandshakeConfig,
    delay: &mut D,
) -> Result<LinkState>
where
    T: Transport,
    D: Delay + ?Sized,
{
    delay.delay(config.settle_delay);

    let attempts = config.attempts.max(1);
    let mut reason = String::new();

    for attempt in 1..=attempts {
        link.discard_input()?;

        match link.send_receive(config.tag, &config.nonce) {
            Ok(response) if response.data == config.nonce => {
                info!(attempt, "handshake echo verified");
                return Ok(LinkState::Ready);
            }
            Ok(response) => {
                reason = format!(
                    "echo mismatch: expected {:?}, got {:?}",
                    config.nonce, response.data
                );
            }
            Err(LinkError::ProtocolMismatch { response, .. }) => {
                reason = format!("no echo: {response}");
            }
            Err(err) => return Err(err),
        }

        debug!(attempt, %reason, "handshake attempt failed");
    }

    warn!(%reason, "handshake failed, continuing with degraded link");
    Ok(LinkState::Degraded(reason))
}

#[cfg(test)]
mod tests {
    use scanlink_frame::FrameError;
    use scanlink_transport::MockTransport;
    use tracing::Span;

    use super::*;
    use crate::delay::RecordingDelay;
    use crate::link::LinkConfig;

    fn config_with(handshake: HandshakeConfig) -> LinkConfig {
        LinkConfig {
            read_timeout: Duration::from_millis(20),
            handshake,
        }
    }

    #[test]
    fn custom_nonce_and_settle_delay() {
        let mock = MockTransport::with_responder(|line| line.to_vec());
        let config = config_with(HandshakeConfig {
            settle_delay: Duration::from_millis(250),
            nonce: "hello-scanner".to_string(),
            ..HandshakeConfig::default()
        });
        let mut delay = RecordingDelay::new();

        let link = Link::establish_with(mock.clone(), &config, Span::none(), &mut delay).unwrap();

        assert!(link.is_ready());
        assert_eq!(delay.total(), Duration::from_millis(250));
        assert_eq!(mock.written_lines(), vec!["Thello-scanner".to_string()]);
    }

    #[test]
    fn exhausted_attempts_report_last_reason() {
        let mock = MockTransport::with_responder(|_| b"T00000\r\n".to_vec());
        let config = config_with(HandshakeConfig {
            attempts: 3,
            ..HandshakeConfig::default()
        });
        let mut delay = RecordingDelay::new();

        let link = Link::establish_with(mock.clone(), &config, Span::none(), &mut delay).unwrap();

        assert_eq!(mock.written_lines().len(), 3);
        assert_eq!(mock.discard_count(), 3);
        assert_eq!(
            link.state(),
            &LinkState::Degraded(
                "echo mismatch: expected \"12345\", got \"00000\"".to_string()
            )
        );
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mock = MockTransport::with_responder(|line| line.to_vec());
        let config = config_with(HandshakeConfig {
            attempts: 0,
            ..HandshakeConfig::default()
        });
        let mut delay = RecordingDelay::new();

        let link = Link::establish_with(mock.clone(), &config, Span::none(), &mut delay).unwrap();
        assert!(link.is_ready());
        assert_eq!(mock.written_lines().len(), 1);
    }

    #[test]
    fn invalid_handshake_tag_is_an_error() {
        let mock = MockTransport::with_responder(|line| line.to_vec());
        let config = config_with(HandshakeConfig {
            tag: 'R',
            ..HandshakeConfig::default()
        });
        let mut delay = RecordingDelay::new();

        let result = Link::establish_with(mock.clone(), &config, Span::none(), &mut delay);
        assert!(matches!(
            result,
            Err(LinkError::Frame(FrameError::InvalidMessageType('R')))
        ));
        assert!(mock.written().is_empty());
    }
}
