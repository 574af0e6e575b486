use scanlink_frame::{MOVE, REPLY, SENSOR, TEST};
use scanlink_transport::MockTransport;

/// In-process stand-in for the scanner firmware, driven by `--simulate`.
///
/// Echoes link tests, acknowledges moves with a settle time proportional to
/// the largest axis travel, and reports two sensor samples that vary with
/// the current orientation.
#[derive(Debug, Clone, Default)]
pub struct SimulatedScanner {
    pitch: i32,
    yaw: i32,
}

impl SimulatedScanner {
    /// Base settle time, in device units, for any move.
    const SETTLE_BASE: u32 = 1;
    /// Degrees of travel per additional settle unit.
    const DEGREES_PER_UNIT: u32 = 45;

    /// Answer one request line (terminator included).
    pub fn respond(&mut self, line: &[u8]) -> Vec<u8> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches(['\r', '\n']);
        let mut chars = text.chars();
        let tag = chars.next();
        let payload = chars.as_str();

        let reply = match tag {
            Some(TEST) => format!("{TEST}{payload}"),
            Some(MOVE) => format!("{MOVE}{}", self.apply_move(payload)),
            Some(SENSOR) => {
                let (near, far) = self.samples();
                format!("{SENSOR}{near},{far}")
            }
            _ => format!("{REPLY}unknown"),
        };
        format!("{reply}\r\n").into_bytes()
    }

    fn apply_move(&mut self, payload: &str) -> u32 {
        let Some((pitch, yaw)) = payload.split_once('+') else {
            return 0;
        };
        let (Ok(pitch), Ok(yaw)) = (pitch.parse::<i32>(), yaw.parse::<i32>()) else {
            return 0;
        };

        let travel = pitch.abs_diff(self.pitch).max(yaw.abs_diff(self.yaw));
        self.pitch = pitch;
        self.yaw = yaw;
        Self::SETTLE_BASE + travel / Self::DEGREES_PER_UNIT
    }

    /// Raw readings for a room that is closest straight ahead.
    fn samples(&self) -> (i64, i64) {
        let off_axis = i64::from(self.pitch.unsigned_abs()) * 2 + i64::from(self.yaw.unsigned_abs());
        let raw = (300 - off_axis).max(0);
        (raw, (raw - 4).max(0))
    }
}

/// Mock transport answered by a fresh [`SimulatedScanner`].
pub fn simulated_transport() -> MockTransport {
    let mut scanner = SimulatedScanner::default();
    MockTransport::with_responder(move |line| scanner.respond(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(sim: &mut SimulatedScanner, line: &str) -> String {
        String::from_utf8(sim.respond(line.as_bytes())).unwrap()
    }

    #[test]
    fn echoes_link_test() {
        let mut sim = SimulatedScanner::default();
        assert_eq!(reply(&mut sim, "T12345\r\n"), "T12345\r\n");
    }

    #[test]
    fn settle_grows_with_travel() {
        let mut sim = SimulatedScanner::default();
        assert_eq!(reply(&mut sim, "M010+-30\r\n"), "M1\r\n");
        assert_eq!(reply(&mut sim, "M100+-30\r\n"), "M3\r\n");
        assert_eq!(reply(&mut sim, "M100+-30\r\n"), "M1\r\n");
    }

    #[test]
    fn malformed_move_reports_zero_settle() {
        let mut sim = SimulatedScanner::default();
        assert_eq!(reply(&mut sim, "Mnorth\r\n"), "M0\r\n");
        assert_eq!(reply(&mut sim, "M1+x\r\n"), "M0\r\n");
    }

    #[test]
    fn samples_depend_on_orientation() {
        let mut sim = SimulatedScanner::default();
        assert_eq!(reply(&mut sim, "SGET\r\n"), "S300,296\r\n");
        reply(&mut sim, "M-10+020\r\n");
        assert_eq!(reply(&mut sim, "SGET\r\n"), "S260,256\r\n");
    }

    #[test]
    fn unknown_tags_get_a_reply_tag() {
        let mut sim = SimulatedScanner::default();
        assert_eq!(reply(&mut sim, "Xabc\r\n"), "Runknown\r\n");
    }
}
