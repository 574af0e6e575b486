use std::time::Duration;

use scanlink_frame::{MOVE, SENSOR};
use scanlink_link::{Delay, Link, ThreadDelay};
use scanlink_transport::Transport;
use serde::Serialize;
use tracing::{debug, Span};

use crate::calibration::Calibration;
use crate::error::{Axis, Result, ScanError};

/// Payload of a distance request.
pub const MEASURE_REQUEST: &str = "GET";

/// Hardware angle limit in degrees, applied to both axes.
pub const DEFAULT_MAX_ANGLE: i32 = 180;

/// Zero-padded width of each angle in a move payload.
pub const DEFAULT_ANGLE_WIDTH: usize = 3;

/// Wall-clock length of one device-reported settle unit.
pub const DEFAULT_SETTLE_UNIT: Duration = Duration::from_secs(1);

/// Device-facing operations a sweep needs.
pub trait ScanDevice {
    /// Point the scanner at `(pitch, yaw)` and wait until it has settled.
    fn move_to(&mut self, pitch: i32, yaw: i32) -> Result<()>;

    /// Take one calibrated distance reading at the current position.
    fn measure_distance(&mut self) -> Result<f64>;
}

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Largest accepted `|angle|` on either axis.
    pub max_angle: i32,
    /// Zero-pad width of each angle in the move payload.
    pub angle_width: usize,
    /// Duration of one unit of device-reported settle time.
    pub settle_unit: Duration,
    /// Raw sensor value to distance conversion.
    pub calibration: Calibration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_angle: DEFAULT_MAX_ANGLE,
            angle_width: DEFAULT_ANGLE_WIDTH,
            settle_unit: DEFAULT_SETTLE_UNIT,
            calibration: Calibration::default(),
        }
    }
}

/// One sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Raw samples in device order.
    pub samples: Vec<i64>,
    /// Minimum calibrated sample.
    pub distance: f64,
}

/// Typed scanner commands on top of a [`Link`].
pub struct Controller<T, D = ThreadDelay> {
    link: Link<T>,
    config: ControllerConfig,
    delay: D,
    span: Span,
}

impl<T: Transport> Controller<T> {
    /// Controller logging inside the link's span and sleeping through settle
    /// times on the calling thread.
    pub fn new(link: Link<T>, config: ControllerConfig) -> Self {
        let span = link.span().clone();
        Self::with_span(link, config, span, ThreadDelay)
    }
}

impl<T: Transport, D: Delay> Controller<T, D> {
    /// Controller with an explicit span and delay source.
    pub fn with_span(link: Link<T>, config: ControllerConfig, span: Span, delay: D) -> Self {
        Self {
            link,
            config,
            delay,
            span,
        }
    }

    /// Move both servos and wait for the device-reported settle time.
    ///
    /// Angles are validated before anything is sent. Returns the time waited.
    pub fn move_to(&mut self, pitch: i32, yaw: i32) -> Result<Duration> {
        self.check_angle(Axis::Pitch, pitch)?;
        self.check_angle(Axis::Yaw, yaw)?;

        let payload = move_payload(pitch, yaw, self.config.angle_width);
        let response = self.link.send_receive(MOVE, &payload)?;

        let settle: u32 =
            response
                .data
                .trim()
                .parse()
                .map_err(|_| ScanError::MalformedResponse {
                    what: "move",
                    data: response.data.clone(),
                })?;
        if settle == 0 {
            return Err(ScanError::ActuatorNotResponding { pitch, yaw });
        }

        let wait = self.config.settle_unit * settle;
        {
            let _entered = self.span.enter();
            debug!(pitch, yaw, settle, ?wait, "moved");
        }
        self.delay.delay(wait);
        Ok(wait)
    }

    /// Uncalibrated sensor samples at the current position.
    pub fn measure_raw(&mut self) -> Result<Vec<i64>> {
        let response = self.link.send_receive(SENSOR, MEASURE_REQUEST)?;
        parse_samples(&response.data)
    }

    /// Raw samples together with the calibrated distance.
    pub fn measure(&mut self) -> Result<Measurement> {
        let samples = self.measure_raw()?;
        let calibration = self.config.calibration;
        let distance = samples
            .iter()
            .map(|&raw| calibration.apply(raw))
            .fold(f64::INFINITY, f64::min);

        let _entered = self.span.enter();
        debug!(?samples, distance, "measured");
        Ok(Measurement { samples, distance })
    }

    /// Closest calibrated reading among the samples the device returns.
    pub fn measure_distance(&mut self) -> Result<f64> {
        self.measure().map(|m| m.distance)
    }

    /// Return to the rest position.
    pub fn home(&mut self) -> Result<Duration> {
        self.move_to(0, 0)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Release the link.
    pub fn into_link(self) -> Link<T> {
        self.link
    }

    fn check_angle(&self, axis: Axis, angle: i32) -> Result<()> {
        let limit = self.config.max_angle;
        if angle.unsigned_abs() > limit.unsigned_abs() {
            return Err(ScanError::AngleOutOfRange { axis, angle, limit });
        }
        Ok(())
    }
}

impl<T: Transport, D: Delay> ScanDevice for Controller<T, D> {
    fn move_to(&mut self, pitch: i32, yaw: i32) -> Result<()> {
        Controller::move_to(self, pitch, yaw).map(|_| ())
    }

    fn measure_distance(&mut self) -> Result<f64> {
        Controller::measure_distance(self)
    }
}

/// Move payload: both angles zero-padded to `width`, joined by `+`.
pub fn move_payload(pitch: i32, yaw: i32, width: usize) -> String {
    format!("{pitch:0width$}+{yaw:0width$}")
}

fn parse_samples(data: &str) -> Result<Vec<i64>> {
    let malformed = || ScanError::MalformedResponse {
        what: "sensor",
        data: data.to_string(),
    };

    if data.trim().is_empty() {
        return Err(malformed());
    }
    data.split(',')
        .map(|sample| sample.trim().parse::<i64>().map_err(|_| malformed()))
        .collect()
}

#[cfg(test)]
mod tests {
    use scanlink_link::{LinkConfig, LinkError, RecordingDelay};
    use scanlink_transport::MockTransport;

    use super::*;

    /// Echoes handshakes, acknowledges moves with `settle` and answers
    /// sensor requests with `samples`.
    fn device(settle: &'static str, samples: &'static str) -> MockTransport {
        MockTransport::with_responder(move |line| {
            match line.first() {
                Some(b'M') => format!("M{settle}\r\n").into_bytes(),
                Some(b'S') => format!("S{samples}\r\n").into_bytes(),
                _ => line.to_vec(),
            }
        })
    }

    fn controller(mock: &MockTransport) -> Controller<MockTransport, RecordingDelay> {
        let config = LinkConfig {
            read_timeout: Duration::from_millis(20),
            ..LinkConfig::default()
        };
        let link =
            Link::establish_with(mock.clone(), &config, Span::none(), &mut RecordingDelay::new())
                .unwrap();
        mock.clear_written();
        Controller::with_span(
            link,
            ControllerConfig::default(),
            Span::none(),
            RecordingDelay::new(),
        )
    }

    #[test]
    fn move_payload_formatting() {
        assert_eq!(move_payload(90, 45, 3), "090+045");
        assert_eq!(move_payload(-5, 10, 3), "-05+010");
        assert_eq!(move_payload(0, 0, 3), "000+000");
        assert_eq!(move_payload(-30, -60, 3), "-30+-60");
        assert_eq!(move_payload(180, 7, 4), "0180+0007");
    }

    #[test]
    fn move_waits_for_reported_settle() {
        let mock = device("3", "100");
        let mut ctl = controller(&mock);

        let waited = ctl.move_to(90, 45).unwrap();

        assert_eq!(waited, Duration::from_secs(3));
        assert_eq!(ctl.delay().calls, vec![Duration::from_secs(3)]);
        assert_eq!(mock.written_lines(), vec!["M090+045".to_string()]);
    }

    #[test]
    fn default_settle_unit_is_one_second() {
        assert_eq!(ControllerConfig::default().settle_unit, Duration::from_secs(1));

        let mock = device("3", "100");
        let mut ctl = controller(&mock);
        let waited = ctl.move_to(0, 0).unwrap();
        assert_eq!(waited, ctl.config().settle_unit * 3);
    }

    #[test]
    fn settle_unit_scales_wait() {
        let mock = device("3", "100");
        let mut ctl = controller(&mock);
        ctl.config.settle_unit = Duration::from_millis(10);

        assert_eq!(ctl.move_to(0, 0).unwrap(), Duration::from_millis(30));
    }

    #[test]
    fn out_of_range_angle_sends_nothing() {
        let mock = device("10", "100");
        let mut ctl = controller(&mock);

        let err = ctl.move_to(181, 0).unwrap_err();
        assert!(matches!(
            err,
            ScanError::AngleOutOfRange {
                axis: Axis::Pitch,
                angle: 181,
                limit: 180
            }
        ));

        let err = ctl.move_to(0, -200).unwrap_err();
        assert!(matches!(
            err,
            ScanError::AngleOutOfRange {
                axis: Axis::Yaw,
                angle: -200,
                ..
            }
        ));

        assert!(mock.written().is_empty());
        assert!(ctl.delay().calls.is_empty());
    }

    #[test]
    fn limit_is_inclusive() {
        let mock = device("1", "100");
        let mut ctl = controller(&mock);
        ctl.move_to(180, -180).unwrap();
        assert_eq!(mock.written_lines(), vec!["M180+-180".to_string()]);
    }

    #[test]
    fn zero_settle_means_actuator_not_responding() {
        let mock = device("0", "100");
        let mut ctl = controller(&mock);

        let err = ctl.move_to(10, 20).unwrap_err();
        assert!(matches!(
            err,
            ScanError::ActuatorNotResponding { pitch: 10, yaw: 20 }
        ));
        assert!(ctl.delay().calls.is_empty());
    }

    #[test]
    fn non_numeric_settle_is_malformed() {
        let mock = device("soon", "100");
        let mut ctl = controller(&mock);

        let err = ctl.move_to(0, 0).unwrap_err();
        assert!(matches!(
            err,
            ScanError::MalformedResponse { what: "move", ref data } if data == "soon"
        ));
    }

    #[test]
    fn measure_returns_minimum_calibrated_sample() {
        let mock = device("1", "100,50");
        let mut ctl = controller(&mock);

        let distance = ctl.measure_distance().unwrap();

        assert!((distance - 35.04).abs() < 1e-9);
        assert_eq!(mock.written_lines(), vec!["SGET".to_string()]);
    }

    #[test]
    fn measure_raw_returns_samples() {
        let mock = device("1", "512, 498");
        let mut ctl = controller(&mock);
        assert_eq!(ctl.measure_raw().unwrap(), vec![512, 498]);

        let measurement = ctl.measure().unwrap();
        assert_eq!(measurement.samples, vec![512, 498]);
        assert_eq!(
            measurement.distance,
            Calibration::default().apply(512).min(Calibration::default().apply(498))
        );
    }

    #[test]
    fn custom_calibration_is_used() {
        let mock = device("1", "10");
        let mut ctl = controller(&mock);
        ctl.config.calibration = Calibration {
            offset: 1.0,
            linear: 2.0,
            quadratic: 0.0,
        };
        assert_eq!(ctl.measure_distance().unwrap(), 21.0);
    }

    #[test]
    fn bad_sensor_payloads_are_malformed() {
        for samples in ["", "12,abc", "1,,2"] {
            let mock = device("1", samples);
            let mut ctl = controller(&mock);
            let err = ctl.measure_distance().unwrap_err();
            assert!(
                matches!(err, ScanError::MalformedResponse { what: "sensor", .. }),
                "payload {samples:?}: {err}"
            );
        }
    }

    #[test]
    fn wrong_reply_tag_surfaces_link_error() {
        let mock = MockTransport::with_responder(|line| {
            if line.first() == Some(&b'T') {
                line.to_vec()
            } else {
                b"S100\r\n".to_vec()
            }
        });
        let mut ctl = controller(&mock);

        let err = ctl.move_to(0, 0).unwrap_err();
        assert!(matches!(
            err,
            ScanError::Link(LinkError::ProtocolMismatch { expected: 'M', .. })
        ));
    }

    #[test]
    fn home_moves_to_origin() {
        let mock = device("5", "100");
        let mut ctl = controller(&mock);
        ctl.home().unwrap();
        assert_eq!(mock.written_lines(), vec!["M000+000".to_string()]);
    }
}
