use serde::Serialize;

/// Quadratic conversion from raw sensor units to distance.
///
/// `distance = offset + linear * raw + quadratic * raw²`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pub offset: f64,
    pub linear: f64,
    pub quadratic: f64,
}

impl Calibration {
    /// Empirical fit for the IR distance sensor, in inches.
    pub const IR_INCHES: Calibration = Calibration {
        offset: 48.7,
        linear: -0.15,
        quadratic: 0.000134,
    };

    /// Convert one raw reading.
    pub fn apply(&self, raw: i64) -> f64 {
        let raw = raw as f64;
        self.offset + self.linear * raw + self.quadratic * raw * raw
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::IR_INCHES
    }
}
