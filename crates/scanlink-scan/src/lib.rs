//! Scanner control for scanlink.
//!
//! [`Controller`] turns move and measure requests into link commands;
//! [`SweepPlanner`] builds pitch/yaw grids and drives any [`ScanDevice`]
//! across them, collecting calibrated distance readings.

pub mod calibration;
pub mod controller;
pub mod error;
pub mod grid;
pub mod sweep;

pub use calibration::Calibration;
pub use controller::{
    move_payload, Controller, ControllerConfig, Measurement, ScanDevice, DEFAULT_ANGLE_WIDTH,
    DEFAULT_MAX_ANGLE, DEFAULT_SETTLE_UNIT, MEASURE_REQUEST,
};
pub use error::{Axis, Result, ScanError};
pub use grid::Grid;
pub use sweep::{
    smooth, AnglePair, PartialSweep, PlannerConfig, SweepError, SweepPlanner, SweepProgress,
    DEFAULT_PITCH_SPAN, DEFAULT_YAW_SPAN, MAX_RESOLUTION,
};
