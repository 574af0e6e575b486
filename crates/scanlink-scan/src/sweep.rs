use serde::Serialize;
use tracing::{debug, info, info_span, warn, Span};

use crate::controller::ScanDevice;
use crate::error::{Result, ScanError};
use crate::grid::Grid;

/// Default pitch sweep span in degrees, inclusive.
pub const DEFAULT_PITCH_SPAN: (f64, f64) = (-30.0, 30.0);

/// Default yaw sweep span in degrees, inclusive.
pub const DEFAULT_YAW_SPAN: (f64, f64) = (-60.0, 60.0);

/// Highest accepted sweep resolution.
pub const MAX_RESOLUTION: usize = 60;

/// One scanner orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnglePair {
    pub pitch: i32,
    pub yaw: i32,
}

impl AnglePair {
    pub fn new(pitch: i32, yaw: i32) -> Self {
        Self { pitch, yaw }
    }
}

/// Sweep planning policy.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Pitch range covered by the rows.
    pub pitch_span: (f64, f64),
    /// Yaw range covered by the columns.
    pub yaw_span: (f64, f64),
    /// Resolution ceiling.
    pub max_resolution: usize,
    /// Yaw samples per pitch sample.
    pub yaw_oversample: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            pitch_span: DEFAULT_PITCH_SPAN,
            yaw_span: DEFAULT_YAW_SPAN,
            max_resolution: MAX_RESOLUTION,
            yaw_oversample: 2,
        }
    }
}

/// Reported after every measured cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepProgress {
    pub row: usize,
    pub col: usize,
    pub angles: AnglePair,
    pub distance: f64,
    /// Cells measured so far, including this one.
    pub completed: usize,
    pub total: usize,
}

/// Readings collected by a sweep that has not finished.
///
/// Cells are filled in row-major order, so the measured cells always form a
/// prefix of the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialSweep {
    readings: Grid<Option<f64>>,
    completed: usize,
}

impl PartialSweep {
    /// Nothing measured yet.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            readings: Grid::filled(rows, cols, None),
            completed: 0,
        }
    }

    /// Readings so far; unmeasured cells are `None`.
    pub fn readings(&self) -> &Grid<Option<f64>> {
        &self.readings
    }

    /// Number of measured cells.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.readings.len()
    }

    /// First unmeasured cell, if any.
    pub fn next_cell(&self) -> Option<(usize, usize)> {
        (!self.is_complete()).then(|| cell_at(self.completed, self.readings.cols()))
    }

    /// Last measured cell, if any.
    pub fn last_completed(&self) -> Option<(usize, usize)> {
        self.completed
            .checked_sub(1)
            .map(|index| cell_at(index, self.readings.cols()))
    }

    /// The finished reading grid, or `None` while cells are missing.
    pub fn into_grid(self) -> Option<Grid<f64>> {
        if !self.is_complete() {
            return None;
        }
        Some(self.readings.map(|cell| cell.unwrap_or(f64::NAN)))
    }

    fn record(&mut self, row: usize, col: usize, distance: f64) {
        if let Some(cell) = self.readings.get_mut(row, col) {
            *cell = Some(distance);
            self.completed += 1;
        }
    }
}

/// A sweep that stopped on a device error.
#[derive(Debug, thiserror::Error)]
#[error("sweep failed at cell {failed_at:?}: {source}")]
pub struct SweepError {
    pub source: ScanError,
    /// Everything measured before the failure; pass to
    /// [`SweepPlanner::resume_sweep`] to continue.
    pub partial: PartialSweep,
    pub failed_at: (usize, usize),
    pub last_completed: Option<(usize, usize)>,
}

/// Builds angle grids and drives a [`ScanDevice`] across them.
#[derive(Debug, Clone)]
pub struct SweepPlanner {
    config: PlannerConfig,
    span: Span,
}

impl SweepPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_span(config, info_span!("sweep"))
    }

    /// Planner logging inside `span`.
    pub fn with_span(config: PlannerConfig, span: Span) -> Self {
        Self { config, span }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Angle grid with `resolution` pitch rows and
    /// `resolution * yaw_oversample` yaw columns.
    ///
    /// Both spans are sampled inclusively and rounded to whole degrees. A
    /// single sample sits at the start of its span.
    pub fn generate_grid(&self, resolution: usize) -> Result<Grid<AnglePair>> {
        if resolution == 0 {
            return Err(ScanError::ResolutionZero);
        }
        if resolution > self.config.max_resolution {
            return Err(ScanError::ResolutionTooHigh {
                resolution,
                max: self.config.max_resolution,
            });
        }

        let pitches = linspace(self.config.pitch_span, resolution);
        let yaws = linspace(
            self.config.yaw_span,
            resolution * self.config.yaw_oversample.max(1),
        );

        Ok(Grid::from_fn(pitches.len(), yaws.len(), |row, col| {
            AnglePair::new(pitches[row], yaws[col])
        }))
    }

    /// Visit every cell in row-major order, moving then measuring, and
    /// return a reading grid of the same shape.
    ///
    /// On the first failure the sweep stops; the error carries the readings
    /// gathered so far.
    pub fn execute_sweep<S>(
        &self,
        device: &mut S,
        grid: &Grid<AnglePair>,
    ) -> std::result::Result<Grid<f64>, SweepError>
    where
        S: ScanDevice + ?Sized,
    {
        self.execute_sweep_with_progress(device, grid, |_| {})
    }

    /// [`execute_sweep`](Self::execute_sweep) with a per-cell callback.
    pub fn execute_sweep_with_progress<S, F>(
        &self,
        device: &mut S,
        grid: &Grid<AnglePair>,
        progress: F,
    ) -> std::result::Result<Grid<f64>, SweepError>
    where
        S: ScanDevice + ?Sized,
        F: FnMut(SweepProgress),
    {
        let partial = PartialSweep::new(grid.rows(), grid.cols());
        self.run(device, grid, partial, progress)
    }

    /// Continue a failed sweep from its first unmeasured cell.
    ///
    /// Cells already in `partial` are not revisited. A partial sweep of a
    /// different shape is discarded and the sweep starts over.
    pub fn resume_sweep<S, F>(
        &self,
        device: &mut S,
        grid: &Grid<AnglePair>,
        partial: PartialSweep,
        progress: F,
    ) -> std::result::Result<Grid<f64>, SweepError>
    where
        S: ScanDevice + ?Sized,
        F: FnMut(SweepProgress),
    {
        let partial = if partial.readings.same_shape(grid) {
            partial
        } else {
            let _entered = self.span.enter();
            warn!(
                expected = ?grid.shape(),
                actual = ?partial.readings.shape(),
                "partial sweep does not match grid, starting over"
            );
            PartialSweep::new(grid.rows(), grid.cols())
        };
        self.run(device, grid, partial, progress)
    }

    fn run<S, F>(
        &self,
        device: &mut S,
        grid: &Grid<AnglePair>,
        mut partial: PartialSweep,
        mut progress: F,
    ) -> std::result::Result<Grid<f64>, SweepError>
    where
        S: ScanDevice + ?Sized,
        F: FnMut(SweepProgress),
    {
        let _entered = self.span.enter();
        let total = grid.len();
        info!(
            rows = grid.rows(),
            cols = grid.cols(),
            start = partial.completed,
            "sweep started"
        );

        for ((row, col), &angles) in grid.indexed().skip(partial.completed) {
            let reading = device
                .move_to(angles.pitch, angles.yaw)
                .and_then(|()| device.measure_distance());

            let distance = match reading {
                Ok(distance) => distance,
                Err(source) => {
                    warn!(row, col, error = %source, "sweep stopped");
                    let last_completed = partial.last_completed();
                    return Err(SweepError {
                        source,
                        partial,
                        failed_at: (row, col),
                        last_completed,
                    });
                }
            };

            partial.record(row, col, distance);
            debug!(row, col, pitch = angles.pitch, yaw = angles.yaw, distance, "cell measured");
            progress(SweepProgress {
                row,
                col,
                angles,
                distance,
                completed: partial.completed,
                total,
            });
        }

        info!(cells = total, "sweep finished");
        Ok(partial.readings.map(|cell| cell.unwrap_or(f64::NAN)))
    }
}

impl Default for SweepPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

/// Mean over every `window × window` block.
///
/// The result has shape `(rows - window + 1) × (cols - window + 1)`; a window
/// larger than either dimension gives an empty grid and a window of 0 or 1
/// returns the input unchanged.
pub fn smooth(grid: &Grid<f64>, window: usize) -> Grid<f64> {
    if window <= 1 {
        return grid.clone();
    }
    if window > grid.rows() || window > grid.cols() {
        return Grid::empty();
    }

    let area = (window * window) as f64;
    Grid::from_fn(
        grid.rows() - window + 1,
        grid.cols() - window + 1,
        |row, col| {
            let mut sum = 0.0;
            for r in row..row + window {
                for c in col..col + window {
                    sum += grid.get(r, c).copied().unwrap_or(0.0);
                }
            }
            sum / area
        },
    )
}

fn linspace((start, end): (f64, f64), samples: usize) -> Vec<i32> {
    if samples == 1 {
        return vec![start.round() as i32];
    }
    let step = (end - start) / (samples - 1) as f64;
    (0..samples)
        .map(|i| (start + step * i as f64).round() as i32)
        .collect()
}

fn cell_at(index: usize, cols: usize) -> (usize, usize) {
    let cols = cols.max(1);
    (index / cols, index % cols)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use scanlink_link::{Link, LinkConfig, RecordingDelay};
    use scanlink_transport::MockTransport;

    use super::*;
    use crate::controller::{Controller, ControllerConfig};

    /// Scripted device: returns distances in order and fails the `fail_on`-th
    /// move (1-based).
    #[derive(Default)]
    struct FakeDevice {
        moves: Vec<(i32, i32)>,
        distances: VecDeque<f64>,
        fail_on: Option<usize>,
    }

    impl ScanDevice for FakeDevice {
        fn move_to(&mut self, pitch: i32, yaw: i32) -> Result<()> {
            self.moves.push((pitch, yaw));
            if Some(self.moves.len()) == self.fail_on {
                return Err(ScanError::ActuatorNotResponding { pitch, yaw });
            }
            Ok(())
        }

        fn measure_distance(&mut self) -> Result<f64> {
            Ok(self.distances.pop_front().unwrap_or(0.0))
        }
    }

    fn planner() -> SweepPlanner {
        SweepPlanner::with_span(PlannerConfig::default(), Span::none())
    }

    #[test]
    fn grid_shape_and_bounds() {
        let grid = planner().generate_grid(3).unwrap();
        assert_eq!(grid.shape(), (3, 6));

        let pitches: Vec<i32> = (0..3).map(|r| grid.get(r, 0).unwrap().pitch).collect();
        let yaws: Vec<i32> = grid.row(0).unwrap().iter().map(|a| a.yaw).collect();
        assert_eq!(pitches, vec![-30, 0, 30]);
        assert_eq!(yaws, vec![-60, -36, -12, 12, 36, 60]);

        for (_, cell) in grid.indexed() {
            assert!(cell.pitch.abs() <= 30);
            assert!(cell.yaw.abs() <= 60);
        }
    }

    #[test]
    fn row_holds_pitch_and_column_holds_yaw() {
        let grid = planner().generate_grid(10).unwrap();
        assert_eq!(grid.shape(), (10, 20));
        for ((row, col), cell) in grid.indexed() {
            assert_eq!(cell.pitch, grid.get(row, 0).unwrap().pitch);
            assert_eq!(cell.yaw, grid.get(0, col).unwrap().yaw);
        }
        assert_eq!(*grid.get(0, 0).unwrap(), AnglePair::new(-30, -60));
        assert_eq!(*grid.get(9, 19).unwrap(), AnglePair::new(30, 60));
    }

    #[test]
    fn resolution_limits() {
        let planner = planner();
        assert!(planner.generate_grid(60).is_ok());
        assert!(matches!(
            planner.generate_grid(61),
            Err(ScanError::ResolutionTooHigh {
                resolution: 61,
                max: 60
            })
        ));
        assert!(matches!(
            planner.generate_grid(0),
            Err(ScanError::ResolutionZero)
        ));
    }

    #[test]
    fn single_sample_sits_at_span_start() {
        let grid = planner().generate_grid(1).unwrap();
        assert_eq!(grid.shape(), (1, 2));
        assert_eq!(
            grid.row(0).unwrap(),
            &[AnglePair::new(-30, -60), AnglePair::new(-30, 60)][..]
        );
    }

    #[test]
    fn custom_spans() {
        let planner = SweepPlanner::with_span(
            PlannerConfig {
                pitch_span: (0.0, 10.0),
                yaw_span: (-5.0, 5.0),
                yaw_oversample: 1,
                ..PlannerConfig::default()
            },
            Span::none(),
        );
        let grid = planner.generate_grid(3).unwrap();
        assert_eq!(grid.shape(), (3, 3));
        assert_eq!(*grid.get(1, 1).unwrap(), AnglePair::new(5, 0));
    }

    #[test]
    fn sweep_visits_row_major_and_keeps_indices() {
        let grid = planner().generate_grid(2).unwrap();
        let mut device = FakeDevice {
            distances: (0..8).map(f64::from).collect(),
            ..FakeDevice::default()
        };

        let readings = planner().execute_sweep(&mut device, &grid).unwrap();

        let expected_moves: Vec<(i32, i32)> =
            grid.indexed().map(|(_, a)| (a.pitch, a.yaw)).collect();
        assert_eq!(device.moves, expected_moves);
        assert_eq!(readings.shape(), (2, 4));
        assert_eq!(
            readings.to_rows(),
            vec![vec![0.0, 1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0, 7.0]]
        );
    }

    #[test]
    fn progress_reported_per_cell() {
        let grid = planner().generate_grid(2).unwrap();
        let mut device = FakeDevice::default();
        let mut seen = Vec::new();

        planner()
            .execute_sweep_with_progress(&mut device, &grid, |p| seen.push((p.row, p.col, p.completed, p.total)))
            .unwrap();

        assert_eq!(seen.len(), 8);
        assert_eq!(seen[0], (0, 0, 1, 8));
        assert_eq!(seen[7], (1, 3, 8, 8));
    }

    #[test]
    fn failure_returns_partial_readings() {
        let grid = planner().generate_grid(2).unwrap();
        let mut device = FakeDevice {
            distances: (1..=8).map(f64::from).collect(),
            fail_on: Some(6),
            ..FakeDevice::default()
        };

        let err = planner().execute_sweep(&mut device, &grid).unwrap_err();

        assert!(matches!(err.source, ScanError::ActuatorNotResponding { .. }));
        assert_eq!(err.failed_at, (1, 1));
        assert_eq!(err.last_completed, Some((1, 0)));
        assert_eq!(err.partial.completed(), 5);
        assert_eq!(err.partial.next_cell(), Some((1, 1)));
        assert_eq!(
            err.partial.readings().to_rows(),
            vec![
                vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
                vec![Some(5.0), None, None, None],
            ]
        );
        assert!(err.partial.clone().into_grid().is_none());
        assert!(err.to_string().contains("(1, 1)"));
    }

    #[test]
    fn failure_on_first_cell_has_no_last_completed() {
        let grid = planner().generate_grid(1).unwrap();
        let mut device = FakeDevice {
            fail_on: Some(1),
            ..FakeDevice::default()
        };
        let err = planner().execute_sweep(&mut device, &grid).unwrap_err();
        assert_eq!(err.failed_at, (0, 0));
        assert_eq!(err.last_completed, None);
        assert_eq!(err.partial.completed(), 0);
    }

    #[test]
    fn resume_measures_only_missing_cells() {
        let grid = planner().generate_grid(2).unwrap();
        let mut device = FakeDevice {
            distances: (1..=5).map(f64::from).collect(),
            fail_on: Some(6),
            ..FakeDevice::default()
        };
        let err = planner().execute_sweep(&mut device, &grid).unwrap_err();

        let mut retry = FakeDevice {
            distances: vec![60.0, 70.0, 80.0].into(),
            ..FakeDevice::default()
        };
        let readings = planner()
            .resume_sweep(&mut retry, &grid, err.partial, |_| {})
            .unwrap();

        let expected_moves: Vec<(i32, i32)> = grid
            .indexed()
            .skip(5)
            .map(|(_, a)| (a.pitch, a.yaw))
            .collect();
        assert_eq!(retry.moves, expected_moves);
        assert_eq!(
            readings.to_rows(),
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 60.0, 70.0, 80.0]]
        );
    }

    #[test]
    fn resume_with_mismatched_partial_starts_over() {
        let grid = planner().generate_grid(1).unwrap();
        let mut device = FakeDevice::default();
        let readings = planner()
            .resume_sweep(&mut device, &grid, PartialSweep::new(5, 5), |_| {})
            .unwrap();
        assert_eq!(device.moves.len(), 2);
        assert_eq!(readings.shape(), (1, 2));
    }

    #[test]
    fn smoothing_default_window() {
        let grid = Grid::from_fn(3, 4, |r, c| (r * 4 + c) as f64);
        let smoothed = smooth(&grid, 2);
        assert_eq!(smoothed.shape(), (2, 3));
        assert_eq!(
            smoothed.to_rows(),
            vec![vec![2.5, 3.5, 4.5], vec![6.5, 7.5, 8.5]]
        );
    }

    #[test]
    fn smoothing_edge_windows() {
        let grid = Grid::filled(2, 4, 3.0);
        assert_eq!(smooth(&grid, 1), grid);
        assert_eq!(smooth(&grid, 0), grid);
        assert_eq!(smooth(&grid, 2).to_rows(), vec![vec![3.0, 3.0, 3.0]]);
        assert!(smooth(&grid, 3).is_empty());
    }

    #[test]
    fn end_to_end_sweep_over_mock_device() {
        let mock = MockTransport::with_responder(|line| match line.first() {
            Some(b'M') => b"M10\r\n".to_vec(),
            Some(b'S') => b"S100,50\r\n".to_vec(),
            _ => line.to_vec(),
        });
        let link_config = LinkConfig {
            read_timeout: Duration::from_millis(20),
            ..LinkConfig::default()
        };
        let link = Link::establish_with(
            mock.clone(),
            &link_config,
            Span::none(),
            &mut RecordingDelay::new(),
        )
        .unwrap();
        mock.clear_written();
        let mut controller = Controller::with_span(
            link,
            ControllerConfig::default(),
            Span::none(),
            RecordingDelay::new(),
        );

        let planner = SweepPlanner::with_span(
            PlannerConfig {
                yaw_oversample: 1,
                ..PlannerConfig::default()
            },
            Span::none(),
        );
        let grid = planner.generate_grid(2).unwrap();
        let readings = planner.execute_sweep(&mut controller, &grid).unwrap();

        assert_eq!(
            mock.written_lines(),
            vec!["M-30+-60", "SGET", "M-30+060", "SGET", "M030+-60", "SGET", "M030+060", "SGET"]
        );
        assert_eq!(readings.shape(), (2, 2));
        assert!(readings.indexed().all(|(_, d)| (d - 35.04).abs() < 1e-9));
        assert_eq!(controller.delay().calls, vec![Duration::from_millis(10); 4]);
    }

    #[test]
    fn readings_serialize_as_json() {
        let grid = Grid::from_fn(1, 2, |_, c| c as f64);
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(value["rows"], 1);
        assert_eq!(value["cols"], 2);
        assert_eq!(value["cells"], serde_json::json!([0.0, 1.0]));
    }
}
