use scanlink_scan::{smooth, PlannerConfig, SweepPlanner, SweepProgress};
use tracing::{info, info_span, warn};

use crate::cmd::device::open_controller;
use crate::cmd::ScanArgs;
use crate::exit::{scan_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{format_distance, format_partial, print_grid, GridOutput, OutputFormat};

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    if args.smooth == Some(0) {
        return Err(CliError::new(USAGE, "--smooth window must be at least 1"));
    }

    let planner = SweepPlanner::with_span(
        PlannerConfig::default(),
        info_span!("sweep", resolution = args.resolution),
    );
    let grid = planner
        .generate_grid(args.resolution)
        .map_err(|err| scan_error("invalid sweep", err))?;

    let mut controller = open_controller(&args.device, &args.controller)?;

    let cols = grid.cols();
    let result = planner.execute_sweep_with_progress(&mut controller, &grid, |p: SweepProgress| {
        if p.col + 1 == cols {
            info!(row = p.row, completed = p.completed, total = p.total, "row complete");
        }
    });

    let readings = match result {
        Ok(readings) => readings,
        Err(err) => {
            warn!(
                failed_at = ?err.failed_at,
                completed = err.partial.completed(),
                "sweep incomplete, printing partial readings"
            );
            let partial = GridOutput::new(&grid, err.partial.readings());
            print_grid(&partial, format, format_partial);
            let context = format!("sweep failed at cell {:?}", err.failed_at);
            return Err(scan_error(&context, err.source));
        }
    };

    if args.home {
        controller
            .home()
            .map_err(|err| scan_error("return home failed", err))?;
    }

    let out = match args.smooth {
        Some(window) => GridOutput::smoothed(&grid, &smooth(&readings, window), window),
        None => GridOutput::new(&grid, &readings),
    };
    print_grid(&out, format, format_distance);

    Ok(SUCCESS)
}
