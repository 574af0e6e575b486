use scanlink_scan::AnglePair;
use serde::Serialize;

use crate::cmd::device::open_controller;
use crate::cmd::MeasureArgs;
use crate::exit::{scan_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{format_distance, print_fields, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct MeasureOutput {
    at: Option<AnglePair>,
    distance: f64,
    samples: Vec<i64>,
}

pub fn run(args: MeasureArgs, format: OutputFormat) -> CliResult<i32> {
    let at = target(args.at.as_deref())?;
    let mut controller = open_controller(&args.device, &args.controller)?;

    if let Some(angles) = at {
        controller
            .move_to(angles.pitch, angles.yaw)
            .map_err(|err| scan_error("move failed", err))?;
    }
    let measurement = controller
        .measure()
        .map_err(|err| scan_error("measure failed", err))?;

    let out = MeasureOutput {
        at,
        distance: measurement.distance,
        samples: measurement.samples,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Raw => print_raw(&format_distance(&out.distance)),
        OutputFormat::Table | OutputFormat::Pretty => {
            let samples: Vec<String> = out.samples.iter().map(i64::to_string).collect();
            print_fields(
                &[
                    ("distance", format_distance(&out.distance)),
                    ("samples", samples.join(", ")),
                ],
                format,
            );
        }
    }

    Ok(SUCCESS)
}

fn target(at: Option<&[i32]>) -> CliResult<Option<AnglePair>> {
    match at {
        None => Ok(None),
        Some([pitch, yaw]) => Ok(Some(AnglePair::new(*pitch, *yaw))),
        Some(_) => Err(CliError::new(USAGE, "--at expects PITCH,YAW")),
    }
}
