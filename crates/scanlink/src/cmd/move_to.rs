use serde::Serialize;

use crate::cmd::device::open_controller;
use crate::cmd::MoveArgs;
use crate::exit::{scan_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct MoveOutput {
    pitch: i32,
    yaw: i32,
    settle_ms: f64,
}

pub fn run(args: MoveArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = open_controller(&args.device, &args.controller)?;
    let waited = controller
        .move_to(args.pitch, args.yaw)
        .map_err(|err| scan_error("move failed", err))?;

    let out = MoveOutput {
        pitch: args.pitch,
        yaw: args.yaw,
        settle_ms: waited.as_secs_f64() * 1000.0,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Raw => print_raw(&format!("{}", out.settle_ms)),
        OutputFormat::Table | OutputFormat::Pretty => print_fields(
            &[
                ("pitch", out.pitch.to_string()),
                ("yaw", out.yaw.to_string()),
                ("settled", format!("{:.1}ms", out.settle_ms)),
            ],
            format,
        ),
    }

    Ok(SUCCESS)
}
