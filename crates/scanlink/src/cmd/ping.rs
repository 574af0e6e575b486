use std::time::Instant;

use scanlink_frame::TEST;
use scanlink_link::LinkState;
use serde::Serialize;

use crate::cmd::device::open_link;
use crate::cmd::PingArgs;
use crate::exit::{link_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_fields, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    port: String,
    ready: bool,
    state: String,
    /// Round trip of one echo after the handshake, if the link verified.
    round_trip_ms: Option<f64>,
}

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let mut link = open_link(&args.device)?;
    let ready = link.is_ready();

    let round_trip_ms = if ready {
        let start = Instant::now();
        link.send_receive(TEST, &args.device.nonce)
            .map_err(|err| link_error("echo failed", err))?;
        Some((start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0)
    } else {
        None
    };

    let out = PingOutput {
        port: link.name().to_string(),
        ready,
        state: link.state().to_string(),
        round_trip_ms,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Raw => print_raw(&out.state),
        OutputFormat::Table | OutputFormat::Pretty => print_fields(
            &[
                ("port", out.port.clone()),
                ("state", out.state.clone()),
                (
                    "round trip",
                    out.round_trip_ms
                        .map_or_else(|| "unavailable".to_string(), |ms| format!("{ms:.2}ms")),
                ),
            ],
            format,
        ),
    }

    Ok(match link.state() {
        LinkState::Ready => SUCCESS,
        LinkState::Degraded(_) => HEALTH_CHECK_FAILED,
    })
}
