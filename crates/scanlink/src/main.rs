mod cmd;
mod exit;
mod logging;
mod output;
mod sim;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "scanlink", version, about = "Pan/tilt distance scanner CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_move_with_negative_angles() {
        let cli = Cli::try_parse_from(["scanlink", "move", "--simulate", "-15", "-45"])
            .expect("move args should parse");

        match cli.command {
            Command::Move(args) => {
                assert_eq!(args.pitch, -15);
                assert_eq!(args.yaw, -45);
                assert!(args.device.simulate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_scan_subcommand() {
        let cli = Cli::try_parse_from([
            "scanlink",
            "--format",
            "json",
            "scan",
            "--port",
            "/dev/ttyACM0",
            "--resolution",
            "4",
            "--smooth",
            "2",
        ])
        .expect("scan args should parse");

        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.resolution, 4);
                assert_eq!(args.smooth, Some(2));
                assert_eq!(args.device.port.as_deref(), Some("/dev/ttyACM0"));
                assert_eq!(args.controller.settle_unit, "1s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn device_args_have_defaults() {
        let cli = Cli::try_parse_from(["scanlink", "ping"]).expect("ping args should parse");
        match cli.command {
            Command::Ping(args) => {
                assert_eq!(args.device.timeout, "5s");
                assert_eq!(args.device.settle_delay, "5s");
                assert_eq!(args.device.nonce, "12345");
                assert_eq!(args.device.attempts, 1);
                assert!(!args.device.simulate);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["scanlink", "--format", "xml", "ports"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
