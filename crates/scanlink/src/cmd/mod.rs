use std::time::Duration;

use clap::{Args, Subcommand};
use scanlink_link::{HandshakeConfig, LinkConfig, DEFAULT_NONCE};
use scanlink_scan::{ControllerConfig, DEFAULT_MAX_ANGLE};
use scanlink_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod device;
pub mod measure;
pub mod move_to;
pub mod ping;
pub mod ports;
pub mod scan;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports and how discovery ranks them.
    Ports(PortsArgs),
    /// Open the device and run the link handshake.
    Ping(PingArgs),
    /// Point the scanner at a pitch/yaw pair.
    Move(MoveArgs),
    /// Take one distance reading at the current position.
    Measure(MeasureArgs),
    /// Sweep a pitch/yaw grid and print the distance readings.
    Scan(ScanArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Ping(args) => ping::run(args, format),
        Command::Move(args) => move_to::run(args, format),
        Command::Measure(args) => measure::run(args, format),
        Command::Scan(args) => scan::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection options shared by every device command.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial port. Discovered automatically when omitted.
    #[arg(long, env = "SCANLINK_PORT")]
    pub port: Option<String>,
    /// Baud rate.
    #[arg(long, env = "SCANLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Maximum wait for each reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Wait after opening the port before the handshake (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub settle_delay: String,
    /// Handshake payload the device must echo.
    #[arg(long, default_value = DEFAULT_NONCE)]
    pub nonce: String,
    /// Handshake attempts before the link is reported degraded.
    #[arg(long, default_value_t = 1)]
    pub attempts: u32,
    /// Talk to a built-in simulated scanner instead of a serial port.
    #[arg(long)]
    pub simulate: bool,
}

impl DeviceArgs {
    pub fn link_config(&self) -> CliResult<LinkConfig> {
        let read_timeout = parse_duration(&self.timeout)?;
        if read_timeout.is_zero() {
            return Err(CliError::new(USAGE, "--timeout must be greater than zero"));
        }
        Ok(LinkConfig {
            read_timeout,
            handshake: HandshakeConfig {
                settle_delay: parse_duration(&self.settle_delay)?,
                nonce: self.nonce.clone(),
                attempts: self.attempts,
                ..HandshakeConfig::default()
            },
        })
    }
}

/// Actuator options for commands that move the scanner.
#[derive(Args, Debug)]
pub struct ControllerArgs {
    /// Largest accepted |angle| on either axis, in degrees.
    #[arg(long, default_value_t = DEFAULT_MAX_ANGLE)]
    pub max_angle: i32,
    /// Duration of one unit of device-reported settle time (e.g. 1s, 100ms).
    #[arg(long, default_value = "1s")]
    pub settle_unit: String,
}

impl ControllerArgs {
    pub fn controller_config(&self) -> CliResult<ControllerConfig> {
        Ok(ControllerConfig {
            max_angle: self.max_angle,
            settle_unit: parse_duration(&self.settle_unit)?,
            ..ControllerConfig::default()
        })
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {
    /// Include ports discovery would reject.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Pitch in degrees.
    #[arg(allow_hyphen_values = true)]
    pub pitch: i32,
    /// Yaw in degrees.
    #[arg(allow_hyphen_values = true)]
    pub yaw: i32,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub controller: ControllerArgs,
}

#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Move here first, as PITCH,YAW.
    #[arg(
        long,
        value_name = "PITCH,YAW",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub at: Option<Vec<i32>>,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub controller: ControllerArgs,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Pitch samples; yaw gets twice as many.
    #[arg(long, short = 'r', default_value_t = 10)]
    pub resolution: usize,
    /// Average readings over WINDOW x WINDOW blocks before printing.
    #[arg(long, value_name = "WINDOW")]
    pub smooth: Option<usize>,
    /// Return to (0, 0) after the sweep.
    #[arg(long)]
    pub home: bool,
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub controller: ControllerArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
