use std::io::{Read, Write};
use std::time::Duration;

use scanlink_link::{connect_with, ConnectConfig, Link, LinkError};
use scanlink_scan::Controller;
use scanlink_transport::{MockTransport, SerialStream, Transport, TransportError};
use tracing::info;

use crate::cmd::{ControllerArgs, DeviceArgs};
use crate::exit::{link_error, CliResult};
use crate::sim::simulated_transport;

/// The byte stream a CLI command talks through.
pub enum DeviceStream {
    Serial(SerialStream),
    Simulated(MockTransport),
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DeviceStream::Serial(stream) => stream.read(buf),
            DeviceStream::Simulated(stream) => stream.read(buf),
        }
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            DeviceStream::Serial(stream) => stream.write(buf),
            DeviceStream::Simulated(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            DeviceStream::Serial(stream) => stream.flush(),
            DeviceStream::Simulated(stream) => stream.flush(),
        }
    }
}

impl Transport for DeviceStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> scanlink_transport::Result<()> {
        match self {
            DeviceStream::Serial(stream) => stream.set_read_timeout(timeout),
            DeviceStream::Simulated(stream) => stream.set_read_timeout(timeout),
        }
    }

    fn read_timeout(&self) -> Duration {
        match self {
            DeviceStream::Serial(stream) => stream.read_timeout(),
            DeviceStream::Simulated(stream) => stream.read_timeout(),
        }
    }

    fn discard_input(&mut self) -> scanlink_transport::Result<()> {
        match self {
            DeviceStream::Serial(stream) => stream.discard_input(),
            DeviceStream::Simulated(stream) => stream.discard_input(),
        }
    }

    fn try_clone(&self) -> scanlink_transport::Result<Self> {
        match self {
            DeviceStream::Serial(stream) => stream.try_clone().map(DeviceStream::Serial),
            DeviceStream::Simulated(stream) => stream.try_clone().map(DeviceStream::Simulated),
        }
    }

    fn name(&self) -> &str {
        match self {
            DeviceStream::Serial(stream) => stream.name(),
            DeviceStream::Simulated(_) => "simulated",
        }
    }
}

/// Open the selected device and run the handshake.
pub fn open_link(args: &DeviceArgs) -> CliResult<Link<DeviceStream>> {
    let link_config = args.link_config()?;

    if args.simulate {
        info!("using simulated scanner");
        let stream = DeviceStream::Simulated(simulated_transport());
        return Link::establish(stream, &link_config)
            .map_err(|err| link_error("connect failed", err));
    }

    let config = ConnectConfig {
        port: args.port.clone(),
        baud_rate: args.baud,
        link: link_config,
        ..ConnectConfig::default()
    };
    connect_with(&config, |port, baud, timeout| {
        SerialStream::open(port, baud, timeout).map(DeviceStream::Serial)
    })
    .map_err(|err| {
        let context = match &err {
            LinkError::Transport(TransportError::Open { .. }) => "open failed",
            LinkError::Transport(
                TransportError::DeviceNotFound { .. } | TransportError::Enumerate(_),
            ) => "port selection failed",
            _ => "connect failed",
        };
        link_error(context, err)
    })
}

/// Open the device and wrap it in a controller.
pub fn open_controller(
    device: &DeviceArgs,
    controller: &ControllerArgs,
) -> CliResult<Controller<DeviceStream>> {
    let config = controller.controller_config()?;
    let link = open_link(device)?;
    Ok(Controller::new(link, config))
}

#[cfg(test)]
mod tests {
    use scanlink_link::LinkState;
    use scanlink_transport::DEFAULT_BAUD_RATE;

    use super::*;

    fn simulated_args() -> DeviceArgs {
        DeviceArgs {
            port: None,
            baud: DEFAULT_BAUD_RATE,
            timeout: "200ms".to_string(),
            settle_delay: "0ms".to_string(),
            nonce: "12345".to_string(),
            attempts: 1,
            simulate: true,
        }
    }

    #[test]
    fn simulated_link_is_ready() {
        let link = open_link(&simulated_args()).unwrap();
        assert_eq!(link.state(), &LinkState::Ready);
        assert_eq!(link.name(), "simulated");
    }

    #[test]
    fn simulated_controller_moves_and_measures() {
        let controller_args = ControllerArgs {
            max_angle: 180,
            settle_unit: "0ms".to_string(),
        };
        let mut controller = open_controller(&simulated_args(), &controller_args).unwrap();

        controller.move_to(0, 0).unwrap();
        let distance = controller.measure_distance().unwrap();
        let calibration = controller.config().calibration;
        let expected = calibration.apply(300).min(calibration.apply(296));
        assert!((distance - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_serial_port_fails_to_open() {
        let args = DeviceArgs {
            port: Some("/dev/scanlink-missing".to_string()),
            simulate: false,
            ..simulated_args()
        };
        let err = open_link(&args).unwrap_err();
        assert_ne!(err.code, crate::exit::SUCCESS);
        assert!(err.message.starts_with("open failed"));
    }
}
