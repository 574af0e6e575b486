//! Serial port transport backed by the `serialport` crate.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default baud rate of the scanner firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial connection to a scanner device (8N1, no flow control).
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    path: String,
    baud_rate: u32,
}

impl SerialStream {
    /// Open a serial port.
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Baud rate, must match the firmware (usually 115200)
    /// * `read_timeout` - Maximum time a single read may block
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        info!(port = path, baud_rate, "opened serial port");

        Ok(Self {
            port,
            path: path.to_string(),
            baud_rate,
        })
    }

    /// The port path this stream was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialStream {
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self.port.timeout()
    }

    fn discard_input(&mut self) -> Result<()> {
        let pending = self.port.bytes_to_read().unwrap_or(0);
        self.port.clear(ClearBuffer::Input)?;
        debug!(port = %self.path, pending, "discarded serial input");
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            port: self.port.try_clone()?,
            path: self.path.clone(),
            baud_rate: self.baud_rate,
        })
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .finish()
    }
}
