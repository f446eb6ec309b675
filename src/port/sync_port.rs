//! Synchronous device backend over the `serialport` crate.
//!
//! Wraps `serialport::SerialPort` with our own `CdcPort` trait for dependency
//! injection and testing.

use super::error::PortError;
use super::traits::{CdcPort, FlowControl, SerialOptions};
use std::io::{Read, Write};
use std::time::Duration;

/// Synchronous device backend wrapping `serialport::SerialPort`.
pub struct SyncCdcPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The device path for identification.
    name: String,
}

impl SyncCdcPort {
    /// Open a device with the given line parameters and blocking timeout.
    ///
    /// # Arguments
    /// * `device_path` - The system path to the device (e.g., "/dev/ttyACM0" or "COM3")
    /// * `options` - Serial line parameters
    /// * `timeout` - Blocking-operation timeout for this handle
    ///
    /// # Example
    /// ```no_run
    /// use cdc_link::port::{SyncCdcPort, SerialOptions};
    /// use std::time::Duration;
    ///
    /// let options = SerialOptions::default();
    /// let port = SyncCdcPort::open("/dev/ttyACM0", &options, Duration::from_secs(1))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(
        device_path: &str,
        options: &SerialOptions,
        timeout: Duration,
    ) -> Result<Self, PortError> {
        let port = serialport::new(device_path, options.baud_rate)
            .data_bits(options.data_bits.into())
            .parity(options.parity.into())
            .stop_bits(options.stop_bits.into())
            .flow_control(options.flow_control.into())
            .timeout(timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(device_path),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(device_path)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        tracing::debug!(device = device_path, baud = options.baud_rate, "device handle opened");

        Ok(Self {
            port,
            name: device_path.to_string(),
        })
    }

    /// Open a device with default parameters (9600 8N1, no flow control, 1s timeout).
    pub fn open_default(device_path: &str) -> Result<Self, PortError> {
        Self::open(device_path, &SerialOptions::default(), Duration::from_secs(1))
    }

    /// Get a reference to the underlying serialport implementation.
    ///
    /// This can be useful for accessing platform-specific features.
    pub fn as_raw(&self) -> &dyn serialport::SerialPort {
        &*self.port
    }

    /// Get a mutable reference to the underlying serialport implementation.
    pub fn as_raw_mut(&mut self) -> &mut dyn serialport::SerialPort {
        &mut *self.port
    }
}

impl CdcPort for SyncCdcPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port.set_timeout(timeout).map_err(PortError::Serial)
    }

    fn apply_options(&mut self, options: &SerialOptions) -> Result<(), PortError> {
        self.port
            .set_baud_rate(options.baud_rate)
            .map_err(PortError::Serial)?;
        self.port
            .set_data_bits(options.data_bits.into())
            .map_err(PortError::Serial)?;
        self.port
            .set_parity(options.parity.into())
            .map_err(PortError::Serial)?;
        self.port
            .set_stop_bits(options.stop_bits.into())
            .map_err(PortError::Serial)?;
        self.port
            .set_flow_control(options.flow_control.into())
            .map_err(PortError::Serial)
    }

    fn current_options(&self) -> Result<SerialOptions, PortError> {
        Ok(SerialOptions {
            baud_rate: self.port.baud_rate().map_err(PortError::Serial)?,
            data_bits: self.port.data_bits().map_err(PortError::Serial)?.into(),
            parity: self.port.parity().map_err(PortError::Serial)?.into(),
            stop_bits: self.port.stop_bits().map_err(PortError::Serial)?.into(),
            flow_control: self.port.flow_control().map_err(PortError::Serial)?.into(),
        })
    }

    fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<(), PortError> {
        self.port
            .set_flow_control(flow_control.into())
            .map_err(PortError::Serial)
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), PortError> {
        self.port
            .write_data_terminal_ready(level)
            .map_err(PortError::Serial)
    }

    fn set_rts(&mut self, level: bool) -> Result<(), PortError> {
        self.port
            .write_request_to_send(level)
            .map_err(PortError::Serial)
    }

    fn set_break(&mut self, active: bool) -> Result<(), PortError> {
        if active {
            self.port.set_break().map_err(PortError::Serial)
        } else {
            self.port.clear_break().map_err(PortError::Serial)
        }
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }

    fn try_clone_port(&self) -> Result<Box<dyn CdcPort>, PortError> {
        let port = self.port.try_clone().map_err(PortError::Serial)?;
        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
        }))
    }
}

impl std::fmt::Debug for SyncCdcPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCdcPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}
