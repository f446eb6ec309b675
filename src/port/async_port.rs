//! Async device backend using tokio-serial.
//!
//! Provides stream-style async reads/writes for continuous consumption in
//! Tokio-based applications, e.g. the CLI's monitor mode. One-shot overlapped
//! transfers go through the session's blocking transfer machinery instead.

use super::error::PortError;
use super::traits::{DataBits, FlowControl, Parity, SerialOptions, StopBits};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Async trait for stream-style device I/O using Tokio.
///
/// Note: This trait requires `Send` but not `Sync` because device handles
/// are accessed exclusively (mutable access only).
#[async_trait]
pub trait AsyncCdcIo: Send {
    /// Write bytes to the device asynchronously.
    ///
    /// Returns the number of bytes actually written.
    async fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the device into the provided buffer asynchronously.
    ///
    /// Returns the number of bytes actually read.
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this device.
    fn name(&self) -> &str;

    /// Get the line parameters the device was opened with.
    fn options(&self) -> &SerialOptions;

    /// Get the number of bytes available to read.
    ///
    /// This may not be supported on all platforms.
    async fn bytes_available(&mut self) -> Result<u32, PortError>;
}

/// Native async device backend using tokio-serial.
pub struct TokioCdcPort {
    /// The underlying tokio-serial stream.
    inner: tokio_serial::SerialStream,
    /// Line parameters for reference.
    options: SerialOptions,
    /// Device path for identification.
    name: String,
}

impl TokioCdcPort {
    /// Open a device with async I/O support.
    ///
    /// # Example
    /// ```no_run
    /// use cdc_link::port::{TokioCdcPort, SerialOptions};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut options = SerialOptions::default();
    /// options.baud_rate = 115200;
    /// let port = TokioCdcPort::open("/dev/ttyACM0", &options)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(device_path: &str, options: &SerialOptions) -> Result<Self, PortError> {
        let builder = tokio_serial::new(device_path, options.baud_rate)
            .data_bits(convert_data_bits(options.data_bits))
            .parity(convert_parity(options.parity))
            .stop_bits(convert_stop_bits(options.stop_bits))
            .flow_control(convert_flow_control(options.flow_control));

        let inner = tokio_serial::SerialStream::open(&builder).map_err(|e| match e.kind {
            tokio_serial::ErrorKind::NoDevice => PortError::not_found(device_path),
            tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                PortError::not_found(device_path)
            }
            tokio_serial::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::Io(std::io::Error::other(e.to_string())),
        })?;

        Ok(Self {
            inner,
            options: options.clone(),
            name: device_path.to_string(),
        })
    }

    /// Get a reference to the underlying tokio_serial::SerialStream.
    ///
    /// This can be useful for accessing platform-specific features.
    pub fn as_raw(&self) -> &tokio_serial::SerialStream {
        &self.inner
    }

    /// Get a mutable reference to the underlying tokio_serial::SerialStream.
    pub fn as_raw_mut(&mut self) -> &mut tokio_serial::SerialStream {
        &mut self.inner
    }
}

#[async_trait]
impl AsyncCdcIo for TokioCdcPort {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.inner.write(data).await.map_err(PortError::Io)
    }

    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.inner.read(buffer).await.map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &SerialOptions {
        &self.options
    }

    async fn bytes_available(&mut self) -> Result<u32, PortError> {
        use serialport::SerialPort;
        self.inner
            .bytes_to_read()
            .map_err(|e| PortError::Io(std::io::Error::other(e)))
    }
}

impl std::fmt::Debug for TokioCdcPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioCdcPort")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

// Helper conversion functions for tokio-serial types

fn convert_data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn convert_parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn convert_stop_bits(stop_bits: StopBits) -> tokio_serial::StopBits {
    match stop_bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn convert_flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}
