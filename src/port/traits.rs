//! Core traits for the device backend seam.
//!
//! Defines the `CdcPort` trait that allows both real serial devices and mock
//! implementations to be used interchangeably, plus the structured option
//! types shared across the crate.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial line parameters for an open device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialOptions {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<serialport::DataBits> for DataBits {
    fn from(bits: serialport::DataBits) -> Self {
        match bits {
            serialport::DataBits::Five => DataBits::Five,
            serialport::DataBits::Six => DataBits::Six,
            serialport::DataBits::Seven => DataBits::Seven,
            serialport::DataBits::Eight => DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<serialport::Parity> for Parity {
    fn from(parity: serialport::Parity) -> Self {
        match parity {
            serialport::Parity::None => Parity::None,
            serialport::Parity::Odd => Parity::Odd,
            serialport::Parity::Even => Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<serialport::StopBits> for StopBits {
    fn from(bits: serialport::StopBits) -> Self {
        match bits {
            serialport::StopBits::One => StopBits::One,
            serialport::StopBits::Two => StopBits::Two,
        }
    }
}

/// Flow control modes.
///
/// `Software` is XON/XOFF on both directions, `Hardware` is RTS/CTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl From<serialport::FlowControl> for FlowControl {
    fn from(flow: serialport::FlowControl) -> Self {
        match flow {
            serialport::FlowControl::None => FlowControl::None,
            serialport::FlowControl::Software => FlowControl::Software,
            serialport::FlowControl::Hardware => FlowControl::Hardware,
        }
    }
}

/// The line-coding quadruple carried by CDC SET_LINE_CODING / GET_LINE_CODING
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCoding {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

/// Caller-supplied override for line-coding requests.
///
/// When a handler is installed on a session, set/get line coding are routed
/// here; without one they fail with [`PortError::Unsupported`].
pub trait LineCodingHandler: Send {
    /// Apply a line coding on behalf of the session.
    fn set_line_coding(&mut self, coding: &LineCoding) -> Result<(), PortError>;

    /// Report the current line coding.
    fn line_coding(&mut self) -> Result<LineCoding, PortError>;
}

/// Trait for device backend operations.
///
/// This trait abstracts over a single serial/USB-CDC device handle, allowing
/// both real hardware and mock implementations for testing.
pub trait CdcPort: Send + std::fmt::Debug {
    /// Write bytes to the device.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this device.
    fn name(&self) -> &str;

    /// Set the blocking-operation timeout for this handle.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Apply serial line parameters to the device.
    fn apply_options(&mut self, options: &SerialOptions) -> Result<(), PortError>;

    /// Read the serial line parameters back from the device.
    fn current_options(&self) -> Result<SerialOptions, PortError>;

    /// Set the flow control mode without touching the other parameters.
    fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<(), PortError>;

    /// Drive the DTR output line.
    fn set_dtr(&mut self, level: bool) -> Result<(), PortError>;

    /// Drive the RTS output line.
    fn set_rts(&mut self, level: bool) -> Result<(), PortError>;

    /// Assert or clear the break condition on the transmit line.
    fn set_break(&mut self, active: bool) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Get the current bytes available to read (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }

    /// Open an independent handle to the same device.
    ///
    /// Transfers run on cloned handles so that control calls on the session's
    /// own handle are never serialized behind an in-flight read or write.
    fn try_clone_port(&self) -> Result<Box<dyn CdcPort>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SerialOptions::default();
        assert_eq!(options.baud_rate, 9600);
        assert_eq!(options.data_bits, DataBits::Eight);
        assert_eq!(options.parity, Parity::None);
        assert_eq!(options.stop_bits, StopBits::One);
        assert_eq!(options.flow_control, FlowControl::None);
    }

    #[test]
    fn test_data_bits_conversion() {
        let bits = DataBits::Eight;
        let serialport_bits: serialport::DataBits = bits.into();
        assert_eq!(serialport_bits, serialport::DataBits::Eight);
        assert_eq!(DataBits::from(serialport_bits), DataBits::Eight);
    }

    #[test]
    fn test_parity_conversion() {
        let parity = Parity::Even;
        let serialport_parity: serialport::Parity = parity.into();
        assert_eq!(serialport_parity, serialport::Parity::Even);
        assert_eq!(Parity::from(serialport_parity), Parity::Even);
    }

    #[test]
    fn test_stop_bits_conversion() {
        let stop_bits = StopBits::Two;
        let serialport_stop_bits: serialport::StopBits = stop_bits.into();
        assert_eq!(serialport_stop_bits, serialport::StopBits::Two);
        assert_eq!(StopBits::from(serialport_stop_bits), StopBits::Two);
    }

    #[test]
    fn test_flow_control_conversion() {
        let flow = FlowControl::Hardware;
        let serialport_flow: serialport::FlowControl = flow.into();
        assert_eq!(serialport_flow, serialport::FlowControl::Hardware);
        assert_eq!(FlowControl::from(serialport_flow), FlowControl::Hardware);
    }

    #[test]
    fn test_options_toml_roundtrip() {
        let options = SerialOptions {
            baud_rate: 115200,
            data_bits: DataBits::Seven,
            parity: Parity::Odd,
            stop_bits: StopBits::Two,
            flow_control: FlowControl::Software,
        };
        let text = toml::to_string(&options).unwrap();
        let parsed: SerialOptions = toml::from_str(&text).unwrap();
        assert_eq!(parsed, options);
    }
}
