//! Port-specific error types.
//!
//! Defines error types for device backend operations, separate from
//! session-level errors to maintain clean separation of concerns.

use thiserror::Error;

/// Errors that can occur during device backend operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified device was not found on the system.
    #[error("Device not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during device operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend does not support the requested operation.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a device path.
    pub fn not_found(device_path: impl Into<String>) -> Self {
        Self::NotFound(device_path.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyACM0");
        assert_eq!(err.to_string(), "Device not found: /dev/ttyACM0");

        let err = PortError::config("Invalid baud rate");
        assert_eq!(err.to_string(), "Configuration error: Invalid baud rate");

        let err = PortError::Unsupported("line coding");
        assert_eq!(err.to_string(), "Operation not supported: line coding");
    }

    #[test]
    fn test_timeout_error() {
        let duration = std::time::Duration::from_millis(500);
        let err = PortError::timeout(duration);
        assert!(err.to_string().contains("500ms"));
    }
}
