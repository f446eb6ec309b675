//! Mock device backend for testing.
//!
//! Provides a `MockCdcPort` that simulates a serial/USB-CDC device without
//! requiring actual hardware. Supports a scripted read queue, a write log,
//! recorded control-line and break transitions, and timeout injection.
//! Clones share state, which is what the transfer machinery relies on when it
//! clones a handle for each blocking operation.

use super::error::PortError;
use super::traits::{CdcPort, FlowControl, SerialOptions};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock device, shared between clones.
#[derive(Debug)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the device.
    write_log: Vec<Vec<u8>>,
    /// Currently applied line parameters.
    options: SerialOptions,
    /// Configured timeout duration.
    timeout: Duration,
    /// Commanded DTR level.
    dtr: bool,
    /// Commanded RTS level.
    rts: bool,
    /// Whether the break condition is currently asserted.
    break_active: bool,
    /// Number of completed assert-then-clear break cycles.
    break_pulses: u32,
    /// Whether the next operation should time out.
    should_timeout: bool,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
}

impl Default for MockPortState {
    fn default() -> Self {
        Self {
            read_queue: VecDeque::new(),
            write_log: Vec::new(),
            options: SerialOptions::default(),
            timeout: Duration::from_secs(1),
            dtr: false,
            rts: false,
            break_active: false,
            break_pulses: 0,
            should_timeout: false,
            buffers_cleared: false,
        }
    }
}

/// Mock device backend for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Observe commanded DTR/RTS levels and break pulses
/// - Simulate timeouts
///
/// # Example
/// ```
/// use cdc_link::port::{CdcPort, MockCdcPort};
///
/// let mut port = MockCdcPort::new("MOCK0");
///
/// // Enqueue data to be read
/// port.enqueue_read(b"Hello, World!");
///
/// // Perform a read
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(n, 13);
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// // Write some data
/// port.write_bytes(b"Response").unwrap();
///
/// // Verify what was written
/// let writes = port.write_log();
/// assert_eq!(writes.len(), 1);
/// assert_eq!(writes[0], b"Response");
/// ```
#[derive(Clone)]
pub struct MockCdcPort {
    /// The device name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockPortState>>,
}

impl MockCdcPort {
    /// Create a new mock device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.state.lock();
        state.read_queue.extend(data);
    }

    /// Get a copy of all data written to the device.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Set whether the next read/write operation should time out.
    pub fn set_should_timeout(&self, should_timeout: bool) {
        self.state.lock().should_timeout = should_timeout;
    }

    /// Get whether buffers have been cleared since the last reset.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Get the currently applied line parameters.
    pub fn applied_options(&self) -> SerialOptions {
        self.state.lock().options.clone()
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Get the commanded DTR level.
    pub fn dtr(&self) -> bool {
        self.state.lock().dtr
    }

    /// Get the commanded RTS level.
    pub fn rts(&self) -> bool {
        self.state.lock().rts
    }

    /// Get whether the break condition is currently asserted.
    pub fn break_active(&self) -> bool {
        self.state.lock().break_active
    }

    /// Get the number of completed break pulses (assert followed by clear).
    pub fn break_pulses(&self) -> u32 {
        self.state.lock().break_pulses
    }
}

impl CdcPort for MockCdcPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }

        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            if let Some(queued_byte) = state.read_queue.pop_front() {
                *byte = queued_byte;
                bytes_read += 1;
            } else {
                break;
            }
        }

        if bytes_read == 0 {
            // Simulate "no data before the deadline" as a would-block error
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().timeout = timeout;
        Ok(())
    }

    fn apply_options(&mut self, options: &SerialOptions) -> Result<(), PortError> {
        self.state.lock().options = options.clone();
        Ok(())
    }

    fn current_options(&self) -> Result<SerialOptions, PortError> {
        Ok(self.state.lock().options.clone())
    }

    fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<(), PortError> {
        self.state.lock().options.flow_control = flow_control;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), PortError> {
        self.state.lock().dtr = level;
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> Result<(), PortError> {
        self.state.lock().rts = level;
        Ok(())
    }

    fn set_break(&mut self, active: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.break_active && !active {
            state.break_pulses += 1;
        }
        state.break_active = active;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.state.lock().read_queue.len())
    }

    fn try_clone_port(&self) -> Result<Box<dyn CdcPort>, PortError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockCdcPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCdcPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockCdcPort::new("MOCK0");
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_write_logging() {
        let mut port = MockCdcPort::new("MOCK0");
        port.write_bytes(b"Test1").unwrap();
        port.write_bytes(b"Test2").unwrap();

        let log = port.write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"Test1");
        assert_eq!(log[1], b"Test2");
    }

    #[test]
    fn test_timeout_simulation() {
        let mut port = MockCdcPort::new("MOCK0");
        port.set_should_timeout(true);

        let mut buffer = [0u8; 10];
        let result = port.read_bytes(&mut buffer);
        assert!(matches!(result, Err(PortError::Timeout(_))));
    }

    #[test]
    fn test_empty_read_would_block() {
        let mut port = MockCdcPort::new("MOCK0");
        let mut buffer = [0u8; 10];

        let result = port.read_bytes(&mut buffer);
        match result {
            Err(PortError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::WouldBlock),
            other => panic!("Expected WouldBlock error, got: {:?}", other),
        }
    }

    #[test]
    fn test_partial_read() {
        let mut port = MockCdcPort::new("MOCK0");
        port.enqueue_read(b"Hello, World!");

        let mut buffer = [0u8; 5];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");

        assert_eq!(port.available_bytes(), 8);
    }

    #[test]
    fn test_clear_buffers() {
        let mut port = MockCdcPort::new("MOCK0");
        port.enqueue_read(b"Should be cleared");

        port.clear_buffers().unwrap();
        assert!(port.was_cleared());
        assert_eq!(port.available_bytes(), 0);
    }

    #[test]
    fn test_control_line_recording() {
        let mut port = MockCdcPort::new("MOCK0");
        port.set_dtr(true).unwrap();
        port.set_rts(true).unwrap();
        assert!(port.dtr());
        assert!(port.rts());

        port.set_dtr(false).unwrap();
        assert!(!port.dtr());
        assert!(port.rts());
    }

    #[test]
    fn test_break_pulse_counting() {
        let mut port = MockCdcPort::new("MOCK0");
        port.set_break(true).unwrap();
        assert!(port.break_active());
        assert_eq!(port.break_pulses(), 0);

        port.set_break(false).unwrap();
        assert!(!port.break_active());
        assert_eq!(port.break_pulses(), 1);
    }

    #[test]
    fn test_options_recording() {
        let mut port = MockCdcPort::new("MOCK0");
        let options = SerialOptions {
            baud_rate: 115200,
            ..SerialOptions::default()
        };
        port.apply_options(&options).unwrap();
        assert_eq!(port.current_options().unwrap(), options);
        assert_eq!(port.applied_options().baud_rate, 115200);
    }

    #[test]
    fn test_clone_shares_state() {
        let port = MockCdcPort::new("MOCK0");
        let mut cloned = port.try_clone_port().unwrap();

        port.enqueue_read(b"shared");
        let mut buffer = [0u8; 6];
        let n = cloned.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"shared");
        assert_eq!(port.available_bytes(), 0);
    }
}
