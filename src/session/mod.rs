//! The device session: one open serial/USB-CDC device and its outstanding
//! transfers.
//!
//! [`DeviceSession`] is owned by the caller and wraps a single device handle.
//! At most one read and one write may be outstanding at a time; each runs as
//! a blocking task against an independently cloned handle, so control-line
//! and configuration calls never queue behind an in-flight transfer. Polling
//! for completion is non-blocking, and cancellation clears both records
//! immediately.
//!
//! # Example
//! ```no_run
//! use cdc_link::port::SerialOptions;
//! use cdc_link::session::{DeviceSession, TransferStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = DeviceSession::open("/dev/ttyACM0", &SerialOptions::default())?;
//! session.start_write(b"AT\r\n")?;
//! loop {
//!     match session.poll_write()? {
//!         TransferStatus::Complete(n) => break println!("wrote {n} bytes"),
//!         TransferStatus::Pending => tokio::task::yield_now().await,
//!     }
//! }
//! session.close()?;
//! # Ok(())
//! # }
//! ```

mod transfer;

pub use transfer::{Direction, TransferStatus};

use crate::port::{
    CdcPort, FlowControl, LineCoding, LineCodingHandler, PortError, SerialOptions, SyncCdcPort,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use transfer::PendingTransfer;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A transfer in the same direction is already outstanding.
    #[error("A {0} transfer is already in flight")]
    TransferInFlight(Direction),

    /// There is no transfer in the given direction to poll.
    #[error("No {0} transfer is pending")]
    NoTransferPending(Direction),

    /// The transfer task failed to run to completion.
    #[error("Transfer task failed: {0}")]
    Task(String),

    /// The underlying device backend reported an error.
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Per-direction timeouts for blocking transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Deadline for a read transfer; a read that hits it completes with the
    /// bytes received so far (possibly none).
    pub read: Duration,
    /// Deadline for a write transfer; a write that hits it fails.
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(1),
            write: Duration::from_secs(1),
        }
    }
}

/// Last commanded levels of the DTR and RTS output lines.
///
/// Host serial APIs expose no portable read-back for commanded output lines,
/// so the session is the source of truth for what it has requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineState {
    pub dtr: bool,
    pub rts: bool,
}

/// A live session with one serial/USB-CDC device.
///
/// Created by a successful [`open`](DeviceSession::open) (or
/// [`from_port`](DeviceSession::from_port) with an injected backend) and
/// destroyed by [`close`](DeviceSession::close) or drop. Dropping the session
/// cancels any outstanding transfers.
pub struct DeviceSession {
    port: Box<dyn CdcPort>,
    timeouts: Timeouts,
    lines: LineState,
    line_coding: Option<Box<dyn LineCodingHandler>>,
    pending_read: Option<PendingTransfer<Vec<u8>>>,
    pending_write: Option<PendingTransfer<usize>>,
}

impl DeviceSession {
    /// Open a device and wrap it in a session.
    ///
    /// # Arguments
    /// * `device_path` - The system path to the device (e.g., "/dev/ttyACM0" or "COM3")
    /// * `options` - Serial line parameters to open with
    pub fn open(device_path: &str, options: &SerialOptions) -> Result<Self, SessionError> {
        let timeouts = Timeouts::default();
        let port = SyncCdcPort::open(device_path, options, timeouts.read)?;
        info!(device = device_path, baud = options.baud_rate, "session opened");
        Ok(Self::from_port(Box::new(port)))
    }

    /// Build a session around an already-open backend.
    ///
    /// This is the dependency-injection seam used by tests with
    /// [`MockCdcPort`](crate::port::MockCdcPort).
    pub fn from_port(port: Box<dyn CdcPort>) -> Self {
        Self {
            port,
            timeouts: Timeouts::default(),
            lines: LineState::default(),
            line_coding: None,
            pending_read: None,
            pending_write: None,
        }
    }

    /// The device name/path this session wraps.
    pub fn name(&self) -> &str {
        self.port.name()
    }

    // ===== Transfers =====

    /// Start an asynchronous write of `data`.
    ///
    /// The write runs on a cloned device handle with the configured write
    /// timeout; poll [`poll_write`](Self::poll_write) for completion.
    ///
    /// # Errors
    ///
    /// - `SessionError::TransferInFlight` if a write is already outstanding
    /// - `SessionError::Port` if the handle cannot be cloned or configured
    pub fn start_write(&mut self, data: &[u8]) -> Result<(), SessionError> {
        if self.pending_write.is_some() {
            return Err(SessionError::TransferInFlight(Direction::Write));
        }

        let mut handle = self.port.try_clone_port()?;
        handle.set_timeout(self.timeouts.write)?;
        let data = data.to_vec();
        debug!(bytes = data.len(), "write transfer started");

        let task = tokio::task::spawn_blocking(move || write_all(&mut *handle, &data));
        self.pending_write = Some(PendingTransfer::new(task));
        Ok(())
    }

    /// Start an asynchronous read of up to `capacity` bytes.
    ///
    /// The read runs on a cloned device handle with the configured read
    /// timeout; poll [`poll_read`](Self::poll_read) for completion. A read
    /// that hits the timeout completes with whatever bytes arrived before the
    /// deadline, possibly none.
    ///
    /// # Errors
    ///
    /// - `SessionError::TransferInFlight` if a read is already outstanding
    /// - `SessionError::Port` if the handle cannot be cloned or configured
    pub fn start_read(&mut self, capacity: usize) -> Result<(), SessionError> {
        if self.pending_read.is_some() {
            return Err(SessionError::TransferInFlight(Direction::Read));
        }

        let mut handle = self.port.try_clone_port()?;
        handle.set_timeout(self.timeouts.read)?;
        debug!(capacity, "read transfer started");

        let task = tokio::task::spawn_blocking(move || {
            let mut buffer = vec![0u8; capacity];
            match handle.read_bytes(&mut buffer) {
                Ok(n) => {
                    buffer.truncate(n);
                    Ok(buffer)
                }
                Err(e) if is_timeout(&e) => Ok(Vec::new()),
                Err(e) => Err(e),
            }
        });
        self.pending_read = Some(PendingTransfer::new(task));
        Ok(())
    }

    /// Non-blocking completion check for the outstanding write.
    ///
    /// Returns `TransferStatus::Pending` while the write is still running;
    /// on completion the record is cleared and the number of bytes written is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoTransferPending` if no write is outstanding
    /// - `SessionError::Port` / `SessionError::Task` if the write failed
    pub fn poll_write(&mut self) -> Result<TransferStatus<usize>, SessionError> {
        let mut pending = self
            .pending_write
            .take()
            .ok_or(SessionError::NoTransferPending(Direction::Write))?;

        match pending.poll_complete() {
            None => {
                self.pending_write = Some(pending);
                Ok(TransferStatus::Pending)
            }
            Some(Ok(n)) => {
                debug!(bytes = n, "write transfer complete");
                Ok(TransferStatus::Complete(n))
            }
            Some(Err(e)) => Err(e),
        }
    }

    /// Non-blocking completion check for the outstanding read.
    ///
    /// Returns `TransferStatus::Pending` while the read is still running; on
    /// completion the record is cleared and the received bytes are returned
    /// (empty if the read timed out before any data arrived).
    ///
    /// # Errors
    ///
    /// - `SessionError::NoTransferPending` if no read is outstanding
    /// - `SessionError::Port` / `SessionError::Task` if the read failed
    pub fn poll_read(&mut self) -> Result<TransferStatus<Vec<u8>>, SessionError> {
        let mut pending = self
            .pending_read
            .take()
            .ok_or(SessionError::NoTransferPending(Direction::Read))?;

        match pending.poll_complete() {
            None => {
                self.pending_read = Some(pending);
                Ok(TransferStatus::Pending)
            }
            Some(Ok(data)) => {
                debug!(bytes = data.len(), "read transfer complete");
                Ok(TransferStatus::Complete(data))
            }
            Some(Err(e)) => Err(e),
        }
    }

    /// Cancel any outstanding transfers and clear their records immediately.
    ///
    /// A blocking transfer already running on a worker thread drains on its
    /// own timeout; its result is discarded.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending_write.take() {
            debug!("write transfer cancelled");
            pending.abort();
        }
        if let Some(pending) = self.pending_read.take() {
            debug!("read transfer cancelled");
            pending.abort();
        }
    }

    /// Whether a write transfer is outstanding.
    pub fn has_pending_write(&self) -> bool {
        self.pending_write.is_some()
    }

    /// Whether a read transfer is outstanding.
    pub fn has_pending_read(&self) -> bool {
        self.pending_read.is_some()
    }

    // ===== Configuration =====

    /// Set per-direction transfer timeouts.
    ///
    /// The read timeout is also applied to the session's own handle so that
    /// direct backend operations observe the same deadline.
    pub fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), SessionError> {
        self.port.set_timeout(timeouts.read)?;
        self.timeouts = timeouts;
        Ok(())
    }

    /// The currently configured transfer timeouts.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Apply serial line parameters to the device.
    pub fn configure(&mut self, options: &SerialOptions) -> Result<(), SessionError> {
        self.port.apply_options(options)?;
        info!(baud = options.baud_rate, "line parameters applied");
        Ok(())
    }

    /// Read the serial line parameters back from the device.
    pub fn options(&self) -> Result<SerialOptions, SessionError> {
        Ok(self.port.current_options()?)
    }

    /// Set the flow control mode without touching the other parameters.
    pub fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<(), SessionError> {
        self.port.set_flow_control(flow_control)?;
        Ok(())
    }

    // ===== Line state =====

    /// Drive the DTR output line.
    pub fn set_dtr(&mut self, level: bool) -> Result<(), SessionError> {
        self.port.set_dtr(level)?;
        self.lines.dtr = level;
        Ok(())
    }

    /// Drive the RTS output line.
    pub fn set_rts(&mut self, level: bool) -> Result<(), SessionError> {
        self.port.set_rts(level)?;
        self.lines.rts = level;
        Ok(())
    }

    /// Drive both output lines in one call.
    pub fn set_control_lines(&mut self, dtr: bool, rts: bool) -> Result<(), SessionError> {
        self.set_dtr(dtr)?;
        self.set_rts(rts)
    }

    /// The last commanded DTR/RTS levels.
    pub fn control_lines(&self) -> LineState {
        self.lines
    }

    /// Send a break pulse: assert the break condition, hold it for
    /// `duration`, then clear it.
    pub async fn send_break(&mut self, duration: Duration) -> Result<(), SessionError> {
        self.port.set_break(true)?;
        tokio::time::sleep(duration).await;
        self.port.set_break(false)?;
        debug!(?duration, "break pulse sent");
        Ok(())
    }

    // ===== Line coding =====

    /// Install a handler for line-coding requests.
    pub fn set_line_coding_handler(&mut self, handler: Box<dyn LineCodingHandler>) {
        self.line_coding = Some(handler);
    }

    /// Remove the installed line-coding handler, if any.
    pub fn clear_line_coding_handler(&mut self) {
        self.line_coding = None;
    }

    /// Apply a line coding through the installed handler.
    ///
    /// # Errors
    ///
    /// `PortError::Unsupported` if no handler is installed.
    pub fn set_line_coding(&mut self, coding: &LineCoding) -> Result<(), SessionError> {
        match self.line_coding.as_mut() {
            Some(handler) => Ok(handler.set_line_coding(coding)?),
            None => Err(PortError::Unsupported("line coding").into()),
        }
    }

    /// Read the line coding through the installed handler.
    ///
    /// # Errors
    ///
    /// `PortError::Unsupported` if no handler is installed.
    pub fn line_coding(&mut self) -> Result<LineCoding, SessionError> {
        match self.line_coding.as_mut() {
            Some(handler) => Ok(handler.line_coding()?),
            None => Err(PortError::Unsupported("line coding").into()),
        }
    }

    // ===== Buffers / teardown =====

    /// Discard unread input and unsent output.
    pub fn clear_buffers(&mut self) -> Result<(), SessionError> {
        Ok(self.port.clear_buffers()?)
    }

    /// Bytes available to read, if the backend can report it.
    pub fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read()
    }

    /// Close the session, cancelling any outstanding transfers.
    ///
    /// Consumes the session; the device handle is released when it drops.
    pub fn close(mut self) -> Result<(), SessionError> {
        self.cancel();
        info!(device = self.port.name(), "session closed");
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("name", &self.port.name())
            .field("timeouts", &self.timeouts)
            .field("lines", &self.lines)
            .field("pending_read", &self.pending_read.is_some())
            .field("pending_write", &self.pending_write.is_some())
            .finish()
    }
}

/// Write the whole buffer through repeated backend writes.
fn write_all(port: &mut dyn CdcPort, data: &[u8]) -> Result<usize, PortError> {
    let mut written = 0;
    while written < data.len() {
        match port.write_bytes(&data[written..])? {
            0 => {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "device accepted no bytes",
                )))
            }
            n => written += n,
        }
    }
    Ok(written)
}

/// A deadline expiry is a normal read completion, not a failure.
fn is_timeout(err: &PortError) -> bool {
    match err {
        PortError::Timeout(_) => true,
        PortError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        ),
        _ => false,
    }
}
