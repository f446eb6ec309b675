//! Per-direction transfer records.
//!
//! Each outstanding read or write is tracked by a [`PendingTransfer`] holding
//! the join handle of a blocking task that runs against a cloned device
//! handle. Polling is a zero-timeout check of the handle; completion resolves
//! the record.

use super::SessionError;
use crate::port::PortError;
use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Transfer direction, used in errors and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Completion state reported by the polling operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus<T> {
    /// The transfer has not completed yet; its record is still outstanding.
    Pending,
    /// The transfer finished and its record has been cleared.
    Complete(T),
}

impl<T> TransferStatus<T> {
    /// Returns true while the transfer is still outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A single outstanding transfer.
#[derive(Debug)]
pub(super) struct PendingTransfer<T> {
    handle: JoinHandle<Result<T, PortError>>,
}

impl<T> PendingTransfer<T> {
    pub(super) fn new(handle: JoinHandle<Result<T, PortError>>) -> Self {
        Self { handle }
    }

    /// Zero-timeout completion check.
    ///
    /// Returns `None` while the task is still running. Once it returns
    /// `Some`, the record must be discarded.
    pub(super) fn poll_complete(&mut self) -> Option<Result<T, SessionError>> {
        (&mut self.handle).now_or_never().map(|joined| match joined {
            Ok(result) => result.map_err(SessionError::Port),
            Err(err) => Err(SessionError::Task(err.to_string())),
        })
    }

    /// Abort the task.
    ///
    /// Blocking work already running on a worker thread drains on its own
    /// timeout; its result is discarded along with the record.
    pub(super) fn abort(self) {
        self.handle.abort();
    }
}
