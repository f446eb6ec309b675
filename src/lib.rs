//! cdc-link Library
//!
//! Session-oriented wrapper around a single serial/USB-CDC device:
//! overlapped-style read/write transfers with non-blocking completion
//! polling, cancellation, DTR/RTS and break control, structured serial
//! parameter configuration, and pluggable line-coding handlers.
//!
//! # Modules
//!
//! - `port`: device backend abstraction (real, async, and mock implementations)
//! - `session`: the caller-owned `DeviceSession` and transfer polling
//! - `config`: TOML configuration with environment variable overrides

pub mod config;
pub mod port;
pub mod session;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use port::{
    AsyncCdcIo, CdcPort, DataBits, FlowControl, LineCoding, LineCodingHandler, MockCdcPort,
    Parity, PortError, SerialOptions, StopBits, SyncCdcPort, TokioCdcPort,
};
pub use session::{DeviceSession, Direction, LineState, SessionError, Timeouts, TransferStatus};
