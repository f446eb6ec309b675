//! Device backend layer for serial/USB-CDC communication.
//!
//! Provides traits and implementations for both sync and async device I/O,
//! enabling dependency injection and testing via mocks.

pub mod async_port;
pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use async_port::{AsyncCdcIo, TokioCdcPort};
pub use error::PortError;
pub use mock::MockCdcPort;
pub use sync_port::*;
pub use traits::*;
