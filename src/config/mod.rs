//! Configuration module for cdc-link.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `CDC_LINK_CONFIG` environment variable (explicit path)
//! 2. `./cdc-link.toml` (current directory)
//! 3. The platform config directory (XDG on Linux/macOS, AppData on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `CDC_LINK_<SECTION>_<KEY>`
//!
//! Examples:
//! - `CDC_LINK_SERIAL_DEFAULT_BAUD=9600`
//! - `CDC_LINK_LOGGING_LEVEL=debug`
//! - `CDC_LINK_TESTING_DEVICE=/dev/ttyACM1`
//!
//! Legacy environment variables are also supported:
//! - `TEST_PORT`, `TEST_BAUD`, `TEST_TIMEOUT`, `LOOPBACK_ENABLED`

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, TestingConfig};
