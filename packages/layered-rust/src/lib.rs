//! Strata Layered — cache-aside composition of storage backends with
//! read fallthrough, write fan-out, merged scans, and upward event replay.

pub mod composer;
pub mod config;
pub mod error;
mod propagation;
pub mod telemetry;

pub use composer::{Layer, LayeredStorage};
pub use config::{LayeredConfig, LogConfig, LogFormat};
pub use error::ConfigError;
