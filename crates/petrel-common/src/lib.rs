//! # Petrel Common
//!
//! Shared logging configuration for the Petrel crates. The pipeline crates
//! emit `tracing` events; this crate owns the subscriber setup so binaries
//! and tests configure it in one place.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};
