//! Shared bootstrap helpers for the DrawState validation layer: logging setup
//! and platform-specific paths.

pub mod logging;
pub mod platform;

pub use logging::{init_logging, try_init_logging};
