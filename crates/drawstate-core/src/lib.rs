//! Shadow-state tracking and validation for a Vulkan-style draw-state layer.
//!
//! Everything here is independent of how calls reach the layer: the
//! `drawstate-layer` crate owns the intercepted call surface and drives a
//! [`ValidationContext`] per device.

pub mod command;
pub mod config;
pub mod context;
pub mod debug;
pub mod descriptor;
pub mod dynamic_state;
pub mod error;
pub mod handle_map;
pub mod pipeline;
pub mod recording;
pub mod raw;
pub mod render_pass;
pub mod report;
pub mod resources;

pub use command::{CbState, CbStatus, Command, CommandKind, DrawKind};
pub use config::DrawStateConfig;
pub use context::{DeviceState, TeardownSummary, ValidationContext, Verdict};
pub use error::CoreError;
pub use recording::Inheritance;
pub use report::{DiagnosticSink, ErrorCode, Finding, Findings, ObjectKind, Severity, TracingSink};
