//! Diagnostic vocabulary and the sink that findings are delivered to.
//!
//! Validation code never talks to the sink directly. It pushes [`Finding`]s
//! into a [`Findings`] collector while the device lock is held, and the layer
//! drains the collector into the sink once the lock is released.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{DebugAction, ReportConfig};

/// Category string attached to every report from this layer.
pub const CATEGORY: &str = "DS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    PerfWarning,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::PerfWarning => "perf_warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of object a finding is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Unknown,
    Device,
    Queue,
    CommandBuffer,
    Pipeline,
    PipelineLayout,
    Sampler,
    ImageView,
    BufferView,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    RenderPass,
    Framebuffer,
    DynamicViewportState,
    DynamicLineWidthState,
    DynamicDepthBiasState,
    DynamicBlendState,
    DynamicDepthBoundsState,
    DynamicStencilState,
}

/// Stable error codes. `name()` gives the identifier hosts filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    None,
    InternalError,
    NoPipelineBound,
    InvalidPool,
    InvalidSet,
    InvalidLayout,
    InvalidPipeline,
    InvalidPipelineCreateState,
    InvalidCmdBuffer,
    InvalidRenderPass,
    InvalidRenderPassCmd,
    InvalidDynamicStateObject,
    InvalidUpdateIndex,
    InvalidUpdateStruct,
    InvalidExtension,
    NoActiveRenderPass,
    NoBeginCmdBuffer,
    NoEndCmdBuffer,
    BeginCbInvalidState,
    CmdBufferSingleSubmitViolation,
    VtxIndexOutOfBounds,
    PipelineLayoutMismatch,
    NumSamplesMismatch,
    DescriptorUpdateOutOfBounds,
    DescriptorTypeMismatch,
    DescriptorSetNotUpdated,
    ClearCmdBeforeDraw,
    ViewportNotBound,
    LineWidthNotBound,
    DepthBiasNotBound,
    BlendNotBound,
    DepthBoundsNotBound,
    StencilNotBound,
    IndexBufferNotBound,
    OutOfMemory,
}

impl ErrorCode {
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::None => "DRAWSTATE_NONE",
            ErrorCode::InternalError => "DRAWSTATE_INTERNAL_ERROR",
            ErrorCode::NoPipelineBound => "DRAWSTATE_NO_PIPELINE_BOUND",
            ErrorCode::InvalidPool => "DRAWSTATE_INVALID_POOL",
            ErrorCode::InvalidSet => "DRAWSTATE_INVALID_SET",
            ErrorCode::InvalidLayout => "DRAWSTATE_INVALID_LAYOUT",
            ErrorCode::InvalidPipeline => "DRAWSTATE_INVALID_PIPELINE",
            ErrorCode::InvalidPipelineCreateState => "DRAWSTATE_INVALID_PIPELINE_CREATE_STATE",
            ErrorCode::InvalidCmdBuffer => "DRAWSTATE_INVALID_CMD_BUFFER",
            ErrorCode::InvalidRenderPass => "DRAWSTATE_INVALID_RENDERPASS",
            ErrorCode::InvalidRenderPassCmd => "DRAWSTATE_INVALID_RENDERPASS_CMD",
            ErrorCode::InvalidDynamicStateObject => "DRAWSTATE_INVALID_DYNAMIC_STATE_OBJECT",
            ErrorCode::InvalidUpdateIndex => "DRAWSTATE_INVALID_UPDATE_INDEX",
            ErrorCode::InvalidUpdateStruct => "DRAWSTATE_INVALID_UPDATE_STRUCT",
            ErrorCode::InvalidExtension => "DRAWSTATE_INVALID_EXTENSION",
            ErrorCode::NoActiveRenderPass => "DRAWSTATE_NO_ACTIVE_RENDERPASS",
            ErrorCode::NoBeginCmdBuffer => "DRAWSTATE_NO_BEGIN_CMD_BUFFER",
            ErrorCode::NoEndCmdBuffer => "DRAWSTATE_NO_END_CMD_BUFFER",
            ErrorCode::BeginCbInvalidState => "DRAWSTATE_BEGIN_CB_INVALID_STATE",
            ErrorCode::CmdBufferSingleSubmitViolation => {
                "DRAWSTATE_CMD_BUFFER_SINGLE_SUBMIT_VIOLATION"
            }
            ErrorCode::VtxIndexOutOfBounds => "DRAWSTATE_VTX_INDEX_OUT_OF_BOUNDS",
            ErrorCode::PipelineLayoutMismatch => "DRAWSTATE_PIPELINE_LAYOUT_MISMATCH",
            ErrorCode::NumSamplesMismatch => "DRAWSTATE_NUM_SAMPLES_MISMATCH",
            ErrorCode::DescriptorUpdateOutOfBounds => "DRAWSTATE_DESCRIPTOR_UPDATE_OUT_OF_BOUNDS",
            ErrorCode::DescriptorTypeMismatch => "DRAWSTATE_DESCRIPTOR_TYPE_MISMATCH",
            ErrorCode::DescriptorSetNotUpdated => "DRAWSTATE_DESCRIPTOR_SET_NOT_UPDATED",
            ErrorCode::ClearCmdBeforeDraw => "DRAWSTATE_CLEAR_CMD_BEFORE_DRAW",
            ErrorCode::ViewportNotBound => "DRAWSTATE_VIEWPORT_NOT_BOUND",
            ErrorCode::LineWidthNotBound => "DRAWSTATE_LINE_WIDTH_NOT_BOUND",
            ErrorCode::DepthBiasNotBound => "DRAWSTATE_DEPTH_BIAS_NOT_BOUND",
            ErrorCode::BlendNotBound => "DRAWSTATE_BLEND_NOT_BOUND",
            ErrorCode::DepthBoundsNotBound => "DRAWSTATE_DEPTH_BOUNDS_NOT_BOUND",
            ErrorCode::StencilNotBound => "DRAWSTATE_STENCIL_NOT_BOUND",
            ErrorCode::IndexBufferNotBound => "DRAWSTATE_INDEX_BUFFER_NOT_BOUND",
            ErrorCode::OutOfMemory => "DRAWSTATE_OUT_OF_MEMORY",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One report, produced under the device lock and delivered after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub object_kind: ObjectKind,
    pub handle: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// Ordered collector for the findings of one intercepted call.
#[derive(Debug, Default)]
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        severity: Severity,
        object_kind: ObjectKind,
        handle: u64,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        self.items.push(Finding {
            severity,
            object_kind,
            handle,
            code,
            message: message.into(),
        });
    }

    pub fn error(&mut self, kind: ObjectKind, handle: u64, code: ErrorCode, message: impl Into<String>) {
        self.push(Severity::Error, kind, handle, code, message);
    }

    pub fn warn(&mut self, kind: ObjectKind, handle: u64, code: ErrorCode, message: impl Into<String>) {
        self.push(Severity::Warning, kind, handle, code, message);
    }

    pub fn perf(&mut self, kind: ObjectKind, handle: u64, code: ErrorCode, message: impl Into<String>) {
        self.push(Severity::PerfWarning, kind, handle, code, message);
    }

    pub fn info(&mut self, kind: ObjectKind, handle: u64, code: ErrorCode, message: impl Into<String>) {
        self.push(Severity::Info, kind, handle, code, message);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.items.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|f| f.severity == Severity::Error)
    }

    /// Deliver everything collected so far to `sink`, in order.
    pub fn deliver<S: DiagnosticSink + ?Sized>(self, sink: &S) {
        for f in self.items {
            sink.report(f.severity, f.object_kind, f.handle, f.code, CATEGORY, &f.message);
        }
    }
}

impl IntoIterator for Findings {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Receiver of validation reports. Called synchronously, never under the device lock.
pub trait DiagnosticSink: Send + Sync {
    fn report(
        &self,
        severity: Severity,
        object_kind: ObjectKind,
        handle: u64,
        code: ErrorCode,
        category: &str,
        message: &str,
    );
}

// ── Default sink ────────────────────────────────────────────────────

/// Sink that forwards reports to `tracing`, filtered by `[report]` config.
#[derive(Debug, Clone)]
pub struct TracingSink {
    flags: Vec<Severity>,
    action: DebugAction,
}

impl TracingSink {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            flags: config.flags.clone(),
            action: config.action,
        }
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        self.action != DebugAction::Ignore && self.flags.contains(&severity)
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(&ReportConfig::default())
    }
}

impl DiagnosticSink for TracingSink {
    fn report(
        &self,
        severity: Severity,
        object_kind: ObjectKind,
        handle: u64,
        code: ErrorCode,
        category: &str,
        message: &str,
    ) {
        if !self.enabled(severity) {
            return;
        }
        let code = code.name();
        let handle = format!("{:#x}", handle);
        match severity {
            Severity::Error => {
                tracing::error!(category, code, ?object_kind, %handle, "{}", message)
            }
            Severity::Warning => {
                tracing::warn!(category, code, ?object_kind, %handle, "{}", message)
            }
            Severity::PerfWarning => {
                tracing::warn!(category, code, ?object_kind, %handle, perf = true, "{}", message)
            }
            Severity::Info => tracing::info!(category, code, ?object_kind, %handle, "{}", message),
            Severity::Debug => tracing::debug!(category, code, ?object_kind, %handle, "{}", message),
        }
    }
}
