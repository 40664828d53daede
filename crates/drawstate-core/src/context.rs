//! Device-scoped validation context: every shadow registry for one device,
//! behind one lock.

use parking_lot::{Mutex, MutexGuard};

use crate::command::CommandBufferRecord;
use crate::config::{DebugConfig, DrawStateConfig};
use crate::debug::RecentCommandBuffers;
use crate::descriptor::DescriptorRegistry;
use crate::dynamic_state::DynamicStateRegistry;
use crate::handle_map::HandleMap;
use crate::pipeline::PipelineRecord;
use crate::render_pass::{FramebufferRecord, RenderPassRecord};
use crate::report::Findings;
use crate::resources::{BufferViewRecord, ImageViewRecord, SamplerRecord};

/// Outcome of validating an intercepted call.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Pass the call on to the next layer.
    Forward,
    /// Drop the call; a blocking finding was reported.
    Block,
}

impl Verdict {
    pub fn is_forward(self) -> bool {
        self == Verdict::Forward
    }

    pub fn from_valid(valid: bool) -> Self {
        if valid {
            Verdict::Forward
        } else {
            Verdict::Block
        }
    }
}

/// Records released by [`ValidationContext::teardown`], per registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownSummary {
    pub pipelines: usize,
    pub samplers: usize,
    pub image_views: usize,
    pub buffer_views: usize,
    pub command_buffers: usize,
    pub dynamic_states: usize,
    pub descriptor_pools: usize,
    pub descriptor_sets: usize,
    pub descriptor_set_layouts: usize,
    pub render_passes: usize,
    pub framebuffers: usize,
}

/// All shadow state of one device. Only reachable through the context lock.
#[derive(Debug)]
pub struct DeviceState {
    device: u64,
    pub samplers: HandleMap<SamplerRecord>,
    pub image_views: HandleMap<ImageViewRecord>,
    pub buffer_views: HandleMap<BufferViewRecord>,
    pub pipelines: HandleMap<PipelineRecord>,
    pub render_passes: HandleMap<RenderPassRecord>,
    pub framebuffers: HandleMap<FramebufferRecord>,
    pub dynamic_states: DynamicStateRegistry,
    pub descriptors: DescriptorRegistry,
    pub command_buffers: HandleMap<CommandBufferRecord>,
    /// Device-wide draws per `DrawKind::index`.
    pub draw_totals: [u64; 4],
    pub(crate) debug_marker_enabled: bool,
    pub(crate) options: DebugConfig,
}

impl DeviceState {
    pub fn new(device: u64, options: DebugConfig, debug_marker_enabled: bool) -> Self {
        Self {
            device,
            samplers: HandleMap::new(),
            image_views: HandleMap::new(),
            buffer_views: HandleMap::new(),
            pipelines: HandleMap::new(),
            render_passes: HandleMap::new(),
            framebuffers: HandleMap::new(),
            dynamic_states: DynamicStateRegistry::default(),
            descriptors: DescriptorRegistry::new(),
            command_buffers: HandleMap::new(),
            draw_totals: [0; 4],
            debug_marker_enabled,
            options,
        }
    }

    pub fn device(&self) -> u64 {
        self.device
    }

    pub fn debug_marker_enabled(&self) -> bool {
        self.debug_marker_enabled
    }

    /// Check every shadowed create request; any failure blocks the whole batch.
    pub fn verify_pipelines(&self, records: &[PipelineRecord], findings: &mut Findings) -> Verdict {
        let mut valid = true;
        for record in records {
            valid &= record.verify(self.device, findings);
        }
        Verdict::from_valid(valid)
    }

    pub fn insert_pipeline(&mut self, pipeline: u64, record: PipelineRecord) {
        tracing::debug!(
            pipeline = format_args!("{:#x}", pipeline),
            stages = ?record.active_stages,
            "shadowed graphics pipeline"
        );
        self.pipelines.insert(pipeline, record);
    }

    /// Release every record, in dependency order: layouts go last since
    /// sets still name them.
    pub fn teardown(&mut self) -> TeardownSummary {
        let pipelines = self.pipelines.clear();
        let samplers = self.samplers.clear();
        let image_views = self.image_views.clear();
        let buffer_views = self.buffer_views.clear();
        let command_buffers = self.command_buffers.clear();
        let dynamic_states = self.dynamic_states.clear();
        let render_passes = self.render_passes.clear();
        let framebuffers = self.framebuffers.clear();
        let (descriptor_pools, descriptor_sets, descriptor_set_layouts) =
            self.descriptors.teardown();
        TeardownSummary {
            pipelines,
            samplers,
            image_views,
            buffer_views,
            command_buffers,
            dynamic_states,
            descriptor_pools,
            descriptor_sets,
            descriptor_set_layouts,
            render_passes,
            framebuffers,
        }
    }
}

/// Owns one device's [`DeviceState`] and the optional debug ring.
///
/// Created with the device and torn down with it. Validation runs inside
/// [`ValidationContext::lock`]; findings are delivered after the guard drops.
#[derive(Debug)]
pub struct ValidationContext {
    device: u64,
    state: Mutex<DeviceState>,
    recent: Option<RecentCommandBuffers>,
}

impl ValidationContext {
    pub fn new(device: u64, config: &DrawStateConfig, debug_marker_enabled: bool) -> Self {
        let recent = config
            .debug
            .track_recent_command_buffers
            .then(|| RecentCommandBuffers::new(config.debug.recent_capacity));
        Self {
            device,
            state: Mutex::new(DeviceState::new(
                device,
                config.debug.clone(),
                debug_marker_enabled,
            )),
            recent,
        }
    }

    pub fn device(&self) -> u64 {
        self.device
    }

    pub fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock()
    }

    /// Read-only access for introspection and tests.
    pub fn inspect<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn touch(&self, cb: u64) {
        if let Some(recent) = &self.recent {
            recent.touch(cb);
        }
    }

    pub fn forget(&self, cb: u64) {
        if let Some(recent) = &self.recent {
            recent.forget(cb);
        }
    }

    /// Recently touched command buffers, newest first. Empty when tracking is off.
    pub fn recent_command_buffers(&self) -> Vec<u64> {
        self.recent
            .as_ref()
            .map(RecentCommandBuffers::snapshot)
            .unwrap_or_default()
    }

    pub fn teardown(&self) -> TeardownSummary {
        let summary = self.state.lock().teardown();
        tracing::debug!(device = format_args!("{:#x}", self.device), ?summary, "device state released");
        summary
    }
}
