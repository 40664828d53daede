//! Command-buffer records and the recording commands they log.

use std::fmt;

use ash::vk;

use crate::dynamic_state::DynamicStateKind;

// ── Lifecycle ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbState {
    /// Allocated or reset, not yet begun.
    New,
    Recording,
    /// Ended, ready to submit.
    RecordedComplete,
}

bitflags::bitflags! {
    /// Bound-state and pipeline-enable bits of a command buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CbStatus: u32 {
        const VIEWPORT_BOUND           = 1 << 0;
        const LINE_WIDTH_BOUND         = 1 << 1;
        const DEPTH_BIAS_BOUND         = 1 << 2;
        const BLEND_BOUND              = 1 << 3;
        const DEPTH_BOUNDS_BOUND       = 1 << 4;
        const STENCIL_BOUND            = 1 << 5;
        const INDEX_BUFFER_BOUND       = 1 << 6;
        /// Bound pipeline writes at least one color channel.
        const COLOR_BLEND_WRITE_ENABLE = 1 << 7;
        /// Bound pipeline writes depth.
        const DEPTH_WRITE_ENABLE       = 1 << 8;
        /// Bound pipeline tests stencil.
        const STENCIL_TEST_ENABLE      = 1 << 9;
    }
}

impl CbStatus {
    pub fn bound(kind: DynamicStateKind) -> Self {
        match kind {
            DynamicStateKind::Viewport => Self::VIEWPORT_BOUND,
            DynamicStateKind::LineWidth => Self::LINE_WIDTH_BOUND,
            DynamicStateKind::DepthBias => Self::DEPTH_BIAS_BOUND,
            DynamicStateKind::Blend => Self::BLEND_BOUND,
            DynamicStateKind::DepthBounds => Self::DEPTH_BOUNDS_BOUND,
            DynamicStateKind::Stencil => Self::STENCIL_BOUND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    Draw,
    Indexed,
    Indirect,
    IndexedIndirect,
}

impl DrawKind {
    pub fn index(self) -> usize {
        match self {
            DrawKind::Draw => 0,
            DrawKind::Indexed => 1,
            DrawKind::Indirect => 2,
            DrawKind::IndexedIndirect => 3,
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, DrawKind::Indexed | DrawKind::IndexedIndirect)
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Kind tag stored in a command buffer's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    BindPipeline,
    BindDynamicState(DynamicStateKind),
    BindDescriptorSets,
    BindIndexBuffer,
    BindVertexBuffers,
    Draw,
    DrawIndexed,
    DrawIndirect,
    DrawIndexedIndirect,
    Dispatch,
    DispatchIndirect,
    CopyBuffer,
    CopyImage,
    BlitImage,
    CopyBufferToImage,
    CopyImageToBuffer,
    UpdateBuffer,
    FillBuffer,
    ClearColorImage,
    ClearDepthStencilImage,
    ClearColorAttachment,
    ClearDepthStencilAttachment,
    ResolveImage,
    SetEvent,
    ResetEvent,
    WaitEvents,
    PipelineBarrier,
    BeginQuery,
    EndQuery,
    ResetQueryPool,
    WriteTimestamp,
    BeginRenderPass,
    NextSubpass,
    EndRenderPass,
    ExecuteCommands,
    DbgMarkerBegin,
    DbgMarkerEnd,
}

impl CommandKind {
    /// Name of the API entry point that records this command.
    pub fn entry_point(self) -> &'static str {
        match self {
            CommandKind::BindPipeline => "vkCmdBindPipeline",
            CommandKind::BindDynamicState(kind) => match kind {
                DynamicStateKind::Viewport => "vkCmdBindDynamicViewportState",
                DynamicStateKind::LineWidth => "vkCmdBindDynamicLineWidthState",
                DynamicStateKind::DepthBias => "vkCmdBindDynamicDepthBiasState",
                DynamicStateKind::Blend => "vkCmdBindDynamicBlendState",
                DynamicStateKind::DepthBounds => "vkCmdBindDynamicDepthBoundsState",
                DynamicStateKind::Stencil => "vkCmdBindDynamicStencilState",
            },
            CommandKind::BindDescriptorSets => "vkCmdBindDescriptorSets",
            CommandKind::BindIndexBuffer => "vkCmdBindIndexBuffer",
            CommandKind::BindVertexBuffers => "vkCmdBindVertexBuffers",
            CommandKind::Draw => "vkCmdDraw",
            CommandKind::DrawIndexed => "vkCmdDrawIndexed",
            CommandKind::DrawIndirect => "vkCmdDrawIndirect",
            CommandKind::DrawIndexedIndirect => "vkCmdDrawIndexedIndirect",
            CommandKind::Dispatch => "vkCmdDispatch",
            CommandKind::DispatchIndirect => "vkCmdDispatchIndirect",
            CommandKind::CopyBuffer => "vkCmdCopyBuffer",
            CommandKind::CopyImage => "vkCmdCopyImage",
            CommandKind::BlitImage => "vkCmdBlitImage",
            CommandKind::CopyBufferToImage => "vkCmdCopyBufferToImage",
            CommandKind::CopyImageToBuffer => "vkCmdCopyImageToBuffer",
            CommandKind::UpdateBuffer => "vkCmdUpdateBuffer",
            CommandKind::FillBuffer => "vkCmdFillBuffer",
            CommandKind::ClearColorImage => "vkCmdClearColorImage",
            CommandKind::ClearDepthStencilImage => "vkCmdClearDepthStencilImage",
            CommandKind::ClearColorAttachment => "vkCmdClearColorAttachment",
            CommandKind::ClearDepthStencilAttachment => "vkCmdClearDepthStencilAttachment",
            CommandKind::ResolveImage => "vkCmdResolveImage",
            CommandKind::SetEvent => "vkCmdSetEvent",
            CommandKind::ResetEvent => "vkCmdResetEvent",
            CommandKind::WaitEvents => "vkCmdWaitEvents",
            CommandKind::PipelineBarrier => "vkCmdPipelineBarrier",
            CommandKind::BeginQuery => "vkCmdBeginQuery",
            CommandKind::EndQuery => "vkCmdEndQuery",
            CommandKind::ResetQueryPool => "vkCmdResetQueryPool",
            CommandKind::WriteTimestamp => "vkCmdWriteTimestamp",
            CommandKind::BeginRenderPass => "vkCmdBeginRenderPass",
            CommandKind::NextSubpass => "vkCmdNextSubpass",
            CommandKind::EndRenderPass => "vkCmdEndRenderPass",
            CommandKind::ExecuteCommands => "vkCmdExecuteCommands",
            CommandKind::DbgMarkerBegin => "vkCmdDbgMarkerBegin",
            CommandKind::DbgMarkerEnd => "vkCmdDbgMarkerEnd",
        }
    }
}

/// A recording command with its arguments, borrowed from the caller.
#[derive(Clone, Copy)]
pub enum Command<'a> {
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    BindDynamicState {
        kind: DynamicStateKind,
        state: u64,
    },
    BindDescriptorSets {
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &'a [vk::DescriptorSet],
        dynamic_offsets: &'a [u32],
    },
    BindIndexBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: &'a [vk::Buffer],
        offsets: &'a [vk::DeviceSize],
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirect {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    DispatchIndirect {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    },
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: &'a [vk::BufferCopy],
    },
    CopyImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &'a [vk::ImageCopy],
    },
    BlitImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &'a [vk::ImageBlit],
        filter: vk::Filter,
    },
    CopyBufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &'a [vk::BufferImageCopy],
    },
    CopyImageToBuffer {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &'a [vk::BufferImageCopy],
    },
    UpdateBuffer {
        dst: vk::Buffer,
        offset: vk::DeviceSize,
        data: &'a [u8],
    },
    FillBuffer {
        dst: vk::Buffer,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        data: u32,
    },
    ClearColorImage {
        image: vk::Image,
        layout: vk::ImageLayout,
        color: vk::ClearColorValue,
        ranges: &'a [vk::ImageSubresourceRange],
    },
    ClearDepthStencilImage {
        image: vk::Image,
        layout: vk::ImageLayout,
        value: vk::ClearDepthStencilValue,
        ranges: &'a [vk::ImageSubresourceRange],
    },
    ClearColorAttachment {
        attachment: u32,
        layout: vk::ImageLayout,
        color: vk::ClearColorValue,
        rects: &'a [vk::ClearRect],
    },
    ClearDepthStencilAttachment {
        aspect_mask: vk::ImageAspectFlags,
        layout: vk::ImageLayout,
        value: vk::ClearDepthStencilValue,
        rects: &'a [vk::ClearRect],
    },
    ResolveImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &'a [vk::ImageResolve],
    },
    SetEvent {
        event: vk::Event,
        stage_mask: vk::PipelineStageFlags,
    },
    ResetEvent {
        event: vk::Event,
        stage_mask: vk::PipelineStageFlags,
    },
    WaitEvents {
        events: &'a [vk::Event],
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
    },
    PipelineBarrier {
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        dependency_flags: vk::DependencyFlags,
    },
    BeginQuery {
        pool: vk::QueryPool,
        query: u32,
        flags: vk::QueryControlFlags,
    },
    EndQuery {
        pool: vk::QueryPool,
        query: u32,
    },
    ResetQueryPool {
        pool: vk::QueryPool,
        first_query: u32,
        query_count: u32,
    },
    WriteTimestamp {
        stage: vk::PipelineStageFlags,
        pool: vk::QueryPool,
        query: u32,
    },
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &'a [vk::ClearValue],
        contents: vk::SubpassContents,
    },
    NextSubpass {
        contents: vk::SubpassContents,
    },
    EndRenderPass,
    ExecuteCommands {
        command_buffers: &'a [vk::CommandBuffer],
    },
    DbgMarkerBegin {
        marker: &'a str,
    },
    DbgMarkerEnd,
}

impl Command<'_> {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::BindPipeline { .. } => CommandKind::BindPipeline,
            Command::BindDynamicState { kind, .. } => CommandKind::BindDynamicState(*kind),
            Command::BindDescriptorSets { .. } => CommandKind::BindDescriptorSets,
            Command::BindIndexBuffer { .. } => CommandKind::BindIndexBuffer,
            Command::BindVertexBuffers { .. } => CommandKind::BindVertexBuffers,
            Command::Draw { .. } => CommandKind::Draw,
            Command::DrawIndexed { .. } => CommandKind::DrawIndexed,
            Command::DrawIndirect { .. } => CommandKind::DrawIndirect,
            Command::DrawIndexedIndirect { .. } => CommandKind::DrawIndexedIndirect,
            Command::Dispatch { .. } => CommandKind::Dispatch,
            Command::DispatchIndirect { .. } => CommandKind::DispatchIndirect,
            Command::CopyBuffer { .. } => CommandKind::CopyBuffer,
            Command::CopyImage { .. } => CommandKind::CopyImage,
            Command::BlitImage { .. } => CommandKind::BlitImage,
            Command::CopyBufferToImage { .. } => CommandKind::CopyBufferToImage,
            Command::CopyImageToBuffer { .. } => CommandKind::CopyImageToBuffer,
            Command::UpdateBuffer { .. } => CommandKind::UpdateBuffer,
            Command::FillBuffer { .. } => CommandKind::FillBuffer,
            Command::ClearColorImage { .. } => CommandKind::ClearColorImage,
            Command::ClearDepthStencilImage { .. } => CommandKind::ClearDepthStencilImage,
            Command::ClearColorAttachment { .. } => CommandKind::ClearColorAttachment,
            Command::ClearDepthStencilAttachment { .. } => CommandKind::ClearDepthStencilAttachment,
            Command::ResolveImage { .. } => CommandKind::ResolveImage,
            Command::SetEvent { .. } => CommandKind::SetEvent,
            Command::ResetEvent { .. } => CommandKind::ResetEvent,
            Command::WaitEvents { .. } => CommandKind::WaitEvents,
            Command::PipelineBarrier { .. } => CommandKind::PipelineBarrier,
            Command::BeginQuery { .. } => CommandKind::BeginQuery,
            Command::EndQuery { .. } => CommandKind::EndQuery,
            Command::ResetQueryPool { .. } => CommandKind::ResetQueryPool,
            Command::WriteTimestamp { .. } => CommandKind::WriteTimestamp,
            Command::BeginRenderPass { .. } => CommandKind::BeginRenderPass,
            Command::NextSubpass { .. } => CommandKind::NextSubpass,
            Command::EndRenderPass => CommandKind::EndRenderPass,
            Command::ExecuteCommands { .. } => CommandKind::ExecuteCommands,
            Command::DbgMarkerBegin { .. } => CommandKind::DbgMarkerBegin,
            Command::DbgMarkerEnd => CommandKind::DbgMarkerEnd,
        }
    }
}

impl fmt::Debug for Command<'_> {
    // Clear values are unions, so only the kind is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().entry_point())
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// Allocation-time facts that survive a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBufferCreateRecord {
    pub pool: u64,
    pub level: vk::CommandBufferLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    /// 1-based position in the log.
    pub sequence: u64,
    pub kind: CommandKind,
}

#[derive(Debug, Clone)]
pub struct CommandBufferRecord {
    pub create_info: CommandBufferCreateRecord,
    pub state: CbState,
    pub usage: vk::CommandBufferUsageFlags,
    pub commands: Vec<CommandEntry>,
    pub status: CbStatus,
    pub last_bound_pipeline: u64,
    pub last_bound_pipeline_layout: u64,
    pub last_bound_descriptor_set: u64,
    pub bound_descriptor_sets: Vec<u64>,
    /// Last bound object per dynamic-state kind, indexed by `DynamicStateKind::index`.
    pub last_bound_dynamic_state: [u64; 6],
    pub last_vertex_binding: Option<u32>,
    pub active_render_pass: u64,
    pub active_subpass: u32,
    pub framebuffer: u64,
    /// Draws recorded per `DrawKind::index`.
    pub draw_count: [u64; 4],
    pub submit_count: u64,
    pub marker_depth: u32,
}

impl CommandBufferRecord {
    pub fn new(create_info: CommandBufferCreateRecord) -> Self {
        Self {
            create_info,
            state: CbState::New,
            usage: vk::CommandBufferUsageFlags::empty(),
            commands: Vec::new(),
            status: CbStatus::empty(),
            last_bound_pipeline: 0,
            last_bound_pipeline_layout: 0,
            last_bound_descriptor_set: 0,
            bound_descriptor_sets: Vec::new(),
            last_bound_dynamic_state: [0; 6],
            last_vertex_binding: None,
            active_render_pass: 0,
            active_subpass: 0,
            framebuffer: 0,
            draw_count: [0; 4],
            submit_count: 0,
            marker_depth: 0,
        }
    }

    /// Back to `New`, keeping only the allocation-time facts.
    pub fn reset(&mut self) {
        *self = Self::new(self.create_info);
    }

    pub fn is_primary(&self) -> bool {
        self.create_info.level == vk::CommandBufferLevel::PRIMARY
    }

    pub fn one_time_submit(&self) -> bool {
        self.usage
            .contains(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
    }

    pub fn has_draw(&self) -> bool {
        self.draw_count.iter().any(|&n| n > 0)
    }

    pub fn in_render_pass(&self) -> bool {
        self.active_render_pass != 0
    }

    /// Append to the log. `false` if the log could not grow.
    pub fn log(&mut self, kind: CommandKind) -> bool {
        if self.commands.try_reserve(1).is_err() {
            return false;
        }
        let sequence = self.commands.len() as u64 + 1;
        self.commands.push(CommandEntry { sequence, kind });
        true
    }
}
