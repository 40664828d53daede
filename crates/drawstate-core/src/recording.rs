//! Command-buffer lifecycle and per-command validation.
//!
//! Calls that forward before committing (begin, end, reset) are split into a
//! `check_*` step and a `commit_*` step so the lock is never held across the
//! call into the next layer.

use ash::vk::{self, Handle};

use crate::command::{
    CbState, CbStatus, Command, CommandBufferCreateRecord, CommandBufferRecord, CommandKind,
    DrawKind,
};
use crate::context::{DeviceState, Verdict};
use crate::descriptor::DescriptorRegistry;
use crate::dynamic_state::{DynamicStateKind, DynamicStateRegistry};
use crate::handle_map::HandleMap;
use crate::pipeline::PipelineRecord;
use crate::render_pass::{RenderPassRecord, SubpassSamples};
use crate::report::{ErrorCode, Findings, ObjectKind};

const CB: ObjectKind = ObjectKind::CommandBuffer;

/// Render pass a secondary command buffer continues, from its begin info.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inheritance {
    pub render_pass: u64,
    pub subpass: u32,
    pub framebuffer: u64,
}

/// Status bits a draw requires, each gated on an enable bit set by the
/// bound pipeline (empty means always required).
const DRAW_STATUS_CHECKS: [(CbStatus, CbStatus, ErrorCode, &str); 6] = [
    (
        CbStatus::empty(),
        CbStatus::VIEWPORT_BOUND,
        ErrorCode::ViewportNotBound,
        "Viewport object not bound to this command buffer",
    ),
    (
        CbStatus::empty(),
        CbStatus::LINE_WIDTH_BOUND,
        ErrorCode::LineWidthNotBound,
        "Line width object not bound to this command buffer",
    ),
    (
        CbStatus::empty(),
        CbStatus::DEPTH_BIAS_BOUND,
        ErrorCode::DepthBiasNotBound,
        "Depth bias object not bound to this command buffer",
    ),
    (
        CbStatus::COLOR_BLEND_WRITE_ENABLE,
        CbStatus::BLEND_BOUND,
        ErrorCode::BlendNotBound,
        "Blend object not bound to this command buffer",
    ),
    (
        CbStatus::DEPTH_WRITE_ENABLE,
        CbStatus::DEPTH_BOUNDS_BOUND,
        ErrorCode::DepthBoundsNotBound,
        "Depth bounds object not bound to this command buffer",
    ),
    (
        CbStatus::STENCIL_TEST_ENABLE,
        CbStatus::STENCIL_BOUND,
        ErrorCode::StencilNotBound,
        "Stencil object not bound to this command buffer",
    ),
];

fn missing_command_buffer(cb: u64, call: &str, findings: &mut Findings) {
    findings.error(
        CB,
        cb,
        ErrorCode::InvalidCmdBuffer,
        format!("Attempt to use command buffer {:#x} in {}() but it does not exist", cb, call),
    );
}

fn require_render_pass(
    node: &CommandBufferRecord,
    cb: u64,
    kind: CommandKind,
    findings: &mut Findings,
) -> bool {
    if node.in_render_pass() {
        return true;
    }
    findings.error(
        CB,
        cb,
        ErrorCode::NoActiveRenderPass,
        format!("Incorrect call to {}() without an active render pass", kind.entry_point()),
    );
    false
}

fn forbid_render_pass(
    node: &CommandBufferRecord,
    cb: u64,
    kind: CommandKind,
    findings: &mut Findings,
) -> bool {
    if !node.in_render_pass() {
        return true;
    }
    findings.error(
        CB,
        cb,
        ErrorCode::InvalidRenderPassCmd,
        format!(
            "Cannot call {}() during active render pass {:#x}",
            kind.entry_point(),
            node.active_render_pass
        ),
    );
    false
}

/// Bind-point scoping shared by pipeline and descriptor-set binds.
fn check_bind_point(
    node: &CommandBufferRecord,
    cb: u64,
    bind_point: vk::PipelineBindPoint,
    what: &str,
    findings: &mut Findings,
) -> bool {
    if bind_point == vk::PipelineBindPoint::COMPUTE && node.in_render_pass() {
        findings.error(
            CB,
            cb,
            ErrorCode::InvalidRenderPassCmd,
            format!(
                "Incorrectly binding compute {} during active render pass {:#x}",
                what, node.active_render_pass
            ),
        );
        return false;
    }
    if bind_point == vk::PipelineBindPoint::GRAPHICS && !node.in_render_pass() {
        findings.error(
            CB,
            cb,
            ErrorCode::NoActiveRenderPass,
            format!("Incorrectly binding graphics {} without an active render pass", what),
        );
        return false;
    }
    true
}

/// Compare the pipeline's sample count with the active subpass. Diagnostic only.
fn check_sample_count(
    node: &CommandBufferRecord,
    pipeline: u64,
    record: &PipelineRecord,
    render_passes: &HandleMap<RenderPassRecord>,
    findings: &mut Findings,
) {
    if !node.in_render_pass() {
        return;
    }
    let Some(render_pass) = render_passes.get(node.active_render_pass) else {
        return;
    };
    let subpass = match render_pass.subpass_samples(node.active_subpass) {
        Some(SubpassSamples::Count(n)) => Some(n),
        Some(SubpassSamples::Indeterminate) => None,
        Some(SubpassSamples::Unused) | None => return,
    };
    let pso = record.sample_count();
    if subpass == Some(pso) {
        return;
    }
    let subpass_desc = match subpass {
        Some(n) => n.to_string(),
        None => "inconsistent".to_string(),
    };
    findings.error(
        ObjectKind::Pipeline,
        pipeline,
        ErrorCode::NumSamplesMismatch,
        format!(
            "Num samples mismatch: binding pipeline {:#x} with {} samples while render pass {:#x} subpass {} has {} samples",
            pipeline, pso, node.active_render_pass, node.active_subpass, subpass_desc
        ),
    );
}

/// Re-run the sample check for the bound pipeline after the subpass changed.
fn recheck_bound_pipeline(
    node: &CommandBufferRecord,
    pipelines: &HandleMap<PipelineRecord>,
    render_passes: &HandleMap<RenderPassRecord>,
    findings: &mut Findings,
) {
    if let Some(record) = pipelines.get(node.last_bound_pipeline) {
        check_sample_count(node, node.last_bound_pipeline, record, render_passes, findings);
    }
}

fn bind_pipeline(
    node: &mut CommandBufferRecord,
    cb: u64,
    bind_point: vk::PipelineBindPoint,
    pipeline: u64,
    pipelines: &HandleMap<PipelineRecord>,
    render_passes: &HandleMap<RenderPassRecord>,
    findings: &mut Findings,
) -> Verdict {
    if !check_bind_point(node, cb, bind_point, "pipeline", findings) {
        return Verdict::Block;
    }
    let Some(record) = pipelines.get(pipeline) else {
        findings.error(
            ObjectKind::Pipeline,
            pipeline,
            ErrorCode::InvalidPipeline,
            format!("Attempt to bind pipeline {:#x} that doesn't exist", pipeline),
        );
        return Verdict::Block;
    };
    node.last_bound_pipeline = pipeline;
    node.status.remove(
        CbStatus::COLOR_BLEND_WRITE_ENABLE | CbStatus::DEPTH_WRITE_ENABLE | CbStatus::STENCIL_TEST_ENABLE,
    );
    if record.writes_color() {
        node.status.insert(CbStatus::COLOR_BLEND_WRITE_ENABLE);
    }
    if record.writes_depth() {
        node.status.insert(CbStatus::DEPTH_WRITE_ENABLE);
    }
    if record.tests_stencil() {
        node.status.insert(CbStatus::STENCIL_TEST_ENABLE);
    }
    if bind_point == vk::PipelineBindPoint::GRAPHICS {
        check_sample_count(node, pipeline, record, render_passes, findings);
    }
    Verdict::Forward
}

fn bind_dynamic_state(
    node: &mut CommandBufferRecord,
    cb: u64,
    kind: DynamicStateKind,
    state: u64,
    dynamic_states: &DynamicStateRegistry,
    findings: &mut Findings,
) -> Verdict {
    if !node.in_render_pass() {
        findings.error(
            CB,
            cb,
            ErrorCode::NoActiveRenderPass,
            format!(
                "Incorrect call to {}() without an active render pass",
                CommandKind::BindDynamicState(kind).entry_point()
            ),
        );
    }
    node.status.insert(CbStatus::bound(kind));
    if dynamic_states.contains(kind, state) {
        node.last_bound_dynamic_state[kind.index()] = state;
    } else {
        findings.error(
            kind.object_kind(),
            state,
            ErrorCode::InvalidDynamicStateObject,
            format!(
                "Unable to find {} dynamic state object {:#x}, was it ever created?",
                kind.name(),
                state
            ),
        );
    }
    Verdict::Forward
}

fn bind_descriptor_sets(
    node: &mut CommandBufferRecord,
    cb: u64,
    bind_point: vk::PipelineBindPoint,
    layout: u64,
    sets: &[vk::DescriptorSet],
    descriptors: &DescriptorRegistry,
    findings: &mut Findings,
) -> Verdict {
    if !check_bind_point(node, cb, bind_point, "descriptor sets", findings) {
        return Verdict::Block;
    }
    for set in sets.iter().map(|s| s.as_raw()) {
        let Some(record) = descriptors.set(set) else {
            findings.error(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::InvalidSet,
                format!("Attempt to bind descriptor set {:#x} that doesn't exist", set),
            );
            continue;
        };
        node.last_bound_descriptor_set = set;
        node.last_bound_pipeline_layout = layout;
        node.bound_descriptor_sets.push(set);
        findings.info(
            ObjectKind::DescriptorSet,
            set,
            ErrorCode::None,
            format!("Descriptor set {:#x} bound on pipeline {:?}", set, bind_point),
        );
        if !record.is_updated() {
            findings.warn(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::DescriptorSetNotUpdated,
                format!(
                    "Descriptor set {:#x} bound but it was never updated; update it or don't bind it",
                    set
                ),
            );
        }
    }
    Verdict::Forward
}

/// Bound-state checks that block the draw when they fail.
fn validate_draw_status(
    node: &CommandBufferRecord,
    cb: u64,
    indexed: bool,
    findings: &mut Findings,
) -> bool {
    let mut valid = true;
    for (enable, required, code, msg) in DRAW_STATUS_CHECKS {
        let applies = enable.is_empty() || node.status.intersects(enable);
        if applies && !node.status.contains(required) {
            findings.error(CB, cb, code, format!("Command buffer {:#x}: {}", cb, msg));
            valid = false;
        }
    }
    if indexed && !node.status.contains(CbStatus::INDEX_BUFFER_BOUND) {
        findings.error(
            CB,
            cb,
            ErrorCode::IndexBufferNotBound,
            format!(
                "Command buffer {:#x}: index buffer not bound when an indexed draw was attempted",
                cb
            ),
        );
        valid = false;
    }
    valid
}

/// Cross-object checks at draw time. Reported, never blocking.
fn validate_draw_state(
    node: &CommandBufferRecord,
    cb: u64,
    pipelines: &HandleMap<PipelineRecord>,
    findings: &mut Findings,
) {
    let pipeline = pipelines.get(node.last_bound_pipeline);
    if pipeline.is_none() {
        let msg = if node.last_bound_pipeline == 0 {
            "Draw issued with no pipeline bound".to_string()
        } else {
            format!(
                "Draw issued with pipeline {:#x} bound but it no longer exists",
                node.last_bound_pipeline
            )
        };
        findings.error(CB, cb, ErrorCode::NoPipelineBound, msg);
    }
    if let Some(p) = pipeline {
        if node.last_bound_pipeline_layout != 0 && node.last_bound_pipeline_layout != p.layout {
            findings.error(
                ObjectKind::PipelineLayout,
                node.last_bound_pipeline_layout,
                ErrorCode::PipelineLayoutMismatch,
                format!(
                    "Pipeline layout from last vkCmdBindDescriptorSets() ({:#x}) does not match pipeline layout ({:#x})",
                    node.last_bound_pipeline_layout, p.layout
                ),
            );
        }
    }
    if !node.in_render_pass() {
        findings.error(
            CB,
            cb,
            ErrorCode::NoActiveRenderPass,
            "Draw issued without an active render pass; vkCmdDraw*() must only be called within a render pass",
        );
    }
    if let (Some(slot), Some(p)) = (node.last_vertex_binding, pipeline) {
        let declared = p.vertex_bindings.len();
        if slot as usize >= declared {
            let msg = if declared == 0 {
                format!(
                    "Vertex buffer index {} was bound, but no vertex buffers are attached to the pipeline",
                    slot
                )
            } else {
                format!(
                    "Vertex binding index {} exceeds the pipeline's max vertex binding index of {}",
                    slot,
                    declared - 1
                )
            };
            findings.error(CB, cb, ErrorCode::VtxIndexOutOfBounds, msg);
        }
    }
}

fn dump_descriptor_state(node: &CommandBufferRecord, cb: u64, descriptors: &DescriptorRegistry) {
    for &set in &node.bound_descriptor_sets {
        match descriptors.set(set) {
            Some(record) => tracing::trace!(
                cb = format_args!("{:#x}", cb),
                set = format_args!("{:#x}", set),
                layout = format_args!("{:#x}", record.layout),
                descriptors = record.descriptor_count(),
                updates = record.history().len(),
                "bound descriptor set"
            ),
            None => tracing::trace!(
                cb = format_args!("{:#x}", cb),
                set = format_args!("{:#x}", set),
                "bound descriptor set no longer exists"
            ),
        }
    }
}

impl DeviceState {
    // ── Lifecycle ───────────────────────────────────────────────────

    pub fn allocate_command_buffers(&mut self, info: CommandBufferCreateRecord, handles: &[u64]) {
        for &cb in handles {
            self.command_buffers.insert(cb, CommandBufferRecord::new(info));
            tracing::debug!(
                cb = format_args!("{:#x}", cb),
                pool = format_args!("{:#x}", info.pool),
                level = ?info.level,
                "shadowed command buffer"
            );
        }
    }

    pub fn free_command_buffers(&mut self, handles: &[u64]) -> usize {
        handles
            .iter()
            .filter(|&&cb| self.command_buffers.remove(cb).is_some())
            .count()
    }

    pub fn check_begin(
        &self,
        cb: u64,
        inheritance: Option<Inheritance>,
        findings: &mut Findings,
    ) -> Verdict {
        let Some(node) = self.command_buffers.get(cb) else {
            missing_command_buffer(cb, "vkBeginCommandBuffer", findings);
            return Verdict::Block;
        };
        let inherited = inheritance.unwrap_or_default();
        if node.is_primary() {
            if inherited.render_pass != 0 || inherited.framebuffer != 0 {
                findings.error(
                    CB,
                    cb,
                    ErrorCode::BeginCbInvalidState,
                    format!(
                        "vkBeginCommandBuffer(): primary command buffer {:#x} may not specify render pass {:#x} or framebuffer {:#x} to inherit",
                        cb, inherited.render_pass, inherited.framebuffer
                    ),
                );
            }
        } else if inherited.render_pass == 0 || inherited.framebuffer == 0 {
            findings.error(
                CB,
                cb,
                ErrorCode::BeginCbInvalidState,
                format!(
                    "vkBeginCommandBuffer(): secondary command buffer {:#x} must specify a render pass and framebuffer to inherit",
                    cb
                ),
            );
        }
        if node.state == CbState::Recording {
            findings.error(
                CB,
                cb,
                ErrorCode::BeginCbInvalidState,
                format!(
                    "vkBeginCommandBuffer() on command buffer {:#x} that is already recording; end or reset it first",
                    cb
                ),
            );
            return Verdict::Block;
        }
        Verdict::Forward
    }

    /// Enter `Recording`, implicitly resetting a buffer that was used before.
    pub fn commit_begin(
        &mut self,
        cb: u64,
        usage: vk::CommandBufferUsageFlags,
        inheritance: Option<Inheritance>,
    ) {
        let Some(node) = self.command_buffers.get_mut(cb) else {
            return;
        };
        if node.state != CbState::New {
            node.reset();
        }
        node.state = CbState::Recording;
        node.usage = usage;
        if let Some(inherited) = inheritance {
            if !node.is_primary()
                && usage.contains(vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
            {
                node.active_render_pass = inherited.render_pass;
                node.active_subpass = inherited.subpass;
                node.framebuffer = inherited.framebuffer;
            }
        }
    }

    pub fn check_end(&self, cb: u64, findings: &mut Findings) -> Verdict {
        let Some(node) = self.command_buffers.get(cb) else {
            missing_command_buffer(cb, "vkEndCommandBuffer", findings);
            return Verdict::Block;
        };
        if node.state != CbState::Recording {
            findings.error(
                CB,
                cb,
                ErrorCode::NoBeginCmdBuffer,
                format!(
                    "You must call vkBeginCommandBuffer() before vkEndCommandBuffer() on command buffer {:#x}",
                    cb
                ),
            );
            return Verdict::Block;
        }
        Verdict::Forward
    }

    pub fn commit_end(&mut self, cb: u64) {
        let dump = self.options.dump_command_buffers;
        let Some(node) = self.command_buffers.get_mut(cb) else {
            return;
        };
        node.state = CbState::RecordedComplete;
        node.status = CbStatus::empty();
        if dump {
            tracing::trace!(
                cb = format_args!("{:#x}", cb),
                commands = node.commands.len(),
                "command buffer recorded"
            );
            for entry in &node.commands {
                tracing::trace!("  {:>4}: {}", entry.sequence, entry.kind.entry_point());
            }
        }
    }

    pub fn check_reset(&self, cb: u64, findings: &mut Findings) -> Verdict {
        if self.command_buffers.contains(cb) {
            Verdict::Forward
        } else {
            missing_command_buffer(cb, "vkResetCommandBuffer", findings);
            Verdict::Block
        }
    }

    pub fn commit_reset(&mut self, cb: u64) {
        if let Some(node) = self.command_buffers.get_mut(cb) {
            node.reset();
        }
    }

    /// Count the submission of each buffer and check it finished recording.
    pub fn queue_submit(&mut self, command_buffers: &[u64], findings: &mut Findings) -> Verdict {
        let mut valid = true;
        for &cb in command_buffers {
            let Some(node) = self.command_buffers.get_mut(cb) else {
                missing_command_buffer(cb, "vkQueueSubmit", findings);
                valid = false;
                continue;
            };
            node.submit_count += 1;
            if node.one_time_submit() && node.submit_count > 1 {
                findings.error(
                    CB,
                    cb,
                    ErrorCode::CmdBufferSingleSubmitViolation,
                    format!(
                        "Command buffer {:#x} was begun with ONE_TIME_SUBMIT but has been submitted {} times",
                        cb, node.submit_count
                    ),
                );
            }
            if node.state != CbState::RecordedComplete {
                findings.error(
                    CB,
                    cb,
                    ErrorCode::NoEndCmdBuffer,
                    format!(
                        "You must call vkEndCommandBuffer() on command buffer {:#x} before this call to vkQueueSubmit()",
                        cb
                    ),
                );
                valid = false;
            }
        }
        Verdict::from_valid(valid)
    }

    // ── Recording ───────────────────────────────────────────────────

    /// Validate one recording command and apply its effect on the buffer's
    /// shadow state. The command is logged only when it is forwarded.
    pub fn record(&mut self, cb: u64, command: &Command<'_>, findings: &mut Findings) -> Verdict {
        let kind = command.kind();
        if matches!(kind, CommandKind::DbgMarkerBegin | CommandKind::DbgMarkerEnd)
            && !self.debug_marker_enabled
        {
            findings.error(
                CB,
                cb,
                ErrorCode::InvalidExtension,
                format!(
                    "Attempt to use {}() but the debug marker extension is not enabled on this device",
                    kind.entry_point()
                ),
            );
            return Verdict::Block;
        }

        if let Command::ExecuteCommands { command_buffers } = command {
            self.check_secondaries(cb, command_buffers, findings);
        }

        let dump_descriptors = self.options.dump_descriptor_state;
        let DeviceState {
            command_buffers,
            pipelines,
            render_passes,
            dynamic_states,
            descriptors,
            draw_totals,
            ..
        } = self;

        let Some(node) = command_buffers.get_mut(cb) else {
            missing_command_buffer(cb, kind.entry_point(), findings);
            return Verdict::Block;
        };
        if node.state != CbState::Recording {
            findings.error(
                CB,
                cb,
                ErrorCode::NoBeginCmdBuffer,
                format!(
                    "You must call vkBeginCommandBuffer() before this call to {}()",
                    kind.entry_point()
                ),
            );
            return Verdict::Block;
        }

        let verdict = match *command {
            Command::BindPipeline {
                bind_point,
                pipeline,
            } => bind_pipeline(
                node,
                cb,
                bind_point,
                pipeline.as_raw(),
                pipelines,
                render_passes,
                findings,
            ),
            Command::BindDynamicState { kind, state } => {
                bind_dynamic_state(node, cb, kind, state, dynamic_states, findings)
            }
            Command::BindDescriptorSets {
                bind_point,
                layout,
                sets,
                ..
            } => bind_descriptor_sets(
                node,
                cb,
                bind_point,
                layout.as_raw(),
                sets,
                descriptors,
                findings,
            ),
            Command::BindIndexBuffer { .. } => {
                let valid = require_render_pass(node, cb, kind, findings);
                if valid {
                    node.status.insert(CbStatus::INDEX_BUFFER_BOUND);
                }
                Verdict::from_valid(valid)
            }
            Command::BindVertexBuffers {
                first_binding,
                buffers,
                ..
            } => {
                let valid = require_render_pass(node, cb, kind, findings);
                if valid {
                    node.last_vertex_binding = u32::try_from(buffers.len())
                        .ok()
                        .and_then(|count| first_binding.checked_add(count))
                        .and_then(|end| end.checked_sub(1));
                }
                Verdict::from_valid(valid)
            }
            Command::Draw { .. }
            | Command::DrawIndexed { .. }
            | Command::DrawIndirect { .. }
            | Command::DrawIndexedIndirect { .. } => {
                let draw = match kind {
                    CommandKind::DrawIndexed => DrawKind::Indexed,
                    CommandKind::DrawIndirect => DrawKind::Indirect,
                    CommandKind::DrawIndexedIndirect => DrawKind::IndexedIndirect,
                    _ => DrawKind::Draw,
                };
                node.draw_count[draw.index()] += 1;
                draw_totals[draw.index()] += 1;
                let valid = validate_draw_status(node, cb, draw.is_indexed(), findings);
                validate_draw_state(node, cb, pipelines, findings);
                findings.info(
                    CB,
                    cb,
                    ErrorCode::None,
                    format!("{}() call #{}", kind.entry_point(), draw_totals[draw.index()]),
                );
                if dump_descriptors {
                    dump_descriptor_state(node, cb, descriptors);
                }
                Verdict::from_valid(valid)
            }
            Command::BlitImage { .. }
            | Command::ResolveImage { .. }
            | Command::ClearColorImage { .. }
            | Command::ClearDepthStencilImage { .. } => {
                Verdict::from_valid(forbid_render_pass(node, cb, kind, findings))
            }
            Command::ClearColorAttachment { .. } | Command::ClearDepthStencilAttachment { .. } => {
                if !node.has_draw() {
                    let what = if kind == CommandKind::ClearColorAttachment {
                        "LOAD_OP_CLEAR on color attachments"
                    } else {
                        "LOAD_OP_CLEAR on the depth/stencil attachment"
                    };
                    findings.warn(
                        CB,
                        cb,
                        ErrorCode::ClearCmdBeforeDraw,
                        format!(
                            "{}() issued on command buffer {:#x} prior to any draw; it is recommended you use {} instead",
                            kind.entry_point(),
                            cb,
                            what
                        ),
                    );
                }
                Verdict::from_valid(require_render_pass(node, cb, kind, findings))
            }
            Command::BeginRenderPass {
                render_pass,
                framebuffer,
                ..
            } => {
                let render_pass = render_pass.as_raw();
                if render_pass == 0 {
                    findings.error(
                        CB,
                        cb,
                        ErrorCode::InvalidRenderPass,
                        "You cannot use a null render pass object in vkCmdBeginRenderPass()",
                    );
                    Verdict::Block
                } else if !render_passes.contains(render_pass) {
                    findings.error(
                        ObjectKind::RenderPass,
                        render_pass,
                        ErrorCode::InvalidRenderPass,
                        format!("Render pass {:#x} used in vkCmdBeginRenderPass() does not exist", render_pass),
                    );
                    Verdict::Block
                } else if node.in_render_pass() {
                    findings.error(
                        CB,
                        cb,
                        ErrorCode::InvalidRenderPassCmd,
                        format!(
                            "Cannot call vkCmdBeginRenderPass() during active render pass {:#x}; call vkCmdEndRenderPass() first",
                            node.active_render_pass
                        ),
                    );
                    Verdict::Block
                } else {
                    node.active_render_pass = render_pass;
                    node.active_subpass = 0;
                    node.framebuffer = framebuffer.as_raw();
                    recheck_bound_pipeline(node, pipelines, render_passes, findings);
                    Verdict::Forward
                }
            }
            Command::NextSubpass { .. } => {
                let valid = require_render_pass(node, cb, kind, findings);
                if valid {
                    node.active_subpass += 1;
                    let subpasses = render_passes
                        .get(node.active_render_pass)
                        .map(|rp| rp.subpasses.len());
                    if let Some(count) = subpasses.filter(|&n| node.active_subpass as usize >= n) {
                        findings.error(
                            CB,
                            cb,
                            ErrorCode::InvalidRenderPassCmd,
                            format!(
                                "vkCmdNextSubpass() advanced to subpass {} but render pass {:#x} has only {}",
                                node.active_subpass, node.active_render_pass, count
                            ),
                        );
                    }
                    recheck_bound_pipeline(node, pipelines, render_passes, findings);
                }
                Verdict::from_valid(valid)
            }
            Command::EndRenderPass => {
                let valid = require_render_pass(node, cb, kind, findings);
                if valid {
                    node.active_render_pass = 0;
                    node.active_subpass = 0;
                }
                Verdict::from_valid(valid)
            }
            Command::ExecuteCommands { .. } => {
                Verdict::from_valid(require_render_pass(node, cb, kind, findings))
            }
            Command::DbgMarkerBegin { .. } => {
                node.marker_depth += 1;
                Verdict::Forward
            }
            Command::DbgMarkerEnd => {
                node.marker_depth = node.marker_depth.saturating_sub(1);
                Verdict::Forward
            }
            Command::Dispatch { .. }
            | Command::DispatchIndirect { .. }
            | Command::CopyBuffer { .. }
            | Command::CopyImage { .. }
            | Command::CopyBufferToImage { .. }
            | Command::CopyImageToBuffer { .. }
            | Command::UpdateBuffer { .. }
            | Command::FillBuffer { .. }
            | Command::SetEvent { .. }
            | Command::ResetEvent { .. }
            | Command::WaitEvents { .. }
            | Command::PipelineBarrier { .. }
            | Command::BeginQuery { .. }
            | Command::EndQuery { .. }
            | Command::ResetQueryPool { .. }
            | Command::WriteTimestamp { .. } => Verdict::Forward,
        };

        if verdict.is_forward() && !node.log(kind) {
            findings.error(
                CB,
                cb,
                ErrorCode::OutOfMemory,
                format!("Out of memory while logging {}() on command buffer {:#x}", kind.entry_point(), cb),
            );
            return Verdict::Block;
        }
        verdict
    }

    /// Secondary buffers handed to vkCmdExecuteCommands must exist and be
    /// fully recorded. Diagnostic only.
    fn check_secondaries(&self, cb: u64, secondaries: &[vk::CommandBuffer], findings: &mut Findings) {
        for secondary in secondaries.iter().map(|s| s.as_raw()) {
            match self.command_buffers.get(secondary) {
                None => missing_command_buffer(secondary, "vkCmdExecuteCommands", findings),
                Some(node) if node.is_primary() => findings.error(
                    CB,
                    secondary,
                    ErrorCode::InvalidCmdBuffer,
                    format!(
                        "Primary command buffer {:#x} cannot be executed from command buffer {:#x}",
                        secondary, cb
                    ),
                ),
                Some(node) if node.state != CbState::RecordedComplete => findings.error(
                    CB,
                    secondary,
                    ErrorCode::NoEndCmdBuffer,
                    format!(
                        "Secondary command buffer {:#x} executed from {:#x} has not finished recording",
                        secondary, cb
                    ),
                ),
                Some(_) => {}
            }
        }
    }
}
