//! Per-device interception: validate under the device lock, deliver findings,
//! then forward to the next layer.

use std::ffi::CStr;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use drawstate_core::command::CommandBufferCreateRecord;
use drawstate_core::descriptor::{DescriptorPoolRecord, DescriptorSetLayoutRecord};
use drawstate_core::dynamic_state::{DynamicStateCreateInfo, DynamicStateKind};
use drawstate_core::pipeline::PipelineRecord;
use drawstate_core::raw;
use drawstate_core::render_pass::{FramebufferRecord, RenderPassRecord};
use drawstate_core::resources::{BufferViewRecord, ImageViewRecord, SamplerRecord};
use drawstate_core::{
    Command, DeviceState, DiagnosticSink, DrawStateConfig, Findings, Inheritance, TeardownSummary,
    ValidationContext, Verdict,
};

use crate::dispatch::NextLayer;
use crate::proc_addr::{self, ProcAddr};

/// Returned by a create or begin call the layer refused to forward.
pub const VALIDATION_FAILED: vk::Result = vk::Result::ERROR_VALIDATION_FAILED_EXT;

fn blocked(verdict: Verdict) -> VkResult<()> {
    if verdict.is_forward() {
        Ok(())
    } else {
        Err(VALIDATION_FAILED)
    }
}

/// One device as seen by the layer.
pub struct DrawStateDevice<N: NextLayer> {
    ctx: ValidationContext,
    next: N,
    sink: Arc<dyn DiagnosticSink>,
}

impl<N: NextLayer> DrawStateDevice<N> {
    pub fn new(
        next: N,
        config: &DrawStateConfig,
        sink: Arc<dyn DiagnosticSink>,
        debug_marker_enabled: bool,
    ) -> Self {
        let device = next.device().as_raw();
        tracing::debug!(
            device = format_args!("{:#x}", device),
            debug_marker_enabled,
            "validation context created"
        );
        Self {
            ctx: ValidationContext::new(device, config, debug_marker_enabled),
            next,
            sink,
        }
    }

    pub fn handle(&self) -> vk::Device {
        vk::Device::from_raw(self.ctx.device())
    }

    pub fn context(&self) -> &ValidationContext {
        &self.ctx
    }

    pub fn next(&self) -> &N {
        &self.next
    }

    /// Run `f` under the device lock, then hand its findings to the sink.
    fn validate<R>(&self, f: impl FnOnce(&mut DeviceState, &mut Findings) -> R) -> R {
        let mut findings = Findings::new();
        let out = {
            let mut state = self.ctx.lock();
            f(&mut state, &mut findings)
        };
        findings.deliver(&*self.sink);
        out
    }

    /// [`validate`](Self::validate) for calls naming command buffers. Only
    /// buffers this device has shadowed enter the recent ring.
    fn validate_cbs<R>(
        &self,
        cbs: &[u64],
        f: impl FnOnce(&mut DeviceState, &mut Findings) -> R,
    ) -> R {
        self.validate(|s, findings| {
            for &cb in cbs {
                if s.command_buffers.contains(cb) {
                    self.ctx.touch(cb);
                }
            }
            f(s, findings)
        })
    }

    pub fn get_device_proc_addr(&self, name: &CStr) -> ProcAddr {
        let marker = self.ctx.inspect(|s| s.debug_marker_enabled());
        match name.to_str().ok().and_then(|n| proc_addr::lookup_device(n, marker)) {
            Some(entry) => ProcAddr::Layer(entry),
            None => ProcAddr::Next(self.next.get_device_proc_addr(name)),
        }
    }

    /// Forward the destroy and release every shadow record.
    pub(crate) unsafe fn destroy(&self) -> TeardownSummary {
        unsafe { self.next.destroy_device() };
        self.ctx.teardown()
    }

    // ── Queue ───────────────────────────────────────────────

    /// # Safety
    /// Each submit's command buffer array must be valid for its count.
    pub unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> VkResult<()> {
        let command_buffers: Vec<u64> = submits
            .iter()
            .flat_map(|s| unsafe { raw::slice(s.p_command_buffers, s.command_buffer_count) })
            .map(|cb| cb.as_raw())
            .collect();
        blocked(self.validate_cbs(&command_buffers, |s, f| s.queue_submit(&command_buffers, f)))?;
        unsafe { self.next.queue_submit(queue, submits, fence) }
    }

    // ── Samplers and views ──────────────────────────────────

    pub unsafe fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        let sampler = unsafe { self.next.create_sampler(info) }?;
        let record = SamplerRecord::shadow(info);
        self.validate(|s, _| s.samplers.insert(sampler.as_raw(), record));
        Ok(sampler)
    }

    pub unsafe fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.next.destroy_sampler(sampler) };
        self.validate(|s, _| s.samplers.remove(sampler.as_raw()));
    }

    pub unsafe fn create_image_view(
        &self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        let view = unsafe { self.next.create_image_view(info) }?;
        let record = ImageViewRecord::shadow(info);
        self.validate(|s, _| s.image_views.insert(view.as_raw(), record));
        Ok(view)
    }

    pub unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.next.destroy_image_view(view) };
        self.validate(|s, _| s.image_views.remove(view.as_raw()));
    }

    pub unsafe fn create_buffer_view(
        &self,
        info: &vk::BufferViewCreateInfo<'_>,
    ) -> VkResult<vk::BufferView> {
        let view = unsafe { self.next.create_buffer_view(info) }?;
        let record = BufferViewRecord::shadow(info);
        self.validate(|s, _| s.buffer_views.insert(view.as_raw(), record));
        Ok(view)
    }

    pub unsafe fn destroy_buffer_view(&self, view: vk::BufferView) {
        unsafe { self.next.destroy_buffer_view(view) };
        self.validate(|s, _| s.buffer_views.remove(view.as_raw()));
    }

    // ── Pipelines ───────────────────────────────────────────

    /// Shadow and verify every request; if any fails nothing is forwarded.
    ///
    /// # Safety
    /// Every pointer reachable from `infos` must be valid for its count.
    pub unsafe fn create_graphics_pipelines(
        &self,
        cache: vk::PipelineCache,
        infos: &[vk::GraphicsPipelineCreateInfo<'_>],
    ) -> VkResult<Vec<vk::Pipeline>> {
        let records: Vec<PipelineRecord> = infos
            .iter()
            .map(|ci| unsafe { PipelineRecord::shadow(ci) })
            .collect();
        blocked(self.validate(|s, f| s.verify_pipelines(&records, f)))?;

        let pipelines = unsafe { self.next.create_graphics_pipelines(cache, infos) }?;
        self.validate(|s, _| {
            for (pipeline, record) in pipelines.iter().zip(records) {
                s.insert_pipeline(pipeline.as_raw(), record);
            }
        });
        Ok(pipelines)
    }

    pub unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.next.destroy_pipeline(pipeline) };
        self.validate(|s, _| s.pipelines.remove(pipeline.as_raw()));
    }

    // ── Descriptors ─────────────────────────────────────────

    pub unsafe fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        let layout = unsafe { self.next.create_descriptor_set_layout(info) }?;
        let record = unsafe { DescriptorSetLayoutRecord::shadow(info) };
        self.validate(|s, _| s.descriptors.create_layout(layout.as_raw(), record));
        Ok(layout)
    }

    pub unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.next.destroy_descriptor_set_layout(layout) };
        self.validate(|s, _| s.descriptors.destroy_layout(layout.as_raw()));
    }

    pub unsafe fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        let pool = unsafe { self.next.create_descriptor_pool(info) }?;
        let record = unsafe { DescriptorPoolRecord::shadow(info) };
        self.validate(|s, _| s.descriptors.create_pool(pool.as_raw(), record));
        Ok(pool)
    }

    pub unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.next.destroy_descriptor_pool(pool) };
        let released = self.validate(|s, _| s.descriptors.destroy_pool(pool.as_raw()));
        tracing::debug!(pool = format_args!("{:#x}", pool.as_raw()), released, "descriptor pool destroyed");
    }

    pub unsafe fn reset_descriptor_pool(
        &self,
        pool: vk::DescriptorPool,
        flags: vk::DescriptorPoolResetFlags,
    ) -> VkResult<()> {
        unsafe { self.next.reset_descriptor_pool(pool, flags) }?;
        self.validate(|s, f| s.descriptors.reset_pool(pool.as_raw(), f));
        Ok(())
    }

    /// # Safety
    /// `info.p_set_layouts` must be valid for `info.descriptor_set_count`.
    pub unsafe fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        let sets = unsafe { self.next.allocate_descriptor_sets(info) }?;
        let layouts: Vec<u64> = unsafe { raw::slice(info.p_set_layouts, info.descriptor_set_count) }
            .iter()
            .map(|l| l.as_raw())
            .collect();
        let handles: Vec<u64> = sets.iter().map(|s| s.as_raw()).collect();
        self.validate(|s, f| {
            s.descriptors
                .allocate_sets(info.descriptor_pool.as_raw(), &layouts, &handles, f)
        });
        Ok(sets)
    }

    pub unsafe fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> VkResult<()> {
        unsafe { self.next.free_descriptor_sets(pool, sets) }?;
        let handles: Vec<u64> = sets.iter().map(|s| s.as_raw()).collect();
        self.validate(|s, f| s.descriptors.free_sets(pool.as_raw(), &handles, f));
        Ok(())
    }

    /// Shadow the whole batch; forwarded only if every update passed.
    ///
    /// # Safety
    /// Every write's descriptor info pointer must be valid for its count.
    pub unsafe fn update_descriptor_sets(
        &self,
        writes: &[vk::WriteDescriptorSet<'_>],
        copies: &[vk::CopyDescriptorSet<'_>],
    ) -> Verdict {
        let valid = self.validate(|s, f| unsafe { s.descriptors.update_sets(writes, copies, f) });
        let verdict = Verdict::from_valid(valid);
        if verdict.is_forward() {
            unsafe { self.next.update_descriptor_sets(writes, copies) };
        }
        verdict
    }

    // ── Render passes ───────────────────────────────────────

    pub unsafe fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        let render_pass = unsafe { self.next.create_render_pass(info) }?;
        let record = unsafe { RenderPassRecord::shadow(info) };
        self.validate(|s, _| s.render_passes.insert(render_pass.as_raw(), record));
        Ok(render_pass)
    }

    pub unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.next.destroy_render_pass(render_pass) };
        self.validate(|s, _| s.render_passes.remove(render_pass.as_raw()));
    }

    pub unsafe fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        let framebuffer = unsafe { self.next.create_framebuffer(info) }?;
        let record = unsafe { FramebufferRecord::shadow(info) };
        self.validate(|s, _| s.framebuffers.insert(framebuffer.as_raw(), record));
        Ok(framebuffer)
    }

    pub unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.next.destroy_framebuffer(framebuffer) };
        self.validate(|s, _| s.framebuffers.remove(framebuffer.as_raw()));
    }

    // ── Dynamic state objects ───────────────────────────────

    pub unsafe fn create_dynamic_state(&self, info: DynamicStateCreateInfo<'_>) -> VkResult<u64> {
        let state = unsafe { self.next.create_dynamic_state(info) }?;
        self.validate(|s, _| s.dynamic_states.insert(state, info));
        tracing::debug!(
            state = format_args!("{:#x}", state),
            kind = info.kind().name(),
            "shadowed dynamic state"
        );
        Ok(state)
    }

    pub unsafe fn destroy_dynamic_state(&self, kind: DynamicStateKind, state: u64) {
        unsafe { self.next.destroy_dynamic_state(kind, state) };
        self.validate(|s, _| s.dynamic_states.remove(kind, state));
    }

    // ── Command buffers ─────────────────────────────────────

    pub unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let buffers = unsafe { self.next.allocate_command_buffers(info) }?;
        let create_info = CommandBufferCreateRecord {
            pool: info.command_pool.as_raw(),
            level: info.level,
        };
        let handles: Vec<u64> = buffers.iter().map(|cb| cb.as_raw()).collect();
        self.validate(|s, _| s.allocate_command_buffers(create_info, &handles));
        Ok(buffers)
    }

    pub unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.next.free_command_buffers(pool, buffers) };
        let handles: Vec<u64> = buffers.iter().map(|cb| cb.as_raw()).collect();
        self.validate(|s, _| s.free_command_buffers(&handles));
        for cb in handles {
            self.ctx.forget(cb);
        }
    }

    /// # Safety
    /// `info.p_inheritance_info` must be null or valid.
    pub unsafe fn begin_command_buffer(
        &self,
        cb: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        let handle = cb.as_raw();
        let inheritance = unsafe { info.p_inheritance_info.as_ref() }.map(|i| Inheritance {
            render_pass: i.render_pass.as_raw(),
            subpass: i.subpass,
            framebuffer: i.framebuffer.as_raw(),
        });
        blocked(self.validate_cbs(&[handle], |s, f| s.check_begin(handle, inheritance, f)))?;
        unsafe { self.next.begin_command_buffer(cb, info) }?;
        self.validate(|s, _| s.commit_begin(handle, info.flags, inheritance));
        Ok(())
    }

    pub unsafe fn end_command_buffer(&self, cb: vk::CommandBuffer) -> VkResult<()> {
        let handle = cb.as_raw();
        blocked(self.validate_cbs(&[handle], |s, f| s.check_end(handle, f)))?;
        unsafe { self.next.end_command_buffer(cb) }?;
        self.validate(|s, _| s.commit_end(handle));
        Ok(())
    }

    pub unsafe fn reset_command_buffer(
        &self,
        cb: vk::CommandBuffer,
        flags: vk::CommandBufferResetFlags,
    ) -> VkResult<()> {
        let handle = cb.as_raw();
        blocked(self.validate_cbs(&[handle], |s, f| s.check_reset(handle, f)))?;
        unsafe { self.next.reset_command_buffer(cb, flags) }?;
        self.validate(|s, _| s.commit_reset(handle));
        Ok(())
    }

    /// Validate and shadow one recording command, forwarding it when valid.
    pub unsafe fn cmd(&self, cb: vk::CommandBuffer, command: &Command<'_>) -> Verdict {
        let handle = cb.as_raw();
        let verdict = self.validate_cbs(&[handle], |s, f| s.record(handle, command, f));
        if verdict.is_forward() {
            unsafe { self.next.cmd(cb, command) };
        }
        verdict
    }
}
