//! Mock next layer and capturing sink for the drawstate-layer tests.
#![allow(dead_code)]

use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use drawstate_core::dynamic_state::{DynamicStateCreateInfo, DynamicStateKind};
use drawstate_core::{
    Command, DiagnosticSink, DrawStateConfig, ErrorCode, ObjectKind, Severity,
};
use drawstate_layer::{DrawStateDevice, DrawStateLayer, NextLayer};
use parking_lot::Mutex;

pub const DEVICE: u64 = 0xd0;

/// Next layer that records every call it receives and hands out handles
/// from a counter.
pub struct MockNext {
    device: vk::Device,
    next_handle: AtomicU64,
    calls: Mutex<Vec<String>>,
}

impl MockNext {
    pub fn new(device: u64) -> Self {
        Self {
            device: vk::Device::from_raw(device),
            next_handle: AtomicU64::new(0x1000),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Whether `call` was forwarded at least once.
    pub fn forwarded(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }
}

impl NextLayer for MockNext {
    fn device(&self) -> vk::Device {
        self.device
    }

    fn get_device_proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        self.log(format!("vkGetDeviceProcAddr({})", name.to_string_lossy()));
        None
    }

    unsafe fn destroy_device(&self) {
        self.log("vkDestroyDevice");
    }

    unsafe fn queue_submit(
        &self,
        _queue: vk::Queue,
        _submits: &[vk::SubmitInfo<'_>],
        _fence: vk::Fence,
    ) -> VkResult<()> {
        self.log("vkQueueSubmit");
        Ok(())
    }

    unsafe fn create_sampler(&self, _info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        self.log("vkCreateSampler");
        Ok(vk::Sampler::from_raw(self.handle()))
    }

    unsafe fn destroy_sampler(&self, _sampler: vk::Sampler) {
        self.log("vkDestroySampler");
    }

    unsafe fn create_image_view(
        &self,
        _info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        self.log("vkCreateImageView");
        Ok(vk::ImageView::from_raw(self.handle()))
    }

    unsafe fn destroy_image_view(&self, _view: vk::ImageView) {
        self.log("vkDestroyImageView");
    }

    unsafe fn create_buffer_view(
        &self,
        _info: &vk::BufferViewCreateInfo<'_>,
    ) -> VkResult<vk::BufferView> {
        self.log("vkCreateBufferView");
        Ok(vk::BufferView::from_raw(self.handle()))
    }

    unsafe fn destroy_buffer_view(&self, _view: vk::BufferView) {
        self.log("vkDestroyBufferView");
    }

    unsafe fn create_graphics_pipelines(
        &self,
        _cache: vk::PipelineCache,
        infos: &[vk::GraphicsPipelineCreateInfo<'_>],
    ) -> VkResult<Vec<vk::Pipeline>> {
        self.log("vkCreateGraphicsPipelines");
        Ok(infos.iter().map(|_| vk::Pipeline::from_raw(self.handle())).collect())
    }

    unsafe fn destroy_pipeline(&self, _pipeline: vk::Pipeline) {
        self.log("vkDestroyPipeline");
    }

    unsafe fn create_descriptor_set_layout(
        &self,
        _info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        self.log("vkCreateDescriptorSetLayout");
        Ok(vk::DescriptorSetLayout::from_raw(self.handle()))
    }

    unsafe fn destroy_descriptor_set_layout(&self, _layout: vk::DescriptorSetLayout) {
        self.log("vkDestroyDescriptorSetLayout");
    }

    unsafe fn create_descriptor_pool(
        &self,
        _info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        self.log("vkCreateDescriptorPool");
        Ok(vk::DescriptorPool::from_raw(self.handle()))
    }

    unsafe fn destroy_descriptor_pool(&self, _pool: vk::DescriptorPool) {
        self.log("vkDestroyDescriptorPool");
    }

    unsafe fn reset_descriptor_pool(
        &self,
        _pool: vk::DescriptorPool,
        _flags: vk::DescriptorPoolResetFlags,
    ) -> VkResult<()> {
        self.log("vkResetDescriptorPool");
        Ok(())
    }

    unsafe fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        self.log("vkAllocateDescriptorSets");
        Ok((0..info.descriptor_set_count)
            .map(|_| vk::DescriptorSet::from_raw(self.handle()))
            .collect())
    }

    unsafe fn free_descriptor_sets(
        &self,
        _pool: vk::DescriptorPool,
        _sets: &[vk::DescriptorSet],
    ) -> VkResult<()> {
        self.log("vkFreeDescriptorSets");
        Ok(())
    }

    unsafe fn update_descriptor_sets(
        &self,
        _writes: &[vk::WriteDescriptorSet<'_>],
        _copies: &[vk::CopyDescriptorSet<'_>],
    ) {
        self.log("vkUpdateDescriptorSets");
    }

    unsafe fn create_render_pass(
        &self,
        _info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.log("vkCreateRenderPass");
        Ok(vk::RenderPass::from_raw(self.handle()))
    }

    unsafe fn destroy_render_pass(&self, _render_pass: vk::RenderPass) {
        self.log("vkDestroyRenderPass");
    }

    unsafe fn create_framebuffer(
        &self,
        _info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        self.log("vkCreateFramebuffer");
        Ok(vk::Framebuffer::from_raw(self.handle()))
    }

    unsafe fn destroy_framebuffer(&self, _framebuffer: vk::Framebuffer) {
        self.log("vkDestroyFramebuffer");
    }

    unsafe fn create_dynamic_state(&self, info: DynamicStateCreateInfo<'_>) -> VkResult<u64> {
        self.log(format!("vkCreateDynamicState({})", info.kind().name()));
        Ok(self.handle())
    }

    unsafe fn destroy_dynamic_state(&self, kind: DynamicStateKind, _state: u64) {
        self.log(format!("vkDestroyDynamicState({})", kind.name()));
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.log("vkAllocateCommandBuffers");
        Ok((0..info.command_buffer_count)
            .map(|_| vk::CommandBuffer::from_raw(self.handle()))
            .collect())
    }

    unsafe fn free_command_buffers(&self, _pool: vk::CommandPool, _buffers: &[vk::CommandBuffer]) {
        self.log("vkFreeCommandBuffers");
    }

    unsafe fn begin_command_buffer(
        &self,
        _cb: vk::CommandBuffer,
        _info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        self.log("vkBeginCommandBuffer");
        Ok(())
    }

    unsafe fn end_command_buffer(&self, _cb: vk::CommandBuffer) -> VkResult<()> {
        self.log("vkEndCommandBuffer");
        Ok(())
    }

    unsafe fn reset_command_buffer(
        &self,
        _cb: vk::CommandBuffer,
        _flags: vk::CommandBufferResetFlags,
    ) -> VkResult<()> {
        self.log("vkResetCommandBuffer");
        Ok(())
    }

    unsafe fn cmd(&self, _cb: vk::CommandBuffer, command: &Command<'_>) {
        self.log(command.kind().entry_point());
    }
}

/// One report as the sink received it.
#[derive(Debug, Clone)]
pub struct Report {
    pub severity: Severity,
    pub object_kind: ObjectKind,
    pub handle: u64,
    pub code: ErrorCode,
    pub category: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<Report>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.reports.lock().iter().map(|r| r.code).collect()
    }

    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.severity == Severity::Error)
            .map(|r| r.code)
            .collect()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(
        &self,
        severity: Severity,
        object_kind: ObjectKind,
        handle: u64,
        code: ErrorCode,
        category: &str,
        message: &str,
    ) {
        self.reports.lock().push(Report {
            severity,
            object_kind,
            handle,
            code,
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}

/// Layer with a capturing sink and default configuration.
pub fn make_layer() -> (DrawStateLayer<MockNext>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let layer = DrawStateLayer::with_sink(DrawStateConfig::default(), sink.clone());
    (layer, sink)
}

/// Create `DEVICE` on `layer`, optionally enabling the debug-marker extension.
pub fn make_device(
    layer: &DrawStateLayer<MockNext>,
    debug_marker: bool,
) -> Arc<DrawStateDevice<MockNext>> {
    let extensions = [c"VK_EXT_debug_marker".as_ptr()];
    let mut info = vk::DeviceCreateInfo::default();
    if debug_marker {
        info = info.enabled_extension_names(&extensions);
    }
    unsafe { layer.create_device(MockNext::new(DEVICE), &info) }
}

/// Allocate one command buffer of `level` and return it.
pub fn allocate_command_buffer(
    device: &DrawStateDevice<MockNext>,
    level: vk::CommandBufferLevel,
) -> vk::CommandBuffer {
    let info = vk::CommandBufferAllocateInfo::default()
        .command_pool(vk::CommandPool::from_raw(0x50))
        .level(level)
        .command_buffer_count(1);
    let buffers = unsafe { device.allocate_command_buffers(&info) }.expect("allocate");
    buffers[0]
}

/// Allocate and begin a primary command buffer.
pub fn recording_primary(device: &DrawStateDevice<MockNext>) -> vk::CommandBuffer {
    let cb = allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY);
    let begin = vk::CommandBufferBeginInfo::default();
    unsafe { device.begin_command_buffer(cb, &begin) }.expect("begin");
    cb
}

fn stage(flags: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo<'static> {
    vk::PipelineShaderStageCreateInfo::default()
        .stage(flags)
        .module(vk::ShaderModule::from_raw(0x11))
        .name(c"main")
}

/// Create a vertex + fragment pipeline, or a fragment-only one when `valid`
/// is false.
pub fn create_pipeline(
    device: &DrawStateDevice<MockNext>,
    valid: bool,
) -> VkResult<Vec<vk::Pipeline>> {
    let stages = if valid {
        vec![
            stage(vk::ShaderStageFlags::VERTEX),
            stage(vk::ShaderStageFlags::FRAGMENT),
        ]
    } else {
        vec![stage(vk::ShaderStageFlags::FRAGMENT)]
    };
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
    let info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .input_assembly_state(&input_assembly)
        .layout(vk::PipelineLayout::from_raw(0x200));
    unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[info]) }
}

pub fn draw() -> Command<'static> {
    Command::Draw {
        vertex_count: 3,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    }
}
