//! The next layer in the chain (another layer or the driver).
//!
//! Every intercepted call ends in exactly one of these methods once it has
//! passed validation. Calls that fail validation never reach it.

use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::vk;
use drawstate_core::dynamic_state::{DynamicStateCreateInfo, DynamicStateKind};
use drawstate_core::Command;

/// Device-level dispatch to the next layer.
///
/// # Safety
/// Create infos and command payloads are passed through exactly as the
/// application supplied them; every pointer inside them must be valid for
/// the duration of the call, as the API requires.
pub trait NextLayer: Send + Sync {
    /// Handle of the device this dispatch belongs to.
    fn device(&self) -> vk::Device;

    /// Resolve an entry point the layer does not intercept.
    fn get_device_proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction;

    unsafe fn destroy_device(&self);

    // ── Queue ───────────────────────────────────────────────

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> VkResult<()>;

    // ── Samplers and views ──────────────────────────────────

    unsafe fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler>;
    unsafe fn destroy_sampler(&self, sampler: vk::Sampler);

    unsafe fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>)
        -> VkResult<vk::ImageView>;
    unsafe fn destroy_image_view(&self, view: vk::ImageView);

    unsafe fn create_buffer_view(
        &self,
        info: &vk::BufferViewCreateInfo<'_>,
    ) -> VkResult<vk::BufferView>;
    unsafe fn destroy_buffer_view(&self, view: vk::BufferView);

    // ── Pipelines ───────────────────────────────────────────

    unsafe fn create_graphics_pipelines(
        &self,
        cache: vk::PipelineCache,
        infos: &[vk::GraphicsPipelineCreateInfo<'_>],
    ) -> VkResult<Vec<vk::Pipeline>>;
    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // ── Descriptors ─────────────────────────────────────────

    unsafe fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout>;
    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    unsafe fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool>;
    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);
    unsafe fn reset_descriptor_pool(
        &self,
        pool: vk::DescriptorPool,
        flags: vk::DescriptorPoolResetFlags,
    ) -> VkResult<()>;

    unsafe fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::DescriptorSet>>;
    unsafe fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> VkResult<()>;
    unsafe fn update_descriptor_sets(
        &self,
        writes: &[vk::WriteDescriptorSet<'_>],
        copies: &[vk::CopyDescriptorSet<'_>],
    );

    // ── Render passes ───────────────────────────────────────

    unsafe fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass>;
    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    unsafe fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer>;
    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // ── Dynamic state objects ───────────────────────────────

    unsafe fn create_dynamic_state(&self, info: DynamicStateCreateInfo<'_>) -> VkResult<u64>;
    unsafe fn destroy_dynamic_state(&self, kind: DynamicStateKind, state: u64);

    // ── Command buffers ─────────────────────────────────────

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>>;
    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

    unsafe fn begin_command_buffer(
        &self,
        cb: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()>;
    unsafe fn end_command_buffer(&self, cb: vk::CommandBuffer) -> VkResult<()>;
    unsafe fn reset_command_buffer(
        &self,
        cb: vk::CommandBuffer,
        flags: vk::CommandBufferResetFlags,
    ) -> VkResult<()>;

    /// Record one command. Covers every `vkCmd*` entry point.
    unsafe fn cmd(&self, cb: vk::CommandBuffer, command: &Command<'_>);
}
