//! Entry-point name resolution.
//!
//! The loader asks the layer for each entry point by name. Names in these
//! tables are intercepted; anything else is resolved by the next layer.

use ash::vk;

/// Result of resolving an entry-point name.
#[derive(Debug, Clone, Copy)]
pub enum ProcAddr {
    /// Intercepted by this layer.
    Layer(&'static str),
    /// Not intercepted; whatever the next layer returned.
    Next(vk::PFN_vkVoidFunction),
}

impl ProcAddr {
    pub fn is_intercepted(&self) -> bool {
        matches!(self, ProcAddr::Layer(_))
    }
}

/// Instance-level entry points.
pub const INSTANCE_ENTRY_POINTS: &[&str] = &[
    "vkGetInstanceProcAddr",
    "vkCreateDevice",
    "vkEnumerateInstanceLayerProperties",
    "vkEnumerateDeviceLayerProperties",
    "vkEnumerateDeviceExtensionProperties",
];

/// Device-level entry points, always intercepted.
pub const DEVICE_ENTRY_POINTS: &[&str] = &[
    // ── Device and queue ────────────────────────────────────
    "vkGetDeviceProcAddr",
    "vkDestroyDevice",
    "vkQueueSubmit",
    // ── Objects ─────────────────────────────────────────────
    "vkCreateSampler",
    "vkDestroySampler",
    "vkCreateImageView",
    "vkDestroyImageView",
    "vkCreateBufferView",
    "vkDestroyBufferView",
    "vkCreateGraphicsPipelines",
    "vkDestroyPipeline",
    "vkCreateDescriptorSetLayout",
    "vkDestroyDescriptorSetLayout",
    "vkCreateDescriptorPool",
    "vkDestroyDescriptorPool",
    "vkResetDescriptorPool",
    "vkAllocateDescriptorSets",
    "vkFreeDescriptorSets",
    "vkUpdateDescriptorSets",
    "vkCreateRenderPass",
    "vkDestroyRenderPass",
    "vkCreateFramebuffer",
    "vkDestroyFramebuffer",
    "vkCreateDynamicViewportState",
    "vkDestroyDynamicViewportState",
    "vkCreateDynamicLineWidthState",
    "vkDestroyDynamicLineWidthState",
    "vkCreateDynamicDepthBiasState",
    "vkDestroyDynamicDepthBiasState",
    "vkCreateDynamicBlendState",
    "vkDestroyDynamicBlendState",
    "vkCreateDynamicDepthBoundsState",
    "vkDestroyDynamicDepthBoundsState",
    "vkCreateDynamicStencilState",
    "vkDestroyDynamicStencilState",
    // ── Command buffers ─────────────────────────────────────
    "vkAllocateCommandBuffers",
    "vkFreeCommandBuffers",
    "vkBeginCommandBuffer",
    "vkEndCommandBuffer",
    "vkResetCommandBuffer",
    // ── Recording ───────────────────────────────────────────
    "vkCmdBindPipeline",
    "vkCmdBindDynamicViewportState",
    "vkCmdBindDynamicLineWidthState",
    "vkCmdBindDynamicDepthBiasState",
    "vkCmdBindDynamicBlendState",
    "vkCmdBindDynamicDepthBoundsState",
    "vkCmdBindDynamicStencilState",
    "vkCmdBindDescriptorSets",
    "vkCmdBindIndexBuffer",
    "vkCmdBindVertexBuffers",
    "vkCmdDraw",
    "vkCmdDrawIndexed",
    "vkCmdDrawIndirect",
    "vkCmdDrawIndexedIndirect",
    "vkCmdDispatch",
    "vkCmdDispatchIndirect",
    "vkCmdCopyBuffer",
    "vkCmdCopyImage",
    "vkCmdBlitImage",
    "vkCmdCopyBufferToImage",
    "vkCmdCopyImageToBuffer",
    "vkCmdUpdateBuffer",
    "vkCmdFillBuffer",
    "vkCmdClearColorImage",
    "vkCmdClearDepthStencilImage",
    "vkCmdClearColorAttachment",
    "vkCmdClearDepthStencilAttachment",
    "vkCmdResolveImage",
    "vkCmdSetEvent",
    "vkCmdResetEvent",
    "vkCmdWaitEvents",
    "vkCmdPipelineBarrier",
    "vkCmdBeginQuery",
    "vkCmdEndQuery",
    "vkCmdResetQueryPool",
    "vkCmdWriteTimestamp",
    "vkCmdBeginRenderPass",
    "vkCmdNextSubpass",
    "vkCmdEndRenderPass",
    "vkCmdExecuteCommands",
];

/// Intercepted only on devices that enabled the debug-marker extension.
pub const DEBUG_MARKER_ENTRY_POINTS: &[&str] = &["vkCmdDbgMarkerBegin", "vkCmdDbgMarkerEnd"];

fn find(table: &'static [&'static str], name: &str) -> Option<&'static str> {
    table.iter().copied().find(|&entry| entry == name)
}

/// Name of the intercepted device-level entry point matching `name`.
pub fn lookup_device(name: &str, debug_marker_enabled: bool) -> Option<&'static str> {
    find(DEVICE_ENTRY_POINTS, name).or_else(|| {
        debug_marker_enabled
            .then(|| find(DEBUG_MARKER_ENTRY_POINTS, name))
            .flatten()
    })
}

/// Name of the intercepted instance-level entry point matching `name`.
/// Device-level names resolve here too, as the loader allows.
pub fn lookup_instance(name: &str) -> Option<&'static str> {
    find(INSTANCE_ENTRY_POINTS, name).or_else(|| find(DEVICE_ENTRY_POINTS, name))
}
