//! Render pass and framebuffer shadows, with the per-subpass attachment
//! sample counts that pipeline binds are checked against.

use ash::vk::{self, Handle};

use crate::raw;

#[derive(Debug, Clone, Default)]
pub struct SubpassRecord {
    pub bind_point: vk::PipelineBindPoint,
    pub input_attachments: Vec<vk::AttachmentReference>,
    pub color_attachments: Vec<vk::AttachmentReference>,
    pub resolve_attachments: Vec<vk::AttachmentReference>,
    pub depth_stencil_attachment: Option<vk::AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

/// Sample count shared by every attachment a subpass renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassSamples {
    /// No color or depth/stencil attachment is in use.
    Unused,
    Count(u32),
    /// Attachments disagree with each other.
    Indeterminate,
}

#[derive(Debug, Clone, Default)]
pub struct RenderPassRecord {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub subpasses: Vec<SubpassRecord>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

impl RenderPassRecord {
    /// # Safety
    /// Every non-null pointer reachable from `ci` must be valid for its count.
    pub unsafe fn shadow(ci: &vk::RenderPassCreateInfo<'_>) -> Self {
        let subpasses = unsafe { raw::slice(ci.p_subpasses, ci.subpass_count) }
            .iter()
            .map(|sp| unsafe {
                SubpassRecord {
                    bind_point: sp.pipeline_bind_point,
                    input_attachments: raw::slice(sp.p_input_attachments, sp.input_attachment_count)
                        .to_vec(),
                    color_attachments: raw::slice(sp.p_color_attachments, sp.color_attachment_count)
                        .to_vec(),
                    // Resolve attachments, when present, pair up with the color attachments.
                    resolve_attachments: raw::slice(
                        sp.p_resolve_attachments,
                        sp.color_attachment_count,
                    )
                    .to_vec(),
                    depth_stencil_attachment: sp.p_depth_stencil_attachment.as_ref().copied(),
                    preserve_attachments: raw::slice(
                        sp.p_preserve_attachments,
                        sp.preserve_attachment_count,
                    )
                    .to_vec(),
                }
            })
            .collect();

        Self {
            attachments: unsafe { raw::slice(ci.p_attachments, ci.attachment_count) }.to_vec(),
            subpasses,
            dependencies: unsafe { raw::slice(ci.p_dependencies, ci.dependency_count) }.to_vec(),
        }
    }

    /// Derive the sample count of `subpass` from its color and depth/stencil
    /// attachments. Returns `None` for a subpass index the pass doesn't have.
    pub fn subpass_samples(&self, subpass: u32) -> Option<SubpassSamples> {
        let sp = self.subpasses.get(subpass as usize)?;
        let mut samples = SubpassSamples::Unused;
        let used = sp
            .color_attachments
            .iter()
            .chain(sp.depth_stencil_attachment.iter())
            .filter(|r| r.attachment != vk::ATTACHMENT_UNUSED);
        for reference in used {
            let Some(desc) = self.attachments.get(reference.attachment as usize) else {
                return Some(SubpassSamples::Indeterminate);
            };
            let count = desc.samples.as_raw();
            samples = match samples {
                SubpassSamples::Unused => SubpassSamples::Count(count),
                SubpassSamples::Count(n) if n == count => samples,
                _ => return Some(SubpassSamples::Indeterminate),
            };
        }
        Some(samples)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FramebufferRecord {
    pub render_pass: u64,
    pub attachments: Vec<u64>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

impl FramebufferRecord {
    /// # Safety
    /// `ci.p_attachments` must be valid for `ci.attachment_count` views when non-null.
    pub unsafe fn shadow(ci: &vk::FramebufferCreateInfo<'_>) -> Self {
        Self {
            render_pass: ci.render_pass.as_raw(),
            attachments: unsafe { raw::slice(ci.p_attachments, ci.attachment_count) }
                .iter()
                .map(|v| v.as_raw())
                .collect(),
            width: ci.width,
            height: ci.height,
            layers: ci.layers,
        }
    }
}
