//! Graphics pipeline shadowing and create-time validation.

use ash::vk::{self, Handle};

use crate::raw;
use crate::report::{ErrorCode, Findings, ObjectKind};

const GRAPHICS_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw()
        | vk::ShaderStageFlags::TESSELLATION_CONTROL.as_raw()
        | vk::ShaderStageFlags::TESSELLATION_EVALUATION.as_raw()
        | vk::ShaderStageFlags::GEOMETRY.as_raw()
        | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

const TESSELLATION_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::TESSELLATION_CONTROL.as_raw()
        | vk::ShaderStageFlags::TESSELLATION_EVALUATION.as_raw(),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageRecord {
    pub stage: vk::ShaderStageFlags,
    pub module: u64,
    pub entry_point: String,
}

#[derive(Debug, Clone, Copy)]
pub struct InputAssemblyRecord {
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart_enable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViewportStateRecord {
    pub viewport_count: u32,
    pub scissor_count: u32,
    /// Static viewports, empty when the state is supplied dynamically.
    pub viewports: Vec<vk::Viewport>,
    pub scissors: Vec<vk::Rect2D>,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterRecord {
    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
    pub line_width: f32,
}

#[derive(Debug, Clone)]
pub struct MultisampleRecord {
    pub rasterization_samples: vk::SampleCountFlags,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    pub sample_mask: Vec<vk::SampleMask>,
    pub alpha_to_coverage_enable: bool,
    pub alpha_to_one_enable: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilRecord {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: vk::CompareOp,
    pub depth_bounds_test_enable: bool,
    pub stencil_test_enable: bool,
    pub front: vk::StencilOpState,
    pub back: vk::StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

#[derive(Debug, Clone)]
pub struct ColorBlendRecord {
    pub logic_op_enable: bool,
    pub logic_op: vk::LogicOp,
    pub attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub blend_constants: [f32; 4],
}

/// Owned copy of a graphics pipeline create request.
#[derive(Debug, Clone, Default)]
pub struct PipelineRecord {
    pub flags: vk::PipelineCreateFlags,
    pub stages: Vec<ShaderStageRecord>,
    /// Union of every stage in `stages`.
    pub active_stages: vk::ShaderStageFlags,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub input_assembly: Option<InputAssemblyRecord>,
    pub patch_control_points: Option<u32>,
    pub viewport: Option<ViewportStateRecord>,
    pub raster: Option<RasterRecord>,
    pub multisample: Option<MultisampleRecord>,
    pub depth_stencil: Option<DepthStencilRecord>,
    pub color_blend: Option<ColorBlendRecord>,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub layout: u64,
    pub render_pass: u64,
    pub subpass: u32,
    pub base_pipeline: u64,
}

impl PipelineRecord {
    /// Deep-copy every sub-state block of `ci`.
    ///
    /// # Safety
    /// Every non-null pointer reachable from `ci` must be valid for the counts
    /// it is paired with, as the API requires of the application.
    pub unsafe fn shadow(ci: &vk::GraphicsPipelineCreateInfo<'_>) -> Self {
        // Shader stages
        let mut stages = Vec::with_capacity(ci.stage_count as usize);
        let mut active_stages = vk::ShaderStageFlags::empty();
        for stage in unsafe { raw::slice(ci.p_stages, ci.stage_count) } {
            active_stages |= stage.stage;
            stages.push(ShaderStageRecord {
                stage: stage.stage,
                module: stage.module.as_raw(),
                entry_point: unsafe { raw::string(stage.p_name, "main") },
            });
        }

        // Vertex input state
        let (vertex_bindings, vertex_attributes) = match unsafe { ci.p_vertex_input_state.as_ref() }
        {
            Some(vis) => unsafe {
                (
                    raw::slice(
                        vis.p_vertex_binding_descriptions,
                        vis.vertex_binding_description_count,
                    )
                    .to_vec(),
                    raw::slice(
                        vis.p_vertex_attribute_descriptions,
                        vis.vertex_attribute_description_count,
                    )
                    .to_vec(),
                )
            },
            None => (Vec::new(), Vec::new()),
        };

        let input_assembly =
            unsafe { ci.p_input_assembly_state.as_ref() }.map(|ias| InputAssemblyRecord {
                topology: ias.topology,
                primitive_restart_enable: ias.primitive_restart_enable != vk::FALSE,
            });

        let patch_control_points =
            unsafe { ci.p_tessellation_state.as_ref() }.map(|ts| ts.patch_control_points);

        let viewport = unsafe { ci.p_viewport_state.as_ref() }.map(|vps| ViewportStateRecord {
            viewport_count: vps.viewport_count,
            scissor_count: vps.scissor_count,
            viewports: unsafe { raw::slice(vps.p_viewports, vps.viewport_count) }.to_vec(),
            scissors: unsafe { raw::slice(vps.p_scissors, vps.scissor_count) }.to_vec(),
        });

        let raster = unsafe { ci.p_rasterization_state.as_ref() }.map(|rs| RasterRecord {
            depth_clamp_enable: rs.depth_clamp_enable != vk::FALSE,
            rasterizer_discard_enable: rs.rasterizer_discard_enable != vk::FALSE,
            polygon_mode: rs.polygon_mode,
            cull_mode: rs.cull_mode,
            front_face: rs.front_face,
            depth_bias_enable: rs.depth_bias_enable != vk::FALSE,
            line_width: rs.line_width,
        });

        let multisample = unsafe { ci.p_multisample_state.as_ref() }.map(|ms| {
            // One mask word per 32 samples.
            let words = ms.rasterization_samples.as_raw().div_ceil(32);
            MultisampleRecord {
                rasterization_samples: ms.rasterization_samples,
                sample_shading_enable: ms.sample_shading_enable != vk::FALSE,
                min_sample_shading: ms.min_sample_shading,
                sample_mask: unsafe { raw::slice(ms.p_sample_mask, words) }.to_vec(),
                alpha_to_coverage_enable: ms.alpha_to_coverage_enable != vk::FALSE,
                alpha_to_one_enable: ms.alpha_to_one_enable != vk::FALSE,
            }
        });

        let depth_stencil =
            unsafe { ci.p_depth_stencil_state.as_ref() }.map(|ds| DepthStencilRecord {
                depth_test_enable: ds.depth_test_enable != vk::FALSE,
                depth_write_enable: ds.depth_write_enable != vk::FALSE,
                depth_compare_op: ds.depth_compare_op,
                depth_bounds_test_enable: ds.depth_bounds_test_enable != vk::FALSE,
                stencil_test_enable: ds.stencil_test_enable != vk::FALSE,
                front: ds.front,
                back: ds.back,
                min_depth_bounds: ds.min_depth_bounds,
                max_depth_bounds: ds.max_depth_bounds,
            });

        let color_blend = unsafe { ci.p_color_blend_state.as_ref() }.map(|cbs| ColorBlendRecord {
            logic_op_enable: cbs.logic_op_enable != vk::FALSE,
            logic_op: cbs.logic_op,
            attachments: unsafe { raw::slice(cbs.p_attachments, cbs.attachment_count) }.to_vec(),
            blend_constants: cbs.blend_constants,
        });

        let dynamic_states = match unsafe { ci.p_dynamic_state.as_ref() } {
            Some(dyn_s) => unsafe {
                raw::slice(dyn_s.p_dynamic_states, dyn_s.dynamic_state_count).to_vec()
            },
            None => Vec::new(),
        };

        Self {
            flags: ci.flags,
            stages,
            active_stages,
            vertex_bindings,
            vertex_attributes,
            input_assembly,
            patch_control_points,
            viewport,
            raster,
            multisample,
            depth_stencil,
            color_blend,
            dynamic_states,
            layout: ci.layout.as_raw(),
            render_pass: ci.render_pass.as_raw(),
            subpass: ci.subpass,
            base_pipeline: ci.base_pipeline_handle.as_raw(),
        }
    }

    pub fn topology(&self) -> Option<vk::PrimitiveTopology> {
        self.input_assembly.map(|ia| ia.topology)
    }

    /// Sample count declared by the multisample state, 1 when absent.
    pub fn sample_count(&self) -> u32 {
        match &self.multisample {
            Some(ms) if !ms.rasterization_samples.is_empty() => ms.rasterization_samples.as_raw(),
            _ => 1,
        }
    }

    /// Any color attachment writes at least one channel.
    pub fn writes_color(&self) -> bool {
        self.color_blend.as_ref().is_some_and(|cb| {
            cb.attachments
                .iter()
                .any(|a| !a.color_write_mask.is_empty())
        })
    }

    pub fn writes_depth(&self) -> bool {
        self.depth_stencil.is_some_and(|ds| ds.depth_write_enable)
    }

    pub fn tests_stencil(&self) -> bool {
        self.depth_stencil.is_some_and(|ds| ds.stencil_test_enable)
    }

    /// Check create-time legality. Rules run in order and the first failure
    /// is the only one reported.
    pub fn verify(&self, device: u64, findings: &mut Findings) -> bool {
        let stages = self.active_stages;
        let fail = |findings: &mut Findings, msg: &str| {
            findings.error(
                ObjectKind::Device,
                device,
                ErrorCode::InvalidPipelineCreateState,
                format!("Invalid pipeline create state: {}", msg),
            );
            false
        };

        if !stages.contains(vk::ShaderStageFlags::VERTEX) {
            return fail(findings, "vertex shader required");
        }
        if stages.contains(vk::ShaderStageFlags::TESSELLATION_CONTROL)
            != stages.contains(vk::ShaderStageFlags::TESSELLATION_EVALUATION)
        {
            return fail(
                findings,
                "tessellation control and evaluation shaders must be included or excluded as a pair",
            );
        }
        if stages.contains(vk::ShaderStageFlags::COMPUTE) && stages.intersects(GRAPHICS_STAGES) {
            return fail(findings, "compute shader cannot be part of a graphics pipeline");
        }
        let patch_list = self.topology() == Some(vk::PrimitiveTopology::PATCH_LIST);
        if stages.intersects(TESSELLATION_STAGES) && !patch_list {
            return fail(
                findings,
                "PATCH_LIST topology is required for tessellation pipelines",
            );
        }
        if patch_list && !stages.contains(vk::ShaderStageFlags::TESSELLATION_CONTROL) {
            return fail(
                findings,
                "PATCH_LIST topology is only valid for tessellation pipelines",
            );
        }
        true
    }
}
