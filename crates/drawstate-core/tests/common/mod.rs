//! Fixtures shared by the drawstate-core integration tests.
#![allow(dead_code)]

use ash::vk::{self, Handle};
use drawstate_core::command::CommandBufferCreateRecord;
use drawstate_core::config::DebugConfig;
use drawstate_core::pipeline::{InputAssemblyRecord, MultisampleRecord, PipelineRecord};
use drawstate_core::render_pass::{RenderPassRecord, SubpassRecord};
use drawstate_core::{Command, DeviceState, ErrorCode, Findings, Severity, Verdict};

pub const DEVICE: u64 = 0xd0;
pub const CB: u64 = 0xc0;
pub const SECONDARY_CB: u64 = 0xc1;
pub const CB_POOL: u64 = 0x50;
pub const PIPELINE: u64 = 0x100;
pub const PIPELINE_LAYOUT: u64 = 0x200;
pub const RENDER_PASS: u64 = 0x300;
pub const FRAMEBUFFER: u64 = 0x400;

pub fn make_state() -> DeviceState {
    DeviceState::new(DEVICE, DebugConfig::default(), false)
}

pub fn primary() -> CommandBufferCreateRecord {
    CommandBufferCreateRecord {
        pool: CB_POOL,
        level: vk::CommandBufferLevel::PRIMARY,
    }
}

pub fn secondary() -> CommandBufferCreateRecord {
    CommandBufferCreateRecord {
        pool: CB_POOL,
        level: vk::CommandBufferLevel::SECONDARY,
    }
}

/// Every code reported, in order.
pub fn codes(findings: &Findings) -> Vec<ErrorCode> {
    findings.iter().map(|f| f.code).collect()
}

/// Codes reported at error severity, in order.
pub fn error_codes(findings: &Findings) -> Vec<ErrorCode> {
    findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .map(|f| f.code)
        .collect()
}

/// Vertex + fragment pipeline with a triangle list and the given sample count.
pub fn graphics_pipeline(samples: vk::SampleCountFlags) -> PipelineRecord {
    PipelineRecord {
        active_stages: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        input_assembly: Some(InputAssemblyRecord {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart_enable: false,
        }),
        multisample: Some(MultisampleRecord {
            rasterization_samples: samples,
            sample_shading_enable: false,
            min_sample_shading: 0.0,
            sample_mask: Vec::new(),
            alpha_to_coverage_enable: false,
            alpha_to_one_enable: false,
        }),
        layout: PIPELINE_LAYOUT,
        ..Default::default()
    }
}

/// Single-subpass render pass with one color attachment per entry of `samples`.
pub fn render_pass(samples: &[vk::SampleCountFlags]) -> RenderPassRecord {
    let attachments = samples
        .iter()
        .map(|&s| vk::AttachmentDescription::default().samples(s))
        .collect();
    let color_attachments = (0..samples.len() as u32)
        .map(|i| vk::AttachmentReference {
            attachment: i,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();
    RenderPassRecord {
        attachments,
        subpasses: vec![SubpassRecord {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            color_attachments,
            ..Default::default()
        }],
        dependencies: Vec::new(),
    }
}

/// Allocate `CB` as a primary buffer and begin it.
pub fn begin_primary(state: &mut DeviceState) {
    state.allocate_command_buffers(primary(), &[CB]);
    let mut findings = Findings::new();
    assert_eq!(state.check_begin(CB, None, &mut findings), Verdict::Forward);
    state.commit_begin(CB, vk::CommandBufferUsageFlags::empty(), None);
}

/// `CB` recording inside a 1-sample `RENDER_PASS`.
pub fn recording_in_render_pass() -> DeviceState {
    let mut state = make_state();
    state
        .render_passes
        .insert(RENDER_PASS, render_pass(&[vk::SampleCountFlags::TYPE_1]));
    begin_primary(&mut state);
    let verdict = record(&mut state, &begin_render_pass()).0;
    assert_eq!(verdict, Verdict::Forward);
    state
}

pub fn begin_render_pass() -> Command<'static> {
    Command::BeginRenderPass {
        render_pass: vk::RenderPass::from_raw(RENDER_PASS),
        framebuffer: vk::Framebuffer::from_raw(FRAMEBUFFER),
        render_area: vk::Rect2D::default(),
        clear_values: &[],
        contents: vk::SubpassContents::INLINE,
    }
}

pub fn bind_graphics_pipeline(pipeline: u64) -> Command<'static> {
    Command::BindPipeline {
        bind_point: vk::PipelineBindPoint::GRAPHICS,
        pipeline: vk::Pipeline::from_raw(pipeline),
    }
}

pub fn draw() -> Command<'static> {
    Command::Draw {
        vertex_count: 3,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    }
}

/// Record one command on `CB` and return the verdict with its findings.
pub fn record(state: &mut DeviceState, command: &Command<'_>) -> (Verdict, Findings) {
    let mut findings = Findings::new();
    let verdict = state.record(CB, command, &mut findings);
    (verdict, findings)
}
