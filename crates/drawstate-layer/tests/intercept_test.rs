//! Integration test: intercepted calls, forwarding decisions and report delivery
//!
//! Run with: cargo test -p drawstate-layer --test intercept_test -- --nocapture

mod common;

use std::sync::Arc;

use ash::vk::{self, Handle};
use common::*;
use drawstate_core::dynamic_state::{
    DepthBiasStateCreateInfo, DynamicStateCreateInfo, DynamicStateKind, LineWidthStateCreateInfo,
    ViewportStateCreateInfo,
};
use drawstate_core::report::CATEGORY;
use drawstate_core::{Command, DrawStateConfig, ErrorCode, Severity, Verdict};
use drawstate_layer::{DrawStateDevice, DrawStateLayer, VALIDATION_FAILED};

/// Create viewport, line-width and depth-bias objects and bind them on `cb`.
fn bind_required_dynamic_state(device: &DrawStateDevice<MockNext>, cb: vk::CommandBuffer) {
    let viewport = ViewportStateCreateInfo {
        viewports: vec![vk::Viewport {
            width: 64.0,
            height: 64.0,
            max_depth: 1.0,
            ..Default::default()
        }],
        scissors: Vec::new(),
    };
    let line_width = LineWidthStateCreateInfo { line_width: 1.0 };
    let depth_bias = DepthBiasStateCreateInfo::default();
    let infos = [
        DynamicStateCreateInfo::Viewport(&viewport),
        DynamicStateCreateInfo::LineWidth(&line_width),
        DynamicStateCreateInfo::DepthBias(&depth_bias),
    ];
    for info in infos {
        let state = unsafe { device.create_dynamic_state(info) }.expect("dynamic state");
        let bind = Command::BindDynamicState {
            kind: info.kind(),
            state,
        };
        assert_eq!(unsafe { device.cmd(cb, &bind) }, Verdict::Forward);
    }
}

/// One-subpass render pass with a single 1-sample color attachment, plus a
/// framebuffer for it.
fn create_render_pass(device: &DrawStateDevice<MockNext>) -> (vk::RenderPass, vk::Framebuffer) {
    let attachments = [vk::AttachmentDescription::default()
        .format(vk::Format::B8G8R8A8_UNORM)
        .samples(vk::SampleCountFlags::TYPE_1)];
    let color = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color)];
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);
    let render_pass = unsafe { device.create_render_pass(&info) }.expect("render pass");

    let views = [vk::ImageView::from_raw(0x70)];
    let fb_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&views)
        .width(64)
        .height(64)
        .layers(1);
    let framebuffer = unsafe { device.create_framebuffer(&fb_info) }.expect("framebuffer");
    (render_pass, framebuffer)
}

fn begin_render_pass(render_pass: vk::RenderPass, framebuffer: vk::Framebuffer) -> Command<'static> {
    Command::BeginRenderPass {
        render_pass,
        framebuffer,
        render_area: vk::Rect2D::default(),
        clear_values: &[],
        contents: vk::SubpassContents::INLINE,
    }
}

// ── Pipelines ───────────────────────────────────────────────────────

#[test]
fn test_invalid_pipeline_is_not_forwarded() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);

    match create_pipeline(&device, false) {
        Err(e) => assert_eq!(e, VALIDATION_FAILED),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(!device.next().forwarded("vkCreateGraphicsPipelines"));
    assert_eq!(sink.error_codes(), vec![ErrorCode::InvalidPipelineCreateState]);
    assert_eq!(device.context().inspect(|s| s.pipelines.len()), 0);
}

#[test]
fn test_valid_pipeline_is_shadowed() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);

    let pipelines = create_pipeline(&device, true).expect("pipeline");
    assert_eq!(pipelines.len(), 1);
    assert!(sink.error_codes().is_empty());
    let layout = device
        .context()
        .inspect(|s| s.pipelines.get(pipelines[0].as_raw()).map(|p| p.layout));
    assert_eq!(layout, Some(0x200));

    unsafe { device.destroy_pipeline(pipelines[0]) };
    assert_eq!(device.context().inspect(|s| s.pipelines.len()), 0);
    assert!(device.next().forwarded("vkDestroyPipeline"));
}

// ── Command buffers ─────────────────────────────────────────────────

#[test]
fn test_draw_without_dynamic_state_is_blocked() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let pipeline = create_pipeline(&device, true).expect("pipeline")[0];
    let (render_pass, framebuffer) = create_render_pass(&device);
    let cb = recording_primary(&device);

    assert_eq!(
        unsafe { device.cmd(cb, &begin_render_pass(render_pass, framebuffer)) },
        Verdict::Forward
    );
    let bind = Command::BindPipeline {
        bind_point: vk::PipelineBindPoint::GRAPHICS,
        pipeline,
    };
    assert_eq!(unsafe { device.cmd(cb, &bind) }, Verdict::Forward);
    sink.clear();

    assert_eq!(unsafe { device.cmd(cb, &draw()) }, Verdict::Block);
    assert!(!device.next().forwarded("vkCmdDraw"));
    let codes = sink.error_codes();
    for code in [
        ErrorCode::ViewportNotBound,
        ErrorCode::LineWidthNotBound,
        ErrorCode::DepthBiasNotBound,
    ] {
        assert!(codes.contains(&code), "missing {:?} in {:?}", code, codes);
    }
    assert!(!codes.contains(&ErrorCode::BlendNotBound));
}

#[test]
fn test_draw_in_render_pass_is_forwarded() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let pipeline = create_pipeline(&device, true).expect("pipeline")[0];
    let (render_pass, framebuffer) = create_render_pass(&device);
    let cb = recording_primary(&device);

    assert_eq!(
        unsafe { device.cmd(cb, &begin_render_pass(render_pass, framebuffer)) },
        Verdict::Forward
    );
    let bind = Command::BindPipeline {
        bind_point: vk::PipelineBindPoint::GRAPHICS,
        pipeline,
    };
    assert_eq!(unsafe { device.cmd(cb, &bind) }, Verdict::Forward);
    bind_required_dynamic_state(&device, cb);

    assert_eq!(unsafe { device.cmd(cb, &draw()) }, Verdict::Forward);
    assert_eq!(unsafe { device.cmd(cb, &Command::EndRenderPass) }, Verdict::Forward);
    unsafe { device.end_command_buffer(cb) }.expect("end");

    assert!(sink.error_codes().is_empty(), "unexpected: {:?}", sink.reports());
    assert_eq!(
        device.next().calls().iter().filter(|c| c.starts_with("vkCmd")).count(),
        7
    );
    let (draws, logged) = device.context().inspect(|s| {
        let node = s.command_buffers.get(cb.as_raw()).expect("shadowed");
        (node.draw_count[0], node.commands.len())
    });
    assert_eq!(draws, 1);
    assert_eq!(logged, 7);
}

#[test]
fn test_command_outside_recording_is_blocked() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = allocate_command_buffer(&device, vk::CommandBufferLevel::PRIMARY);

    assert_eq!(unsafe { device.cmd(cb, &draw()) }, Verdict::Block);
    assert_eq!(sink.error_codes(), vec![ErrorCode::NoBeginCmdBuffer]);

    match unsafe { device.end_command_buffer(cb) } {
        Err(e) => assert_eq!(e, VALIDATION_FAILED),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(!device.next().forwarded("vkEndCommandBuffer"));
}

#[test]
fn test_begin_twice_is_blocked() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = recording_primary(&device);

    let begin = vk::CommandBufferBeginInfo::default();
    assert_eq!(
        unsafe { device.begin_command_buffer(cb, &begin) },
        Err(VALIDATION_FAILED)
    );
    assert_eq!(device.next().count("vkBeginCommandBuffer"), 1);
    assert_eq!(sink.error_codes(), vec![ErrorCode::BeginCbInvalidState]);

    unsafe { device.reset_command_buffer(cb, vk::CommandBufferResetFlags::empty()) }
        .expect("reset");
    unsafe { device.begin_command_buffer(cb, &begin) }.expect("begin after reset");
    assert_eq!(device.next().count("vkBeginCommandBuffer"), 2);
}

#[test]
fn test_secondary_inherits_render_pass() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let (render_pass, framebuffer) = create_render_pass(&device);
    let cb = allocate_command_buffer(&device, vk::CommandBufferLevel::SECONDARY);

    let inheritance = vk::CommandBufferInheritanceInfo::default()
        .render_pass(render_pass)
        .subpass(0)
        .framebuffer(framebuffer);
    let begin = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
        .inheritance_info(&inheritance);
    unsafe { device.begin_command_buffer(cb, &begin) }.expect("begin");

    let active = device
        .context()
        .inspect(|s| s.command_buffers.get(cb.as_raw()).map(|n| n.active_render_pass));
    assert_eq!(active, Some(render_pass.as_raw()));
    assert!(sink.error_codes().is_empty());
}

#[test]
fn test_submit_unfinished_buffer_is_blocked() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = recording_primary(&device);
    let buffers = [cb];
    let submit = vk::SubmitInfo::default().command_buffers(&buffers);

    assert_eq!(
        unsafe { device.queue_submit(vk::Queue::null(), &[submit], vk::Fence::null()) },
        Err(VALIDATION_FAILED)
    );
    assert!(!device.next().forwarded("vkQueueSubmit"));
    assert_eq!(sink.error_codes(), vec![ErrorCode::NoEndCmdBuffer]);

    unsafe { device.end_command_buffer(cb) }.expect("end");
    unsafe { device.queue_submit(vk::Queue::null(), &[submit], vk::Fence::null()) }
        .expect("submit");
    assert!(device.next().forwarded("vkQueueSubmit"));
    let submits = device
        .context()
        .inspect(|s| s.command_buffers.get(cb.as_raw()).map(|n| n.submit_count));
    assert_eq!(submits, Some(2));
}

#[test]
fn test_debug_marker_without_extension_is_blocked() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = recording_primary(&device);

    let marker = Command::DbgMarkerBegin { marker: "frame" };
    assert_eq!(unsafe { device.cmd(cb, &marker) }, Verdict::Block);
    assert_eq!(sink.error_codes(), vec![ErrorCode::InvalidExtension]);

    let (marked_layer, _marked_sink) = make_layer();
    let marked = make_device(&marked_layer, true);
    let cb = recording_primary(&marked);
    assert_eq!(unsafe { marked.cmd(cb, &marker) }, Verdict::Forward);
    assert!(marked.next().forwarded("vkCmdDbgMarkerBegin"));
}

#[test]
fn test_free_command_buffers_drops_shadow() {
    let (layer, _sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = allocate_command_buffer(&device, vk::CommandBufferLevel::PRIMARY);

    unsafe { device.free_command_buffers(vk::CommandPool::from_raw(0x50), &[cb]) };
    assert!(device.next().forwarded("vkFreeCommandBuffers"));
    assert!(device
        .context()
        .inspect(|s| s.command_buffers.get(cb.as_raw()).is_none()));
}

// ── Descriptors ─────────────────────────────────────────────────────

/// Layout with one uniform buffer at binding 0, a pool, and one set from it.
fn allocate_uniform_set(device: &DrawStateDevice<MockNext>) -> (vk::DescriptorPool, vk::DescriptorSet) {
    let bindings = [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::VERTEX)];
    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    let layout = unsafe { device.create_descriptor_set_layout(&layout_info) }.expect("layout");

    let sizes = [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: 4,
    }];
    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(4)
        .pool_sizes(&sizes);
    let pool = unsafe { device.create_descriptor_pool(&pool_info) }.expect("pool");

    let layouts = [layout];
    let alloc = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);
    let sets = unsafe { device.allocate_descriptor_sets(&alloc) }.expect("sets");
    (pool, sets[0])
}

#[test]
fn test_descriptor_update_forwarded_only_when_valid() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let (_pool, set) = allocate_uniform_set(&device);
    sink.clear();

    let buffers = [vk::DescriptorBufferInfo {
        buffer: vk::Buffer::from_raw(0x90),
        offset: 0,
        range: 256,
    }];
    let wrong_type = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(0)
        .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
        .buffer_info(&buffers);
    assert_eq!(
        unsafe { device.update_descriptor_sets(&[wrong_type], &[]) },
        Verdict::Block
    );
    assert!(!device.next().forwarded("vkUpdateDescriptorSets"));
    assert_eq!(sink.error_codes(), vec![ErrorCode::DescriptorTypeMismatch]);

    let write = wrong_type.descriptor_type(vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(
        unsafe { device.update_descriptor_sets(&[write], &[]) },
        Verdict::Forward
    );
    assert!(device.next().forwarded("vkUpdateDescriptorSets"));
    let updated = device
        .context()
        .inspect(|s| s.descriptors.set(set.as_raw()).map(|r| r.is_updated()));
    assert_eq!(updated, Some(true));
}

#[test]
fn test_descriptor_pool_reset_and_destroy() {
    let (layer, _sink) = make_layer();
    let device = make_device(&layer, false);
    let (pool, set) = allocate_uniform_set(&device);
    assert_eq!(device.context().inspect(|s| s.descriptors.set_count()), 1);

    unsafe { device.reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty()) }
        .expect("reset");
    assert!(device
        .context()
        .inspect(|s| s.descriptors.set(set.as_raw()).is_none()));

    unsafe { device.destroy_descriptor_pool(pool) };
    assert!(device.next().forwarded("vkDestroyDescriptorPool"));
}

#[test]
fn test_free_unknown_set_reports() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let (pool, _set) = allocate_uniform_set(&device);
    sink.clear();

    unsafe { device.free_descriptor_sets(pool, &[vk::DescriptorSet::from_raw(0xbad)]) }
        .expect("free is forwarded");
    assert_eq!(sink.error_codes(), vec![ErrorCode::InvalidSet]);
}

// ── Reports ─────────────────────────────────────────────────────────

#[test]
fn test_reports_carry_category_and_handle() {
    let (layer, sink) = make_layer();
    let device = make_device(&layer, false);
    let cb = allocate_command_buffer(&device, vk::CommandBufferLevel::PRIMARY);

    let _ = unsafe { device.cmd(cb, &Command::EndRenderPass) };
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    println!("{:?}", report);
    assert_eq!(report.category, CATEGORY);
    assert_eq!(report.severity, Severity::Error);
    assert_eq!(report.handle, cb.as_raw());
    assert!(report.message.contains("vkBeginCommandBuffer"));
}

#[test]
fn test_dynamic_state_objects_are_shadowed() {
    let (layer, _sink) = make_layer();
    let device = make_device(&layer, false);
    let line_width = LineWidthStateCreateInfo { line_width: 2.0 };
    let state = unsafe { device.create_dynamic_state(DynamicStateCreateInfo::LineWidth(&line_width)) }
        .expect("create");
    assert!(device
        .context()
        .inspect(|s| s.dynamic_states.contains(DynamicStateKind::LineWidth, state)));

    unsafe { device.destroy_dynamic_state(DynamicStateKind::LineWidth, state) };
    assert!(!device
        .context()
        .inspect(|s| s.dynamic_states.contains(DynamicStateKind::LineWidth, state)));
    assert!(device.next().forwarded("vkDestroyDynamicState(line width)"));
}

#[test]
fn test_unknown_command_buffers_stay_out_of_recent_ring() {
    let mut config = DrawStateConfig::default();
    config.debug.track_recent_command_buffers = true;
    config.debug.recent_capacity = 2;
    let sink = Arc::new(RecordingSink::default());
    let layer = DrawStateLayer::with_sink(config, sink.clone());
    let device = make_device(&layer, false);

    let first = recording_primary(&device);
    let second = recording_primary(&device);
    let expected = vec![second.as_raw(), first.as_raw()];
    assert_eq!(device.context().recent_command_buffers(), expected);

    let begin = vk::CommandBufferBeginInfo::default();
    for raw in [0xbad0, 0xbad1, 0xbad2] {
        let cb = vk::CommandBuffer::from_raw(raw);
        assert_eq!(unsafe { device.begin_command_buffer(cb, &begin) }, Err(VALIDATION_FAILED));
        assert_eq!(unsafe { device.end_command_buffer(cb) }, Err(VALIDATION_FAILED));
        assert_eq!(unsafe { device.cmd(cb, &draw()) }, Verdict::Block);
    }

    assert_eq!(device.context().recent_command_buffers(), expected);
    assert_eq!(sink.error_codes(), vec![ErrorCode::InvalidCmdBuffer; 9]);
}
