//! Dynamic-state objects: separately created pieces of fixed-function state
//! that are bound to a command buffer between draws.
//!
//! The modern API folded these into `vkCmdSet*`, so `ash` has no types for
//! them; the create infos here are owned by this crate.

use ash::vk;

use crate::handle_map::HandleMap;
use crate::report::ObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicStateKind {
    Viewport,
    LineWidth,
    DepthBias,
    Blend,
    DepthBounds,
    Stencil,
}

impl DynamicStateKind {
    pub const ALL: [DynamicStateKind; 6] = [
        DynamicStateKind::Viewport,
        DynamicStateKind::LineWidth,
        DynamicStateKind::DepthBias,
        DynamicStateKind::Blend,
        DynamicStateKind::DepthBounds,
        DynamicStateKind::Stencil,
    ];

    /// Slot of this kind in per-kind arrays.
    pub fn index(self) -> usize {
        match self {
            DynamicStateKind::Viewport => 0,
            DynamicStateKind::LineWidth => 1,
            DynamicStateKind::DepthBias => 2,
            DynamicStateKind::Blend => 3,
            DynamicStateKind::DepthBounds => 4,
            DynamicStateKind::Stencil => 5,
        }
    }

    pub fn object_kind(self) -> ObjectKind {
        match self {
            DynamicStateKind::Viewport => ObjectKind::DynamicViewportState,
            DynamicStateKind::LineWidth => ObjectKind::DynamicLineWidthState,
            DynamicStateKind::DepthBias => ObjectKind::DynamicDepthBiasState,
            DynamicStateKind::Blend => ObjectKind::DynamicBlendState,
            DynamicStateKind::DepthBounds => ObjectKind::DynamicDepthBoundsState,
            DynamicStateKind::Stencil => ObjectKind::DynamicStencilState,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DynamicStateKind::Viewport => "viewport",
            DynamicStateKind::LineWidth => "line width",
            DynamicStateKind::DepthBias => "depth bias",
            DynamicStateKind::Blend => "blend",
            DynamicStateKind::DepthBounds => "depth bounds",
            DynamicStateKind::Stencil => "stencil",
        }
    }
}

// ── Create infos ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ViewportStateCreateInfo {
    pub viewports: Vec<vk::Viewport>,
    pub scissors: Vec<vk::Rect2D>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineWidthStateCreateInfo {
    pub line_width: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBiasStateCreateInfo {
    pub depth_bias: f32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlendStateCreateInfo {
    pub blend_constants: [f32; 4],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBoundsStateCreateInfo {
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StencilFaceState {
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StencilStateCreateInfo {
    pub front: StencilFaceState,
    /// `None` means the back face uses the front face values.
    pub back: Option<StencilFaceState>,
}

impl StencilStateCreateInfo {
    pub fn back_face(&self) -> StencilFaceState {
        self.back.unwrap_or(self.front)
    }
}

/// Borrowed create request for any dynamic-state kind.
#[derive(Debug, Clone, Copy)]
pub enum DynamicStateCreateInfo<'a> {
    Viewport(&'a ViewportStateCreateInfo),
    LineWidth(&'a LineWidthStateCreateInfo),
    DepthBias(&'a DepthBiasStateCreateInfo),
    Blend(&'a BlendStateCreateInfo),
    DepthBounds(&'a DepthBoundsStateCreateInfo),
    Stencil(&'a StencilStateCreateInfo),
}

impl DynamicStateCreateInfo<'_> {
    pub fn kind(&self) -> DynamicStateKind {
        match self {
            DynamicStateCreateInfo::Viewport(_) => DynamicStateKind::Viewport,
            DynamicStateCreateInfo::LineWidth(_) => DynamicStateKind::LineWidth,
            DynamicStateCreateInfo::DepthBias(_) => DynamicStateKind::DepthBias,
            DynamicStateCreateInfo::Blend(_) => DynamicStateKind::Blend,
            DynamicStateCreateInfo::DepthBounds(_) => DynamicStateKind::DepthBounds,
            DynamicStateCreateInfo::Stencil(_) => DynamicStateKind::Stencil,
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// One typed registry per dynamic-state kind.
#[derive(Debug, Default)]
pub struct DynamicStateRegistry {
    pub viewport: HandleMap<ViewportStateCreateInfo>,
    pub line_width: HandleMap<LineWidthStateCreateInfo>,
    pub depth_bias: HandleMap<DepthBiasStateCreateInfo>,
    pub blend: HandleMap<BlendStateCreateInfo>,
    pub depth_bounds: HandleMap<DepthBoundsStateCreateInfo>,
    pub stencil: HandleMap<StencilStateCreateInfo>,
}

impl DynamicStateRegistry {
    /// Shadow a freshly created object under `handle`.
    pub fn insert(&mut self, handle: u64, info: DynamicStateCreateInfo<'_>) {
        match info {
            DynamicStateCreateInfo::Viewport(i) => {
                self.viewport.insert(handle, i.clone());
            }
            DynamicStateCreateInfo::LineWidth(i) => {
                self.line_width.insert(handle, *i);
            }
            DynamicStateCreateInfo::DepthBias(i) => {
                self.depth_bias.insert(handle, *i);
            }
            DynamicStateCreateInfo::Blend(i) => {
                self.blend.insert(handle, *i);
            }
            DynamicStateCreateInfo::DepthBounds(i) => {
                self.depth_bounds.insert(handle, *i);
            }
            DynamicStateCreateInfo::Stencil(i) => {
                self.stencil.insert(handle, *i);
            }
        }
    }

    pub fn contains(&self, kind: DynamicStateKind, handle: u64) -> bool {
        match kind {
            DynamicStateKind::Viewport => self.viewport.contains(handle),
            DynamicStateKind::LineWidth => self.line_width.contains(handle),
            DynamicStateKind::DepthBias => self.depth_bias.contains(handle),
            DynamicStateKind::Blend => self.blend.contains(handle),
            DynamicStateKind::DepthBounds => self.depth_bounds.contains(handle),
            DynamicStateKind::Stencil => self.stencil.contains(handle),
        }
    }

    pub fn remove(&mut self, kind: DynamicStateKind, handle: u64) -> bool {
        match kind {
            DynamicStateKind::Viewport => self.viewport.remove(handle).is_some(),
            DynamicStateKind::LineWidth => self.line_width.remove(handle).is_some(),
            DynamicStateKind::DepthBias => self.depth_bias.remove(handle).is_some(),
            DynamicStateKind::Blend => self.blend.remove(handle).is_some(),
            DynamicStateKind::DepthBounds => self.depth_bounds.remove(handle).is_some(),
            DynamicStateKind::Stencil => self.stencil.remove(handle).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.viewport.len()
            + self.line_width.len()
            + self.depth_bias.len()
            + self.blend.len()
            + self.depth_bounds.len()
            + self.stencil.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) -> usize {
        self.viewport.clear()
            + self.line_width.clear()
            + self.depth_bias.clear()
            + self.blend.clear()
            + self.depth_bounds.clear()
            + self.stencil.clear()
    }
}
