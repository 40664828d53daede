//! Descriptor set layouts, pools and sets, and the update engine that keeps a
//! shadow copy of every descriptor write.
//!
//! A layout flattens its bindings, in create-info order, into one linear
//! index space. Each set keeps its update history plus one slot per linear
//! index naming the history entry that last touched it.

use std::collections::HashMap;
use std::ops::Range;

use ash::vk::{self, Handle};

use crate::handle_map::HandleMap;
use crate::raw;
use crate::report::{ErrorCode, Findings, ObjectKind};

// ── Layouts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    pub immutable_samplers: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutRecord {
    pub flags: vk::DescriptorSetLayoutCreateFlags,
    /// In create-info order; updates address bindings by position.
    pub bindings: Vec<LayoutBinding>,
    /// Expected descriptor type per linear index.
    pub types: Vec<vk::DescriptorType>,
    /// Stage visibility per linear index.
    pub stage_flags: Vec<vk::ShaderStageFlags>,
    starts: Vec<usize>,
}

impl DescriptorSetLayoutRecord {
    pub fn new(flags: vk::DescriptorSetLayoutCreateFlags, bindings: Vec<LayoutBinding>) -> Self {
        let mut types = Vec::new();
        let mut stage_flags = Vec::new();
        let mut starts = Vec::with_capacity(bindings.len());
        for b in &bindings {
            starts.push(types.len());
            let count = b.descriptor_count as usize;
            types.extend(std::iter::repeat(b.descriptor_type).take(count));
            stage_flags.extend(std::iter::repeat(b.stage_flags).take(count));
        }
        Self {
            flags,
            bindings,
            types,
            stage_flags,
            starts,
        }
    }

    /// # Safety
    /// `ci.p_bindings` and each binding's `p_immutable_samplers` must be valid
    /// for their counts when non-null.
    pub unsafe fn shadow(ci: &vk::DescriptorSetLayoutCreateInfo<'_>) -> Self {
        let bindings = unsafe { raw::slice(ci.p_bindings, ci.binding_count) }
            .iter()
            .map(|b| {
                let samplers = match b.descriptor_type {
                    vk::DescriptorType::SAMPLER | vk::DescriptorType::COMBINED_IMAGE_SAMPLER => {
                        unsafe { raw::slice(b.p_immutable_samplers, b.descriptor_count) }
                    }
                    _ => &[],
                };
                LayoutBinding {
                    binding: b.binding,
                    descriptor_type: b.descriptor_type,
                    descriptor_count: b.descriptor_count,
                    stage_flags: b.stage_flags,
                    immutable_samplers: samplers.iter().map(|s| s.as_raw()).collect(),
                }
            })
            .collect();
        Self::new(ci.flags, bindings)
    }

    /// Total descriptors across all bindings.
    pub fn descriptor_count(&self) -> usize {
        self.types.len()
    }

    /// Linear index range covered by the binding at position `binding`.
    /// `None` once `binding` reaches the layout's binding count.
    pub fn binding_range(&self, binding: u32) -> Option<Range<usize>> {
        let pos = binding as usize;
        let start = *self.starts.get(pos)?;
        Some(start..start + self.bindings[pos].descriptor_count as usize)
    }

    pub fn binding_start(&self, binding: u32) -> Option<usize> {
        self.binding_range(binding).map(|r| r.start)
    }

    /// Last linear index of `binding`; `None` for unknown or empty bindings.
    pub fn binding_end(&self, binding: u32) -> Option<usize> {
        self.binding_range(binding)
            .and_then(|r| r.end.checked_sub(1).filter(|end| *end >= r.start))
    }
}

// ── Update shadows ──────────────────────────────────────────────────

/// Deep copy of the descriptor info array carried by a write.
#[derive(Debug, Clone)]
pub enum DescriptorPayload {
    Images(Vec<vk::DescriptorImageInfo>),
    Buffers(Vec<vk::DescriptorBufferInfo>),
    TexelBuffers(Vec<u64>),
    None,
}

impl DescriptorPayload {
    pub fn len(&self) -> usize {
        match self {
            DescriptorPayload::Images(v) => v.len(),
            DescriptorPayload::Buffers(v) => v.len(),
            DescriptorPayload::TexelBuffers(v) => v.len(),
            DescriptorPayload::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub enum ShadowUpdate {
    Write {
        binding: u32,
        array_element: u32,
        descriptor_count: u32,
        descriptor_type: vk::DescriptorType,
        payload: DescriptorPayload,
    },
    Copy {
        src_set: u64,
        src_binding: u32,
        src_array_element: u32,
        binding: u32,
        array_element: u32,
        descriptor_count: u32,
    },
}

fn try_copy<T: Copy>(items: &[T]) -> Option<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(items.len()).ok()?;
    out.extend_from_slice(items);
    Some(out)
}

/// Copy the info array matching `write.descriptor_type`. `None` on allocation failure.
///
/// # Safety
/// The info pointer for the write's descriptor class must be valid for
/// `descriptor_count` elements when non-null.
unsafe fn copy_payload(write: &vk::WriteDescriptorSet<'_>) -> Option<DescriptorPayload> {
    let count = write.descriptor_count;
    let payload = match write.descriptor_type {
        vk::DescriptorType::SAMPLER
        | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        | vk::DescriptorType::SAMPLED_IMAGE
        | vk::DescriptorType::STORAGE_IMAGE
        | vk::DescriptorType::INPUT_ATTACHMENT => {
            DescriptorPayload::Images(try_copy(unsafe { raw::slice(write.p_image_info, count) })?)
        }
        vk::DescriptorType::UNIFORM_BUFFER
        | vk::DescriptorType::STORAGE_BUFFER
        | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
        | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC => {
            DescriptorPayload::Buffers(try_copy(unsafe { raw::slice(write.p_buffer_info, count) })?)
        }
        vk::DescriptorType::UNIFORM_TEXEL_BUFFER | vk::DescriptorType::STORAGE_TEXEL_BUFFER => {
            let views = unsafe { raw::slice(write.p_texel_buffer_view, count) };
            let mut out = Vec::new();
            out.try_reserve_exact(views.len()).ok()?;
            out.extend(views.iter().map(|v| v.as_raw()));
            DescriptorPayload::TexelBuffers(out)
        }
        _ => DescriptorPayload::None,
    };
    Some(payload)
}

// ── Sets and pools ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DescriptorSetRecord {
    pub pool: u64,
    pub layout: u64,
    slots: Vec<Option<usize>>,
    history: Vec<ShadowUpdate>,
}

impl DescriptorSetRecord {
    /// `None` when the slot array cannot be allocated.
    pub fn new(pool: u64, layout: u64, descriptor_count: usize) -> Option<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(descriptor_count).ok()?;
        slots.resize(descriptor_count, None);
        Some(Self {
            pool,
            layout,
            slots,
            history: Vec::new(),
        })
    }

    pub fn descriptor_count(&self) -> usize {
        self.slots.len()
    }

    /// Update history, oldest first.
    pub fn history(&self) -> &[ShadowUpdate] {
        &self.history
    }

    pub fn is_updated(&self) -> bool {
        !self.history.is_empty()
    }

    /// History index of the update that last touched linear index `index`.
    pub fn slot(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten()
    }

    /// The update that last touched linear index `index`.
    pub fn descriptor(&self, index: usize) -> Option<&ShadowUpdate> {
        self.slot(index).map(|i| &self.history[i])
    }

    fn apply(&mut self, update: ShadowUpdate, covered: Range<usize>) {
        assert!(
            covered.end <= self.slots.len(),
            "descriptor range {:?} outside set of {} descriptors",
            covered,
            self.slots.len()
        );
        let node = self.history.len();
        self.history.push(update);
        for slot in &mut self.slots[covered] {
            *slot = Some(node);
        }
    }

    /// Drop every shadowed update and null every slot.
    pub fn clear(&mut self) {
        self.history.clear();
        self.slots.fill(None);
    }
}

#[derive(Debug, Default)]
pub struct DescriptorPoolRecord {
    pub flags: vk::DescriptorPoolCreateFlags,
    pub max_sets: u32,
    pub pool_sizes: Vec<vk::DescriptorPoolSize>,
    pub sets: HandleMap<DescriptorSetRecord>,
}

impl DescriptorPoolRecord {
    /// # Safety
    /// `ci.p_pool_sizes` must be valid for `ci.pool_size_count` when non-null.
    pub unsafe fn shadow(ci: &vk::DescriptorPoolCreateInfo<'_>) -> Self {
        Self {
            flags: ci.flags,
            max_sets: ci.max_sets,
            pool_sizes: unsafe { raw::slice(ci.p_pool_sizes, ci.pool_size_count) }.to_vec(),
            sets: HandleMap::new(),
        }
    }
}

/// The update target shared by writes and copies.
struct UpdateTarget {
    set: u64,
    binding: u32,
    array_element: u32,
    count: u32,
}

// ── Registry ────────────────────────────────────────────────────────

/// Layouts plus pools, with pools owning their sets.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    pub layouts: HandleMap<DescriptorSetLayoutRecord>,
    pub pools: HandleMap<DescriptorPoolRecord>,
    set_pool: HashMap<u64, u64>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, set: u64) -> Option<&DescriptorSetRecord> {
        let pool = self.set_pool.get(&set)?;
        self.pools.get(*pool)?.sets.get(set)
    }

    pub fn set_mut(&mut self, set: u64) -> Option<&mut DescriptorSetRecord> {
        let pool = self.set_pool.get(&set)?;
        self.pools.get_mut(*pool)?.sets.get_mut(set)
    }

    pub fn set_count(&self) -> usize {
        self.set_pool.len()
    }

    pub fn create_layout(&mut self, layout: u64, record: DescriptorSetLayoutRecord) {
        tracing::debug!(
            layout = format_args!("{:#x}", layout),
            bindings = record.bindings.len(),
            descriptors = record.descriptor_count(),
            "shadowed descriptor set layout"
        );
        self.layouts.insert(layout, record);
    }

    /// Sets that still reference the layout keep their handle; updates to
    /// them will report the layout as missing.
    pub fn destroy_layout(&mut self, layout: u64) -> bool {
        self.layouts.remove(layout).is_some()
    }

    pub fn create_pool(&mut self, pool: u64, record: DescriptorPoolRecord) {
        self.pools.insert(pool, record);
    }

    /// Destroy a pool and every set allocated from it. Returns the set count released.
    pub fn destroy_pool(&mut self, pool: u64) -> usize {
        match self.pools.remove(pool) {
            Some(mut record) => self.release_sets(&mut record),
            None => 0,
        }
    }

    fn release_sets(&mut self, record: &mut DescriptorPoolRecord) -> usize {
        for set in record.sets.handles() {
            self.set_pool.remove(&set);
        }
        record.sets.clear()
    }

    /// Release every set allocated from `pool`.
    pub fn reset_pool(&mut self, pool: u64, findings: &mut Findings) -> bool {
        let Some(mut record) = self.pools.remove(pool) else {
            findings.error(
                ObjectKind::DescriptorPool,
                pool,
                ErrorCode::InvalidPool,
                format!("Unable to find pool {:#x} specified in vkResetDescriptorPool()", pool),
            );
            return false;
        };
        let released = self.release_sets(&mut record);
        self.pools.insert(pool, record);
        tracing::debug!(pool = format_args!("{:#x}", pool), released, "descriptor pool reset");
        true
    }

    /// Shadow freshly allocated sets. `layouts[i]` is the layout of `sets[i]`.
    pub fn allocate_sets(
        &mut self,
        pool: u64,
        layouts: &[u64],
        sets: &[u64],
        findings: &mut Findings,
    ) {
        let Some(pool_record) = self.pools.get_mut(pool) else {
            findings.error(
                ObjectKind::DescriptorPool,
                pool,
                ErrorCode::InvalidPool,
                format!("Unable to find pool {:#x} specified in vkAllocateDescriptorSets()", pool),
            );
            return;
        };
        if sets.is_empty() {
            findings.info(
                ObjectKind::DescriptorPool,
                pool,
                ErrorCode::None,
                "vkAllocateDescriptorSets() called with no sets to allocate",
            );
            return;
        }
        for (&set, &layout) in sets.iter().zip(layouts) {
            let Some(layout_record) = self.layouts.get(layout) else {
                findings.error(
                    ObjectKind::DescriptorSetLayout,
                    layout,
                    ErrorCode::InvalidLayout,
                    format!(
                        "Unable to find set layout {:#x} specified in vkAllocateDescriptorSets()",
                        layout
                    ),
                );
                continue;
            };
            let Some(record) = DescriptorSetRecord::new(pool, layout, layout_record.descriptor_count())
            else {
                findings.error(
                    ObjectKind::DescriptorSet,
                    set,
                    ErrorCode::OutOfMemory,
                    "Out of memory while allocating descriptor set shadow in vkAllocateDescriptorSets()",
                );
                continue;
            };
            findings.info(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::None,
                format!("Created descriptor set {:#x} from pool {:#x}", set, pool),
            );
            pool_record.sets.insert(set, record);
            self.set_pool.insert(set, pool);
        }
    }

    pub fn free_sets(&mut self, pool: u64, sets: &[u64], findings: &mut Findings) {
        let Some(pool_record) = self.pools.get_mut(pool) else {
            findings.error(
                ObjectKind::DescriptorPool,
                pool,
                ErrorCode::InvalidPool,
                format!("Unable to find pool {:#x} specified in vkFreeDescriptorSets()", pool),
            );
            return;
        };
        for &set in sets {
            if pool_record.sets.remove(set).is_some() {
                self.set_pool.remove(&set);
            } else if set != 0 {
                findings.error(
                    ObjectKind::DescriptorSet,
                    set,
                    ErrorCode::InvalidSet,
                    format!("Descriptor set {:#x} was not allocated from pool {:#x}", set, pool),
                );
            }
        }
    }

    /// Clear a set's shadow history without further validation.
    pub fn clear_set(&mut self, set: u64) -> bool {
        match self.set_mut(set) {
            Some(record) => {
                record.clear();
                true
            }
            None => false,
        }
    }

    /// Resolve an update target to the linear range it covers, reporting
    /// the first problem found.
    fn locate(&self, target: &UpdateTarget, findings: &mut Findings) -> Option<Range<usize>> {
        let set = target.set;
        let Some(set_record) = self.set(set) else {
            findings.error(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::InvalidSet,
                format!("Unable to find descriptor set {:#x} named in a descriptor update", set),
            );
            return None;
        };
        let Some(layout) = self.layouts.get(set_record.layout) else {
            findings.error(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::InvalidLayout,
                format!(
                    "Layout {:#x} of descriptor set {:#x} no longer exists",
                    set_record.layout, set
                ),
            );
            return None;
        };
        let Some(binding) = layout.binding_range(target.binding) else {
            findings.error(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::InvalidUpdateIndex,
                format!(
                    "Update binding {} exceeds the {} bindings of descriptor set {:#x}",
                    target.binding,
                    layout.bindings.len(),
                    set
                ),
            );
            return None;
        };
        let start = binding.start + target.array_element as usize;
        let end = start + target.count as usize;
        if end > binding.end || start > binding.end {
            findings.error(
                ObjectKind::DescriptorSet,
                set,
                ErrorCode::DescriptorUpdateOutOfBounds,
                format!(
                    "Descriptor update of elements {}..{} is out of bounds for binding {} of {} descriptors",
                    target.array_element,
                    target.array_element as u64 + target.count as u64,
                    target.binding,
                    binding.len()
                ),
            );
            return None;
        }
        Some(start..end)
    }

    /// Validate and shadow a batch of updates, writes first. Stops at the
    /// first failing update; earlier updates in the batch stay applied.
    /// Returns whether the whole batch passed.
    ///
    /// # Safety
    /// Every write's descriptor info pointer must be valid for its
    /// `descriptor_count` when non-null.
    pub unsafe fn update_sets(
        &mut self,
        writes: &[vk::WriteDescriptorSet<'_>],
        copies: &[vk::CopyDescriptorSet<'_>],
        findings: &mut Findings,
    ) -> bool {
        for write in writes {
            if write.s_type != vk::StructureType::WRITE_DESCRIPTOR_SET {
                invalid_struct(write.s_type, write.dst_set.as_raw(), findings);
                return false;
            }
            let target = UpdateTarget {
                set: write.dst_set.as_raw(),
                binding: write.dst_binding,
                array_element: write.dst_array_element,
                count: write.descriptor_count,
            };
            let Some(covered) = self.locate(&target, findings) else {
                return false;
            };
            if !self.types_match(&target, covered.clone(), write.descriptor_type, findings) {
                return false;
            }
            let Some(payload) = (unsafe { copy_payload(write) }) else {
                out_of_memory(target.set, findings);
                return false;
            };
            let update = ShadowUpdate::Write {
                binding: target.binding,
                array_element: target.array_element,
                descriptor_count: target.count,
                descriptor_type: write.descriptor_type,
                payload,
            };
            if let Some(set) = self.set_mut(target.set) {
                set.apply(update, covered);
            }
        }

        for copy in copies {
            if copy.s_type != vk::StructureType::COPY_DESCRIPTOR_SET {
                invalid_struct(copy.s_type, copy.dst_set.as_raw(), findings);
                return false;
            }
            let src_set = copy.src_set.as_raw();
            if self.set(src_set).is_none() {
                findings.error(
                    ObjectKind::DescriptorSet,
                    src_set,
                    ErrorCode::InvalidSet,
                    format!("Unable to find source descriptor set {:#x} of a descriptor copy", src_set),
                );
                return false;
            }
            let target = UpdateTarget {
                set: copy.dst_set.as_raw(),
                binding: copy.dst_binding,
                array_element: copy.dst_array_element,
                count: copy.descriptor_count,
            };
            let Some(covered) = self.locate(&target, findings) else {
                return false;
            };
            let update = ShadowUpdate::Copy {
                src_set,
                src_binding: copy.src_binding,
                src_array_element: copy.src_array_element,
                binding: target.binding,
                array_element: target.array_element,
                descriptor_count: target.count,
            };
            if let Some(set) = self.set_mut(target.set) {
                set.apply(update, covered);
            }
        }
        true
    }

    fn types_match(
        &self,
        target: &UpdateTarget,
        covered: Range<usize>,
        declared: vk::DescriptorType,
        findings: &mut Findings,
    ) -> bool {
        let layout = self
            .set(target.set)
            .and_then(|s| self.layouts.get(s.layout));
        let Some(layout) = layout else {
            return false;
        };
        if let Some(index) = covered.clone().find(|&i| layout.types[i] != declared) {
            findings.error(
                ObjectKind::DescriptorSet,
                target.set,
                ErrorCode::DescriptorTypeMismatch,
                format!(
                    "Descriptor write of type {:?} does not match type {:?} of descriptor {} in binding {}",
                    declared, layout.types[index], index, target.binding
                ),
            );
            return false;
        }
        true
    }

    /// Drop everything, sets with their pools first. Returns (pools, sets, layouts) released.
    pub fn teardown(&mut self) -> (usize, usize, usize) {
        let sets = self.set_pool.len();
        self.set_pool.clear();
        let pools = self.pools.clear();
        let layouts = self.layouts.clear();
        (pools, sets, layouts)
    }
}

fn invalid_struct(s_type: vk::StructureType, set: u64, findings: &mut Findings) {
    findings.error(
        ObjectKind::DescriptorSet,
        set,
        ErrorCode::InvalidUpdateStruct,
        format!("Unexpected structure type {:?} in a descriptor update", s_type),
    );
}

fn out_of_memory(set: u64, findings: &mut Findings) {
    findings.error(
        ObjectKind::DescriptorSet,
        set,
        ErrorCode::OutOfMemory,
        "Out of memory while shadowing a descriptor update",
    );
}
