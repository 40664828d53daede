//! Shadow records for samplers, image views and buffer views.
//!
//! Nothing validates against these yet beyond existence; they are kept so
//! that teardown and introspection see every object the application created.

use ash::vk::{self, Handle};

#[derive(Debug, Clone)]
pub struct SamplerRecord {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: [vk::SamplerAddressMode; 3],
    pub anisotropy_enable: bool,
    pub compare_enable: bool,
}

impl SamplerRecord {
    pub fn shadow(info: &vk::SamplerCreateInfo<'_>) -> Self {
        Self {
            mag_filter: info.mag_filter,
            min_filter: info.min_filter,
            mipmap_mode: info.mipmap_mode,
            address_mode: [info.address_mode_u, info.address_mode_v, info.address_mode_w],
            anisotropy_enable: info.anisotropy_enable != vk::FALSE,
            compare_enable: info.compare_enable != vk::FALSE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageViewRecord {
    pub image: u64,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub subresource_range: vk::ImageSubresourceRange,
}

impl ImageViewRecord {
    pub fn shadow(info: &vk::ImageViewCreateInfo<'_>) -> Self {
        Self {
            image: info.image.as_raw(),
            view_type: info.view_type,
            format: info.format,
            subresource_range: info.subresource_range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferViewRecord {
    pub buffer: u64,
    pub format: vk::Format,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

impl BufferViewRecord {
    pub fn shadow(info: &vk::BufferViewCreateInfo<'_>) -> Self {
        Self {
            buffer: info.buffer.as_raw(),
            format: info.format,
            offset: info.offset,
            range: info.range,
        }
    }
}
