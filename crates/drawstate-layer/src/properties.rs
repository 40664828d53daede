//! Layer and extension properties reported to the loader.

use std::ffi::{c_char, CStr};

use ash::vk;

pub const LAYER_NAME: &str = "DrawState";
pub const LAYER_DESCRIPTION: &str = "Validation layer: DrawState";
pub const IMPLEMENTATION_VERSION: u32 = vk::make_api_version(0, 0, 1, 0);
pub const SPEC_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);

pub const DEBUG_MARKER_EXTENSION_NAME: &CStr = c"VK_EXT_debug_marker";
pub const DEBUG_MARKER_SPEC_VERSION: u32 = 4;

/// Copy `src` into a fixed-size C string array, truncating and always
/// leaving a terminating NUL.
fn fill_c_str(dst: &mut [c_char], src: &[u8]) {
    let len = src.len().min(dst.len().saturating_sub(1));
    for (d, &s) in dst.iter_mut().zip(&src[..len]) {
        *d = s as c_char;
    }
    if let Some(end) = dst.get_mut(len) {
        *end = 0;
    }
}

pub fn layer_properties() -> vk::LayerProperties {
    let mut props = vk::LayerProperties {
        spec_version: SPEC_VERSION,
        implementation_version: IMPLEMENTATION_VERSION,
        ..Default::default()
    };
    fill_c_str(&mut props.layer_name, LAYER_NAME.as_bytes());
    fill_c_str(&mut props.description, LAYER_DESCRIPTION.as_bytes());
    props
}

/// Device extensions the layer implements.
pub fn device_extension_properties() -> Vec<vk::ExtensionProperties> {
    let mut ext = vk::ExtensionProperties {
        spec_version: DEBUG_MARKER_SPEC_VERSION,
        ..Default::default()
    };
    fill_c_str(&mut ext.extension_name, DEBUG_MARKER_EXTENSION_NAME.to_bytes());
    vec![ext]
}

/// Whether the debug-marker extension is among `enabled`.
pub fn debug_marker_requested<'a>(enabled: impl IntoIterator<Item = &'a CStr>) -> bool {
    enabled
        .into_iter()
        .any(|name| name == DEBUG_MARKER_EXTENSION_NAME)
}
