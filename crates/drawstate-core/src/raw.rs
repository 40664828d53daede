//! Helpers for copying out of application-owned create-info arrays.

use std::ffi::{c_char, CStr};

/// Borrow `count` elements starting at `ptr`, treating null as empty.
///
/// # Safety
/// When `ptr` is non-null it must point to `count` initialized `T`s that stay
/// valid for `'a`.
pub unsafe fn slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        // SAFETY: caller guarantees `count` valid elements at `ptr`.
        unsafe { std::slice::from_raw_parts(ptr, count as usize) }
    }
}

/// Copy a nul-terminated string, substituting `default` for null or non-UTF-8.
///
/// # Safety
/// When `ptr` is non-null it must point to a nul-terminated string.
pub unsafe fn string(ptr: *const c_char, default: &str) -> String {
    if ptr.is_null() {
        return default.to_string();
    }
    // SAFETY: caller guarantees a nul-terminated string.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .unwrap_or(default)
        .to_string()
}
