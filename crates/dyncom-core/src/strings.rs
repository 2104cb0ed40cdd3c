//! Native string conventions
//!
//! Text going in is passed as a NUL-terminated UTF-16 buffer owned by the call.
//! Text coming out arrives as a callee-allocated BSTR that the caller must free
//! exactly once after copying it.
//!
//! BSTR layout (also used by [`HeapStrings`]):
//! ```text
//! [u32 byte length][UTF-16 code units ...][u16 NUL]
//!                  ^ pointer handed around
//! ```

use std::alloc::{alloc, dealloc, Layout};
use std::ptr;
use std::sync::Arc;

/// Releases callee-allocated strings
pub trait NativeStrings: Send + Sync {
    /// # Safety
    /// `s` must be null or a string allocated by the matching allocator, not yet freed.
    unsafe fn free(&self, s: *mut u16);
}

/// Encode as NUL-terminated UTF-16
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Copy a NUL-terminated UTF-16 string. Null reads as empty text.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated UTF-16 buffer.
pub unsafe fn from_wide_ptr(p: *const u16) -> String {
    if p.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *p.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
}

/// Portable BSTR-compatible allocator
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapStrings;

const PREFIX: usize = std::mem::size_of::<u32>();

fn heap_layout(units: usize) -> Option<Layout> {
    // prefix + characters + NUL
    let size = units.checked_add(1)?.checked_mul(2)?.checked_add(PREFIX)?;
    Layout::from_size_align(size, PREFIX).ok()
}

/// Allocate a BSTR-layout copy of `text`; release with [`HeapStrings`].
/// Returns null when the length does not fit the prefix.
pub fn heap_alloc_string(text: &str) -> *mut u16 {
    let units: Vec<u16> = text.encode_utf16().collect();
    let layout = match heap_layout(units.len()) {
        Some(layout) if units.len() * 2 <= u32::MAX as usize => layout,
        _ => return ptr::null_mut(),
    };
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        (base as *mut u32).write((units.len() * 2) as u32);
        let chars = base.add(PREFIX) as *mut u16;
        ptr::copy_nonoverlapping(units.as_ptr(), chars, units.len());
        chars.add(units.len()).write(0);
        chars
    }
}

/// Character count from the length prefix (`SysStringLen`)
///
/// # Safety
/// `s` must be null or a live BSTR-layout string.
pub unsafe fn string_len(s: *const u16) -> usize {
    if s.is_null() {
        return 0;
    }
    let prefix = (s as *const u8).sub(PREFIX) as *const u32;
    (prefix.read() / 2) as usize
}

impl NativeStrings for HeapStrings {
    unsafe fn free(&self, s: *mut u16) {
        if s.is_null() {
            return;
        }
        let base = (s as *mut u8).sub(PREFIX);
        if let Some(layout) = heap_layout(string_len(s)) {
            dealloc(base, layout);
        }
    }
}

/// OLE automation strings (`SysFreeString`)
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SysStrings;

#[cfg(windows)]
impl NativeStrings for SysStrings {
    unsafe fn free(&self, s: *mut u16) {
        if s.is_null() {
            return;
        }
        // Dropping the BSTR calls SysFreeString
        drop(windows::core::BSTR::from_raw(s));
    }
}

/// Allocator matching what COM servers hand back on this platform
pub fn system_strings() -> Arc<dyn NativeStrings> {
    #[cfg(windows)]
    {
        Arc::new(SysStrings)
    }
    #[cfg(not(windows))]
    {
        Arc::new(HeapStrings)
    }
}
