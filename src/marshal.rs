//! Conversions across the native boundary.
//!
//! Outgoing strings become [`CString`]s owned by the caller's stack frame, so
//! they are released on every exit path. Incoming strings, errors and lists
//! are copied into host memory and handed back to GLib inside the same call.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char};
use std::ptr;

use crate::Result;
use crate::error::{Error, NativeError};
use crate::sys::{GError, GList, NativeApi};

pub(crate) fn c_string(field: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|err| Error::InteriorNul {
        field,
        position: err.nul_position(),
    })
}

pub(crate) fn c_string_opt(field: &'static str, value: Option<&str>) -> Result<Option<CString>> {
    value.map(|v| c_string(field, v)).transpose()
}

pub(crate) fn opt_ptr(value: Option<&CString>) -> *const c_char {
    value.map_or(ptr::null(), |v| v.as_ptr())
}

/// Copies a borrowed C string; `None` for a null pointer.
///
/// # Safety
///
/// `ptr` is null or points to a NUL-terminated buffer valid for the call.
pub(crate) unsafe fn copy_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    Some(raw.to_string_lossy().into_owned())
}

/// Copies a string the caller owns and releases it with `g_free`.
///
/// # Safety
///
/// `ptr` is null or a `g_malloc`ed, NUL-terminated string owned by the caller.
pub(crate) unsafe fn take_g_string(api: &NativeApi, ptr: *mut c_char) -> Option<String> {
    // SAFETY: forwarded to the caller.
    let copied = unsafe { copy_c_str(ptr) };
    if !ptr.is_null() {
        // SAFETY: ownership was transferred to us and nothing borrows it anymore.
        unsafe { (api.g_free)(ptr.cast()) };
    }
    copied
}

/// Converts the `GError` out-parameter into a host error, freeing it.
///
/// A null pointer means success and yields `None`; no error value exists on
/// that path.
///
/// # Safety
///
/// `err` is null or a `GError` the caller owns.
pub(crate) unsafe fn take_error(api: &NativeApi, err: *mut GError) -> Option<NativeError> {
    if err.is_null() {
        return None;
    }
    // SAFETY: non-null `GError` owned by us until `g_error_free` below.
    let native = unsafe {
        let raw = &*err;
        NativeError {
            domain: raw.domain,
            domain_name: copy_c_str((api.g_quark_to_string)(raw.domain)),
            code: raw.code,
            message: copy_c_str(raw.message).unwrap_or_default(),
        }
    };
    // SAFETY: copied above; released exactly once here.
    unsafe { (api.g_error_free)(err) };
    Some(native)
}

/// Walks a `GList` of strings once, copying each element in order, then
/// releases the list and its elements.
///
/// # Safety
///
/// `list` is null or a list owned by the caller whose `data` fields are
/// null or `g_malloc`ed C strings.
pub(crate) unsafe fn take_string_list(api: &NativeApi, list: *mut GList) -> Vec<String> {
    let mut items = Vec::new();
    let mut node = list;
    while !node.is_null() {
        // SAFETY: every node reachable from a valid list head is valid.
        let (data, next) = unsafe { ((*node).data, (*node).next) };
        // SAFETY: element strings are NUL-terminated per the contract.
        if let Some(item) = unsafe { copy_c_str(data.cast_const().cast()) } {
            items.push(item);
        }
        node = next;
    }
    if !list.is_null() {
        // SAFETY: every element was copied; nothing refers to the list anymore.
        unsafe { (api.g_list_free_full)(list, api.g_free) };
    }
    items
}
