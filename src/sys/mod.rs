//! Raw C surface of libnotify and the GLib helpers it hands ownership through.
//!
//! Nothing in here is exposed past the crate boundary. Every entry point is
//! resolved once into a [`NativeApi`] table, either from the shared library
//! loaded at runtime or from the in-process mock used by the tests.

#![allow(unsafe_code, non_camel_case_types)]

use std::ffi::{OsStr, c_char, c_double, c_int, c_uchar, c_uint, c_void};
use std::marker::{PhantomData, PhantomPinned};
use std::mem::ManuallyDrop;
use std::path::PathBuf;

use libloading::Library;
use tracing::debug;

use crate::error::Error;

#[cfg(test)]
pub(crate) mod mock;

pub type gboolean = c_int;
pub type gint = c_int;
pub type guint32 = c_uint;
pub type gchar = c_char;
pub type guchar = c_uchar;
pub type gdouble = c_double;
pub type gsize = usize;
pub type gpointer = *mut c_void;
pub type GQuark = guint32;

pub const GFALSE: gboolean = 0;

#[repr(C)]
pub struct GError {
    pub domain: GQuark,
    pub code: gint,
    pub message: *mut gchar,
}

#[repr(C)]
pub struct GList {
    pub data: gpointer,
    pub next: *mut GList,
    pub prev: *mut GList,
}

/// Opaque `NotifyNotification` GObject.
#[repr(C)]
pub struct NotifyNotification {
    _private: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

pub type GDestroyNotify = unsafe extern "C" fn(gpointer);
pub type GFreeFunc = unsafe extern "C" fn(gpointer);
pub type NotifyActionCallback =
    unsafe extern "C" fn(*mut NotifyNotification, *mut gchar, gpointer);

/// Function table for every native entry point the binding calls.
///
/// Field names match the C symbols so call sites read like the C API.
#[derive(Clone, Copy)]
pub(crate) struct NativeApi {
    pub notify_init: unsafe extern "C" fn(*const gchar) -> gboolean,
    pub notify_uninit: unsafe extern "C" fn(),
    pub notify_is_initted: unsafe extern "C" fn() -> gboolean,
    pub notify_get_app_name: unsafe extern "C" fn() -> *const gchar,
    pub notify_set_app_name: unsafe extern "C" fn(*const gchar),
    pub notify_get_server_caps: unsafe extern "C" fn() -> *mut GList,
    pub notify_get_server_info: unsafe extern "C" fn(
        *mut *mut gchar,
        *mut *mut gchar,
        *mut *mut gchar,
        *mut *mut gchar,
    ) -> gboolean,

    pub notify_notification_new:
        unsafe extern "C" fn(*const gchar, *const gchar, *const gchar) -> *mut NotifyNotification,
    pub notify_notification_update: unsafe extern "C" fn(
        *mut NotifyNotification,
        *const gchar,
        *const gchar,
        *const gchar,
    ) -> gboolean,
    pub notify_notification_show:
        unsafe extern "C" fn(*mut NotifyNotification, *mut *mut GError) -> gboolean,
    pub notify_notification_close:
        unsafe extern "C" fn(*mut NotifyNotification, *mut *mut GError) -> gboolean,
    pub notify_notification_set_timeout: unsafe extern "C" fn(*mut NotifyNotification, gint),
    pub notify_notification_set_category:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar),
    pub notify_notification_set_urgency: unsafe extern "C" fn(*mut NotifyNotification, c_int),
    pub notify_notification_set_app_name:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar),
    pub notify_notification_get_closed_reason: unsafe extern "C" fn(*const NotifyNotification) -> gint,

    pub notify_notification_set_hint_int32:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar, gint),
    pub notify_notification_set_hint_double:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar, gdouble),
    pub notify_notification_set_hint_string:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar, *const gchar),
    pub notify_notification_set_hint_byte:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar, guchar),
    pub notify_notification_set_hint_byte_array:
        unsafe extern "C" fn(*mut NotifyNotification, *const gchar, *const guchar, gsize),
    pub notify_notification_clear_hints: unsafe extern "C" fn(*mut NotifyNotification),

    pub notify_notification_add_action: unsafe extern "C" fn(
        *mut NotifyNotification,
        *const gchar,
        *const gchar,
        NotifyActionCallback,
        gpointer,
        Option<GFreeFunc>,
    ),
    pub notify_notification_clear_actions: unsafe extern "C" fn(*mut NotifyNotification),

    pub g_object_unref: unsafe extern "C" fn(gpointer),
    pub g_error_free: unsafe extern "C" fn(*mut GError),
    pub g_free: unsafe extern "C" fn(gpointer),
    pub g_list_free_full: unsafe extern "C" fn(*mut GList, GDestroyNotify),
    pub g_quark_to_string: unsafe extern "C" fn(GQuark) -> *const gchar,
    pub g_main_context_iteration: unsafe extern "C" fn(gpointer, gboolean) -> gboolean,
}

/// A resolved [`NativeApi`] together with the library that backs it.
///
/// The library is never closed: libnotify registers GObject types with GLib,
/// and those must keep pointing at loaded code for the life of the process.
pub(crate) struct Native {
    api: NativeApi,
    _library: Option<ManuallyDrop<Library>>,
}

impl Native {
    pub(crate) fn load(path: &OsStr) -> Result<Self, Error> {
        // SAFETY: loading libnotify runs its (and GLib's) initialisers, which
        // have no preconditions on the host process.
        let library = unsafe { Library::new(path) }.map_err(|source| Error::Load {
            library: PathBuf::from(path),
            source,
        })?;
        let api = NativeApi::resolve(&library)?;
        debug!(library = ?path, "native notification library loaded");
        Ok(Self {
            api,
            _library: Some(ManuallyDrop::new(library)),
        })
    }

    #[cfg(test)]
    pub(crate) const fn from_api(api: NativeApi) -> Self {
        Self {
            api,
            _library: None,
        }
    }

    pub(crate) const fn api(&self) -> &NativeApi {
        &self.api
    }
}

/// Looks up `name` and copies the function pointer out of the symbol.
///
/// # Safety
///
/// `T` must be the exact function pointer type of the C symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, Error> {
    // SAFETY: forwarded to the caller.
    let symbol = unsafe { library.get::<T>(name.as_bytes()) }.map_err(|source| Error::Symbol {
        name: name.trim_end_matches('\0'),
        source,
    })?;
    Ok(*symbol)
}

macro_rules! resolve_table {
    ($library:expr; $($name:ident),+ $(,)?) => {
        NativeApi {
            $(
                // SAFETY: the field type is the prototype from <libnotify/notify.h>
                // or the matching GLib header.
                $name: unsafe { symbol($library, concat!(stringify!($name), "\0"))? },
            )+
        }
    };
}

impl NativeApi {
    fn resolve(library: &Library) -> Result<Self, Error> {
        Ok(resolve_table!(library;
            notify_init,
            notify_uninit,
            notify_is_initted,
            notify_get_app_name,
            notify_set_app_name,
            notify_get_server_caps,
            notify_get_server_info,
            notify_notification_new,
            notify_notification_update,
            notify_notification_show,
            notify_notification_close,
            notify_notification_set_timeout,
            notify_notification_set_category,
            notify_notification_set_urgency,
            notify_notification_set_app_name,
            notify_notification_get_closed_reason,
            notify_notification_set_hint_int32,
            notify_notification_set_hint_double,
            notify_notification_set_hint_string,
            notify_notification_set_hint_byte,
            notify_notification_set_hint_byte_array,
            notify_notification_clear_hints,
            notify_notification_add_action,
            notify_notification_clear_actions,
            g_object_unref,
            g_error_free,
            g_free,
            g_list_free_full,
            g_quark_to_string,
            g_main_context_iteration,
        ))
    }
}
