#![allow(unsafe_code)]

use std::ffi::OsStr;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::error::Error;
use crate::marshal::{c_string, c_string_opt, copy_c_str, opt_ptr, take_g_string, take_string_list};
use crate::notification::Notification;
use crate::sys::{GFALSE, Native, NativeApi};
use crate::types::ServerInfo;

/// Entry point to the native notification library.
///
/// The initialised flag and application name live in the native library and
/// are always read back from it; nothing is cached here. Every notification
/// operation is only valid between [`Self::init`] and [`Self::uninit`]; the
/// native library defines what happens outside that window.
#[derive(Clone)]
pub struct Notifier {
    native: Arc<Native>,
}

impl Notifier {
    pub const DEFAULT_LIBRARY: &'static str = "libnotify.so.4";

    /// Loads [`Self::DEFAULT_LIBRARY`] through the dynamic linker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] or [`Error::Symbol`] when the library or one
    /// of its entry points cannot be found.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::DEFAULT_LIBRARY)
    }

    /// Loads the native library from an explicit path or soname.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from(library: impl AsRef<OsStr>) -> Result<Self> {
        Native::load(library.as_ref()).map(|native| Self {
            native: Arc::new(native),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_native(native: Native) -> Self {
        Self {
            native: Arc::new(native),
        }
    }

    fn api(&self) -> &NativeApi {
        self.native.api()
    }

    /// Initialises the native library; returns the native verdict.
    ///
    /// # Errors
    ///
    /// Fails without calling into the library if `app_name` contains a NUL
    /// byte. A native refusal is `Ok(false)`, not an error.
    pub fn init(&self, app_name: &str) -> Result<bool> {
        let c_app_name = c_string("app_name", app_name)?;
        // SAFETY: the string outlives the call; libnotify copies it.
        let ok = unsafe { (self.api().notify_init)(c_app_name.as_ptr()) } != GFALSE;
        info!(app_name, initialized = ok, "notification library init");
        Ok(ok)
    }

    pub fn uninit(&self) {
        // SAFETY: no preconditions; idempotence is the native library's.
        unsafe { (self.api().notify_uninit)() };
        debug!("notification library uninit");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        // SAFETY: no preconditions.
        unsafe { (self.api().notify_is_initted)() != GFALSE }
    }

    /// Nom d'application connu de la bibliothèque native, vide si absent.
    #[must_use]
    pub fn app_name(&self) -> String {
        // SAFETY: returns null or a string owned by the library, copied at once.
        unsafe { copy_c_str((self.api().notify_get_app_name)()) }.unwrap_or_default()
    }

    /// # Errors
    ///
    /// Fails if `app_name` contains a NUL byte.
    pub fn set_app_name(&self, app_name: &str) -> Result<()> {
        let c_app_name = c_string("app_name", app_name)?;
        // SAFETY: the string outlives the call; libnotify copies it.
        unsafe { (self.api().notify_set_app_name)(c_app_name.as_ptr()) };
        Ok(())
    }

    /// Capacités annoncées par le serveur, dans l'ordre du serveur (vide si
    /// le serveur est injoignable).
    #[must_use]
    pub fn server_caps(&self) -> Vec<String> {
        let api = self.api();
        // SAFETY: ownership of the returned list and its strings is ours.
        unsafe { take_string_list(api, (api.notify_get_server_caps)()) }
    }

    /// Name, vendor, version and spec version of the notification server, or
    /// `None` when the server could not be queried.
    #[must_use]
    pub fn server_info(&self) -> Option<ServerInfo> {
        let api = self.api();
        let mut name = ptr::null_mut();
        let mut vendor = ptr::null_mut();
        let mut version = ptr::null_mut();
        let mut spec_version = ptr::null_mut();
        // SAFETY: four valid out-pointers; any string written is ours to free.
        let ok = unsafe {
            (api.notify_get_server_info)(
                &raw mut name,
                &raw mut vendor,
                &raw mut version,
                &raw mut spec_version,
            )
        };
        // Libérées même en cas d'échec : la lib a pu en remplir une partie.
        // SAFETY: each pointer is null or a `g_malloc`ed string we own.
        let info = unsafe {
            ServerInfo {
                name: take_g_string(api, name).unwrap_or_default(),
                vendor: take_g_string(api, vendor).unwrap_or_default(),
                version: take_g_string(api, version).unwrap_or_default(),
                spec_version: take_g_string(api, spec_version).unwrap_or_default(),
            }
        };
        (ok != GFALSE).then_some(info)
    }

    /// Crée une notification ; `body` et `icon` sont optionnels.
    ///
    /// # Errors
    ///
    /// [`Error::InteriorNul`] for invalid input, [`Error::Construction`] if
    /// the native library returns no object.
    pub fn new_notification(
        &self,
        summary: &str,
        body: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Notification> {
        let c_summary = c_string("summary", summary)?;
        let c_body = c_string_opt("body", body)?;
        let c_icon = c_string_opt("icon", icon)?;
        // SAFETY: the strings outlive the call; libnotify copies them.
        let raw = unsafe {
            (self.api().notify_notification_new)(
                c_summary.as_ptr(),
                opt_ptr(c_body.as_ref()),
                opt_ptr(c_icon.as_ref()),
            )
        };
        let raw = NonNull::new(raw).ok_or(Error::Construction)?;
        debug!(summary, "notification created");
        Ok(Notification::from_owned(raw, Arc::clone(&self.native)))
    }

    /// Runs one non-blocking iteration of the default GLib main context so
    /// pending action and close signals reach their handlers. Returns whether
    /// any event was dispatched.
    #[must_use = "the return value tells whether more events may be pending"]
    pub fn dispatch_pending(&self) -> bool {
        // SAFETY: null selects the default context; may-block is false.
        unsafe { (self.api().g_main_context_iteration)(ptr::null_mut(), GFALSE) != GFALSE }
    }
}
