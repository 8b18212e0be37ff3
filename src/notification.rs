#![allow(unsafe_code)]

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::Result;
use crate::action::{self, RegistrationId};
use crate::error::Error;
use crate::hint::HintValue;
use crate::marshal::{c_string, c_string_opt, opt_ptr, take_error};
use crate::sys::{GError, GFALSE, Native, NativeApi, NotifyNotification};
use crate::types::{ClosedReason, Timeout, Urgency};

/// A native `NotifyNotification`.
///
/// The handle holds a reference on the native object and releases it exactly
/// once on drop. Handles are created by [`crate::Notifier::new_notification`]
/// and are only meaningful while the notifier is initialised.
///
/// Handles are not `Send`: the native object must stay with a single owner.
pub struct Notification {
    raw: NonNull<NotifyNotification>,
    native: Arc<Native>,
    owned: bool,
}

impl Notification {
    pub(crate) const fn from_owned(raw: NonNull<NotifyNotification>, native: Arc<Native>) -> Self {
        Self {
            raw,
            native,
            owned: true,
        }
    }

    /// View of a native object whose reference belongs to someone else.
    pub(crate) const fn borrowed(raw: NonNull<NotifyNotification>, native: Arc<Native>) -> Self {
        Self {
            raw,
            native,
            owned: false,
        }
    }

    fn api(&self) -> &NativeApi {
        self.native.api()
    }

    #[cfg(test)]
    pub(crate) const fn as_ptr(&self) -> *mut NotifyNotification {
        self.raw.as_ptr()
    }

    /// Remplace titre, corps et icône ; il faut rappeler [`Self::show`].
    ///
    /// # Errors
    ///
    /// Fails before any native call if an argument contains a NUL byte.
    pub fn update(&self, summary: &str, body: Option<&str>, icon: Option<&str>) -> Result<bool> {
        let summary = c_string("summary", summary)?;
        let body = c_string_opt("body", body)?;
        let icon = c_string_opt("icon", icon)?;
        // SAFETY: `raw` is live while `self` exists; the strings outlive the call.
        let accepted = unsafe {
            (self.api().notify_notification_update)(
                self.raw.as_ptr(),
                summary.as_ptr(),
                opt_ptr(body.as_ref()),
                opt_ptr(icon.as_ref()),
            )
        };
        Ok(accepted != GFALSE)
    }

    pub fn set_timeout(&self, timeout: Timeout) {
        // SAFETY: `raw` is live while `self` exists.
        unsafe { (self.api().notify_notification_set_timeout)(self.raw.as_ptr(), timeout.as_native()) };
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_category(&self, category: &str) -> Result<()> {
        let category = c_string("category", category)?;
        // SAFETY: `raw` is live; the string outlives the call.
        unsafe { (self.api().notify_notification_set_category)(self.raw.as_ptr(), category.as_ptr()) };
        Ok(())
    }

    pub fn set_urgency(&self, urgency: Urgency) {
        // SAFETY: `raw` is live while `self` exists.
        unsafe { (self.api().notify_notification_set_urgency)(self.raw.as_ptr(), urgency.as_native()) };
    }

    /// Surcharge le nom d'application pour cette notification seulement.
    #[allow(clippy::missing_errors_doc)]
    pub fn set_app_name(&self, app_name: &str) -> Result<()> {
        let app_name = c_string("app_name", app_name)?;
        // SAFETY: `raw` is live; the string outlives the call.
        unsafe { (self.api().notify_notification_set_app_name)(self.raw.as_ptr(), app_name.as_ptr()) };
        Ok(())
    }

    /// Envoie la notification au serveur.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Native`] with the server's error detail, or
    /// [`Error::Rejected`] if the native call failed without one.
    pub fn show(&self) -> Result<()> {
        let api = self.api();
        self.call_with_error("show", |raw, err| {
            // SAFETY: `raw` is live and `err` points to a null `GError*`.
            unsafe { (api.notify_notification_show)(raw, err) }
        })
    }

    /// Demande au serveur de retirer la notification.
    ///
    /// # Errors
    ///
    /// Same as [`Self::show`].
    pub fn close(&self) -> Result<()> {
        let api = self.api();
        self.call_with_error("close", |raw, err| {
            // SAFETY: `raw` is live and `err` points to a null `GError*`.
            unsafe { (api.notify_notification_close)(raw, err) }
        })
    }

    fn call_with_error(
        &self,
        operation: &'static str,
        call: impl FnOnce(*mut NotifyNotification, *mut *mut GError) -> i32,
    ) -> Result<()> {
        let mut err: *mut GError = ptr::null_mut();
        let ok = call(self.raw.as_ptr(), &raw mut err);
        // SAFETY: the native library either left `err` null or transferred a
        // `GError` to us.
        if let Some(native) = unsafe { take_error(self.api(), err) } {
            debug!(operation, code = native.code, domain = native.domain, "native operation failed");
            return Err(Error::Native(native));
        }
        if ok == GFALSE {
            return Err(Error::Rejected { operation });
        }
        Ok(())
    }

    /// Raison du signal de fermeture, si le serveur en a envoyé un.
    #[must_use]
    pub fn closed_reason(&self) -> ClosedReason {
        // SAFETY: `raw` is live while `self` exists.
        let code = unsafe { (self.api().notify_notification_get_closed_reason)(self.raw.as_ptr()) };
        ClosedReason::from(code)
    }

    /// Attaches a typed hint.
    ///
    /// [`HintValue::Unsupported`] has no native setter; it is logged and
    /// ignored without touching the native object.
    ///
    /// # Errors
    ///
    /// Fails before any native call if `key` or a string value contains a
    /// NUL byte.
    pub fn set_hint(&self, key: &str, value: &HintValue) -> Result<()> {
        if let HintValue::Unsupported(kind) = value {
            warn!(key, kind = kind.as_str(), "ignoring hint with unsupported value kind");
            return Ok(());
        }
        let c_key = c_string("hint key", key)?;
        let api = self.api();
        let raw = self.raw.as_ptr();
        // SAFETY: `raw` is live; every buffer below outlives its call.
        unsafe {
            match value {
                HintValue::Int32(v) => (api.notify_notification_set_hint_int32)(raw, c_key.as_ptr(), *v),
                HintValue::Double(v) => (api.notify_notification_set_hint_double)(raw, c_key.as_ptr(), *v),
                HintValue::String(v) => {
                    let c_value = c_string("hint value", v)?;
                    (api.notify_notification_set_hint_string)(raw, c_key.as_ptr(), c_value.as_ptr());
                }
                HintValue::Byte(v) => (api.notify_notification_set_hint_byte)(raw, c_key.as_ptr(), *v),
                HintValue::ByteArray(v) => (api.notify_notification_set_hint_byte_array)(
                    raw,
                    c_key.as_ptr(),
                    v.as_ptr(),
                    v.len(),
                ),
                HintValue::Unsupported(_) => {}
            }
        }
        debug!(key, kind = value.kind(), "hint set");
        Ok(())
    }

    pub fn clear_hints(&self) {
        // SAFETY: `raw` is live while `self` exists.
        unsafe { (self.api().notify_notification_clear_hints)(self.raw.as_ptr()) };
    }

    /// Ajoute un bouton d'action. Le callback ne tourne que si le contexte
    /// GLib est pompé ([`crate::Notifier::dispatch_pending`]) ; callback et
    /// `user_data` sont libérés quand la lib native relâche l'action.
    ///
    /// # Errors
    ///
    /// Fails before registering anything if `action` or `label` contains a
    /// NUL byte.
    pub fn add_action<T, F>(
        &self,
        action: &str,
        label: &str,
        mut callback: F,
        mut user_data: T,
    ) -> Result<RegistrationId>
    where
        T: Send + 'static,
        F: FnMut(&Self, &str, &mut T) + Send + 'static,
    {
        let c_action = c_string("action", action)?;
        let c_label = c_string("label", label)?;
        let (id, data) = action::register(
            Arc::clone(&self.native),
            Box::new(move |notification: &Self, invoked: &str| {
                callback(notification, invoked, &mut user_data);
            }),
        );
        // SAFETY: `raw` is live; the native library copies both strings and
        // owns `data` until it calls `release`.
        unsafe {
            (self.api().notify_notification_add_action)(
                self.raw.as_ptr(),
                c_action.as_ptr(),
                c_label.as_ptr(),
                action::trampoline,
                data,
                Some(action::release),
            );
        }
        debug!(action, label, "action added");
        Ok(id)
    }

    /// Retire toutes les actions (la lib native libère les callbacks).
    pub fn clear_actions(&self) {
        // SAFETY: `raw` is live while `self` exists.
        unsafe { (self.api().notify_notification_clear_actions)(self.raw.as_ptr()) };
    }
}

impl Drop for Notification {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: we hold exactly one reference, taken at construction.
            unsafe { (self.api().g_object_unref)(self.raw.as_ptr().cast()) };
        }
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("raw", &self.raw)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}
