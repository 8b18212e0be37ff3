//! Bridges native action callbacks back to host closures.
//!
//! The native library only carries a `gpointer` of user data. We never put a
//! host pointer there: each registration gets a numeric id, the id travels
//! through the native layer, and the trampoline looks the closure up in a
//! process-wide registry. The native destroy notify removes the entry, which
//! drops the closure and its user data exactly once.
//!
//! Callbacks may be delivered from whichever thread dispatches the GLib main
//! context, so the registry is mutex-guarded. A delivery that arrives while
//! the same registration's closure is already running on this thread (the
//! closure dispatched the main context itself) is dropped with a warning.

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, trace, warn};

use crate::marshal::copy_c_str;
use crate::notification::Notification;
use crate::sys::{Native, NotifyNotification, gchar, gpointer};

pub(crate) type ActionCallback = Box<dyn FnMut(&Notification, &str) + Send>;

/// Key of one action registration in the callback registry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegistrationId(u64);

impl RegistrationId {
    fn into_user_data(self) -> gpointer {
        ptr::without_provenance_mut(self.0 as usize)
    }

    fn from_user_data(data: gpointer) -> Self {
        Self(data.addr() as u64)
    }
}

struct ActionEntry {
    native: Arc<Native>,
    callback: Mutex<ActionCallback>,
}

static REGISTRY: LazyLock<Mutex<HashMap<RegistrationId, Arc<ActionEntry>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

// Zero is never handed out so a null user-data pointer cannot alias an entry.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static RUNNING: RefCell<HashSet<RegistrationId>> = RefCell::new(HashSet::new());
}

/// Marks a registration as running on the current thread until dropped.
struct Running(RegistrationId);

impl Running {
    fn enter(id: RegistrationId) -> Option<Self> {
        RUNNING
            .with_borrow_mut(|running| running.insert(id))
            .then_some(Self(id))
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        RUNNING.with_borrow_mut(|running| running.remove(&self.0));
    }
}

fn registry() -> MutexGuard<'static, HashMap<RegistrationId, Arc<ActionEntry>>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn register(native: Arc<Native>, callback: ActionCallback) -> (RegistrationId, gpointer) {
    let id = RegistrationId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let entry = Arc::new(ActionEntry {
        native,
        callback: Mutex::new(callback),
    });
    registry().insert(id, entry);
    trace!(registration = id.0, "action registered");
    (id, id.into_user_data())
}

/// Removes a registration; returns whether it was still present.
pub(crate) fn deregister(id: RegistrationId) -> bool {
    let removed = registry().remove(&id);
    removed.is_some()
}

/// Whether the native library still holds the registration.
#[must_use]
pub fn is_registered(id: RegistrationId) -> bool {
    registry().contains_key(&id)
}

/// `NotifyActionCallback` handed to the native library for every action.
pub(crate) unsafe extern "C" fn trampoline(
    notification: *mut NotifyNotification,
    action: *mut gchar,
    user_data: gpointer,
) {
    let id = RegistrationId::from_user_data(user_data);
    // The registry lock is released before the closure runs so the closure
    // may clear actions, which re-enters `release`.
    let Some(entry) = registry().get(&id).cloned() else {
        warn!(registration = id.0, "action invoked after its registration was released");
        return;
    };
    let Some(raw) = NonNull::new(notification) else {
        warn!(registration = id.0, "action invoked without a notification");
        return;
    };
    // SAFETY: the native library passes the NUL-terminated action id.
    let action = unsafe { copy_c_str(action) }.unwrap_or_default();
    let Some(_running) = Running::enter(id) else {
        warn!(registration = id.0, %action, "nested action delivery skipped");
        return;
    };
    debug!(registration = id.0, %action, "action invoked");

    let borrowed = Notification::borrowed(raw, Arc::clone(&entry.native));
    let outcome = catch_unwind(AssertUnwindSafe(move || {
        let mut callback = entry
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (*callback)(&borrowed, &action);
        drop(callback);
        // May be the last reference if the closure cleared its own action.
        drop(entry);
    }));
    if outcome.is_err() {
        error!(registration = id.0, "action callback panicked");
    }
}

/// `GFreeFunc` the native library calls when it drops an action.
pub(crate) unsafe extern "C" fn release(user_data: gpointer) {
    let id = RegistrationId::from_user_data(user_data);
    // Dropping the closure runs host destructors, which must not unwind into C.
    let outcome = catch_unwind(|| deregister(id));
    match outcome {
        Ok(true) => trace!(registration = id.0, "action released"),
        Ok(false) => warn!(registration = id.0, "action released twice"),
        Err(_) => error!(registration = id.0, "action user data panicked on release"),
    }
}
