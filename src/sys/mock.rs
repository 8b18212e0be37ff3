//! In-process stand-in for libnotify and GLib.
//!
//! State is thread-local so every test thread sees its own library. Every
//! allocation handed across the boundary is counted so tests can assert it
//! came back exactly once.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::slice;

use super::{
    GDestroyNotify, GError, GFreeFunc, GList, GQuark, NativeApi, Native, NotifyActionCallback,
    NotifyNotification, gboolean, gchar, gdouble, gint, gpointer, gsize, guchar,
};
use crate::Notifier;
use crate::notification::Notification;

pub(crate) const MOCK_DOMAIN: GQuark = 7;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    New {
        summary: String,
        body: Option<String>,
        icon: Option<String>,
    },
    Update {
        summary: String,
        body: Option<String>,
        icon: Option<String>,
    },
    Show,
    Close,
    Timeout(i32),
    Category(String),
    Urgency(i32),
    AppName(String),
    HintInt32(String, i32),
    HintDouble(String, f64),
    HintString(String, String),
    HintByte(String, u8),
    HintByteArray(String, Vec<u8>),
    ClearHints,
    AddAction { action: String, label: String },
    ClearActions,
}

struct MockAction {
    notification: usize,
    action: CString,
    callback: NotifyActionCallback,
    user_data: gpointer,
    free_func: Option<GFreeFunc>,
}

struct MockObject {
    refs: usize,
}

pub(crate) struct MockState {
    pub initialized: bool,
    pub init_calls: usize,
    pub refuse_init: bool,
    pub refuse_new: bool,
    pub refuse_update: bool,
    pub app_name: Option<CString>,
    pub caps: Vec<String>,
    pub server_info: Option<[String; 4]>,
    pub show_error: Option<(GQuark, i32, String)>,
    pub close_error: Option<(GQuark, i32, String)>,
    pub fail_show_silently: bool,
    pub closed_reason: i32,
    pub dispatches: usize,
    pub calls: Vec<Call>,
    pub live_objects: isize,
    pub live_errors: isize,
    pub live_strings: isize,
    pub live_list_nodes: isize,
    actions: Vec<MockAction>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            initialized: false,
            init_calls: 0,
            refuse_init: false,
            refuse_new: false,
            refuse_update: false,
            app_name: None,
            caps: Vec::new(),
            server_info: None,
            show_error: None,
            close_error: None,
            fail_show_silently: false,
            closed_reason: -1,
            dispatches: 0,
            calls: Vec::new(),
            live_objects: 0,
            live_errors: 0,
            live_strings: 0,
            live_list_nodes: 0,
            actions: Vec::new(),
        }
    }
}

thread_local! {
    static STATE: RefCell<MockState> = RefCell::new(MockState::default());
}

pub(crate) fn with_state<R>(f: impl FnOnce(&mut MockState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

pub(crate) fn reset() {
    with_state(|state| *state = MockState::default());
}

pub(crate) fn calls() -> Vec<Call> {
    with_state(|state| state.calls.clone())
}

pub(crate) fn take_calls() -> Vec<Call> {
    with_state(|state| std::mem::take(&mut state.calls))
}

pub(crate) fn registered_actions() -> usize {
    with_state(|state| state.actions.len())
}

pub(crate) fn assert_no_leaks() {
    with_state(|state| {
        assert_eq!(state.live_objects, 0, "notification objects leaked or over-released");
        assert_eq!(state.live_errors, 0, "GError leaked or over-released");
        assert_eq!(state.live_strings, 0, "strings leaked or over-released");
        assert_eq!(state.live_list_nodes, 0, "list nodes leaked or over-released");
        assert!(state.actions.is_empty(), "actions still held by the native side");
    });
}

/// Fresh mock state plus a notifier bound to it.
pub(crate) fn notifier() -> Notifier {
    reset();
    Notifier::from_native(Native::from_api(api()))
}

/// Emulates the server reporting `action` on `notification`.
pub(crate) fn trigger_action(notification: &Notification, action: &str) -> bool {
    let target = notification.as_ptr().addr();
    let found = with_state(|state| {
        state
            .actions
            .iter()
            .find(|a| a.notification == target && a.action.as_bytes() == action.as_bytes())
            .map(|a| (a.callback, a.action.clone(), a.user_data))
    });
    let Some((callback, action, user_data)) = found else {
        return false;
    };
    // SAFETY: mirrors how libnotify invokes the registered callback.
    unsafe { callback(notification.as_ptr(), action.as_ptr().cast_mut(), user_data) };
    true
}

pub(crate) fn api() -> NativeApi {
    NativeApi {
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
    }
}

unsafe fn owned(ptr: *const gchar) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: callers pass NUL-terminated strings.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

unsafe fn owned_or_empty(ptr: *const gchar) -> String {
    // SAFETY: forwarded.
    unsafe { owned(ptr) }.unwrap_or_default()
}

fn record(call: Call) {
    with_state(|state| state.calls.push(call));
}

fn alloc_string(state: &mut MockState, value: &str) -> *mut gchar {
    state.live_strings += 1;
    CString::new(value).unwrap_or_default().into_raw()
}

fn alloc_error(state: &mut MockState, (domain, code, message): (GQuark, i32, String)) -> *mut GError {
    state.live_errors += 1;
    let message = CString::new(message).unwrap_or_default().into_raw();
    Box::into_raw(Box::new(GError {
        domain,
        code,
        message,
    }))
}

/// Drops every action registered on `notification`, running destroy
/// notifies outside the state borrow as libnotify does.
fn release_actions(notification: usize) {
    let released: Vec<MockAction> = with_state(|state| {
        let (released, kept): (Vec<MockAction>, Vec<MockAction>) = std::mem::take(&mut state.actions)
            .into_iter()
            .partition(|a| a.notification == notification);
        state.actions = kept;
        released
    });
    for action in released {
        if let Some(free_func) = action.free_func {
            // SAFETY: the registrant supplied it for exactly this pointer.
            unsafe { free_func(action.user_data) };
        }
    }
}

unsafe extern "C" fn notify_init(app_name: *const gchar) -> gboolean {
    // SAFETY: NUL-terminated by contract.
    let name = unsafe { owned_or_empty(app_name) };
    with_state(|state| {
        state.init_calls += 1;
        if state.refuse_init {
            return 0;
        }
        state.initialized = true;
        state.app_name = CString::new(name).ok();
        1
    })
}

unsafe extern "C" fn notify_uninit() {
    with_state(|state| {
        state.initialized = false;
        state.app_name = None;
    });
}

unsafe extern "C" fn notify_is_initted() -> gboolean {
    with_state(|state| gboolean::from(state.initialized))
}

unsafe extern "C" fn notify_get_app_name() -> *const gchar {
    with_state(|state| state.app_name.as_ref().map_or(ptr::null(), |n| n.as_ptr()))
}

unsafe extern "C" fn notify_set_app_name(app_name: *const gchar) {
    // SAFETY: NUL-terminated by contract.
    let name = unsafe { owned_or_empty(app_name) };
    with_state(|state| state.app_name = CString::new(name).ok());
}

unsafe extern "C" fn notify_get_server_caps() -> *mut GList {
    with_state(|state| {
        let caps = state.caps.clone();
        let mut head: *mut GList = ptr::null_mut();
        for cap in caps.iter().rev() {
            let data = alloc_string(state, cap).cast();
            state.live_list_nodes += 1;
            let node = Box::into_raw(Box::new(GList {
                data,
                next: head,
                prev: ptr::null_mut(),
            }));
            if !head.is_null() {
                // SAFETY: `head` was allocated just above.
                unsafe { (*head).prev = node };
            }
            head = node;
        }
        head
    })
}

unsafe extern "C" fn notify_get_server_info(
    name: *mut *mut gchar,
    vendor: *mut *mut gchar,
    version: *mut *mut gchar,
    spec_version: *mut *mut gchar,
) -> gboolean {
    with_state(|state| {
        let Some(info) = state.server_info.clone() else {
            return 0;
        };
        for (out, value) in [name, vendor, version, spec_version].into_iter().zip(info.iter()) {
            if !out.is_null() {
                let value = alloc_string(state, value);
                // SAFETY: non-null out-parameter.
                unsafe { *out = value };
            }
        }
        1
    })
}

unsafe extern "C" fn notify_notification_new(
    summary: *const gchar,
    body: *const gchar,
    icon: *const gchar,
) -> *mut NotifyNotification {
    // SAFETY: NUL-terminated or null by contract.
    let call = unsafe {
        Call::New {
            summary: owned_or_empty(summary),
            body: owned(body),
            icon: owned(icon),
        }
    };
    record(call);
    with_state(|state| {
        if state.refuse_new {
            return ptr::null_mut();
        }
        state.live_objects += 1;
        Box::into_raw(Box::new(MockObject { refs: 1 })).cast()
    })
}

unsafe extern "C" fn notify_notification_update(
    _notification: *mut NotifyNotification,
    summary: *const gchar,
    body: *const gchar,
    icon: *const gchar,
) -> gboolean {
    // SAFETY: NUL-terminated or null by contract.
    let call = unsafe {
        Call::Update {
            summary: owned_or_empty(summary),
            body: owned(body),
            icon: owned(icon),
        }
    };
    record(call);
    with_state(|state| gboolean::from(!state.refuse_update))
}

unsafe extern "C" fn notify_notification_show(
    _notification: *mut NotifyNotification,
    error: *mut *mut GError,
) -> gboolean {
    record(Call::Show);
    with_state(|state| {
        if let Some(detail) = state.show_error.clone() {
            if !error.is_null() {
                let err = alloc_error(state, detail);
                // SAFETY: non-null out-parameter.
                unsafe { *error = err };
            }
            return 0;
        }
        gboolean::from(!state.fail_show_silently)
    })
}

unsafe extern "C" fn notify_notification_close(
    _notification: *mut NotifyNotification,
    error: *mut *mut GError,
) -> gboolean {
    record(Call::Close);
    with_state(|state| {
        if let Some(detail) = state.close_error.clone() {
            if !error.is_null() {
                let err = alloc_error(state, detail);
                // SAFETY: non-null out-parameter.
                unsafe { *error = err };
            }
            return 0;
        }
        state.closed_reason = 3;
        1
    })
}

unsafe extern "C" fn notify_notification_set_timeout(
    _notification: *mut NotifyNotification,
    timeout: gint,
) {
    record(Call::Timeout(timeout));
}

unsafe extern "C" fn notify_notification_set_category(
    _notification: *mut NotifyNotification,
    category: *const gchar,
) {
    // SAFETY: NUL-terminated by contract.
    record(Call::Category(unsafe { owned_or_empty(category) }));
}

unsafe extern "C" fn notify_notification_set_urgency(
    _notification: *mut NotifyNotification,
    urgency: c_int,
) {
    record(Call::Urgency(urgency));
}

unsafe extern "C" fn notify_notification_set_app_name(
    _notification: *mut NotifyNotification,
    app_name: *const gchar,
) {
    // SAFETY: NUL-terminated by contract.
    record(Call::AppName(unsafe { owned_or_empty(app_name) }));
}

unsafe extern "C" fn notify_notification_get_closed_reason(
    _notification: *const NotifyNotification,
) -> gint {
    with_state(|state| state.closed_reason)
}

unsafe extern "C" fn notify_notification_set_hint_int32(
    _notification: *mut NotifyNotification,
    key: *const gchar,
    value: gint,
) {
    // SAFETY: NUL-terminated by contract.
    record(Call::HintInt32(unsafe { owned_or_empty(key) }, value));
}

unsafe extern "C" fn notify_notification_set_hint_double(
    _notification: *mut NotifyNotification,
    key: *const gchar,
    value: gdouble,
) {
    // SAFETY: NUL-terminated by contract.
    record(Call::HintDouble(unsafe { owned_or_empty(key) }, value));
}

unsafe extern "C" fn notify_notification_set_hint_string(
    _notification: *mut NotifyNotification,
    key: *const gchar,
    value: *const gchar,
) {
    // SAFETY: NUL-terminated by contract.
    let call = unsafe { Call::HintString(owned_or_empty(key), owned_or_empty(value)) };
    record(call);
}

unsafe extern "C" fn notify_notification_set_hint_byte(
    _notification: *mut NotifyNotification,
    key: *const gchar,
    value: guchar,
) {
    // SAFETY: NUL-terminated by contract.
    record(Call::HintByte(unsafe { owned_or_empty(key) }, value));
}

unsafe extern "C" fn notify_notification_set_hint_byte_array(
    _notification: *mut NotifyNotification,
    key: *const gchar,
    value: *const guchar,
    len: gsize,
) {
    let bytes = if len == 0 {
        Vec::new()
    } else {
        // SAFETY: `value` points to `len` readable bytes by contract.
        unsafe { slice::from_raw_parts(value, len) }.to_vec()
    };
    // SAFETY: NUL-terminated by contract.
    record(Call::HintByteArray(unsafe { owned_or_empty(key) }, bytes));
}

unsafe extern "C" fn notify_notification_clear_hints(_notification: *mut NotifyNotification) {
    record(Call::ClearHints);
}

unsafe extern "C" fn notify_notification_add_action(
    notification: *mut NotifyNotification,
    action: *const gchar,
    label: *const gchar,
    callback: NotifyActionCallback,
    user_data: gpointer,
    free_func: Option<GFreeFunc>,
) {
    // SAFETY: NUL-terminated by contract.
    let (action, label) = unsafe { (owned_or_empty(action), owned_or_empty(label)) };
    record(Call::AddAction {
        action: action.clone(),
        label,
    });
    with_state(|state| {
        state.actions.push(MockAction {
            notification: notification.addr(),
            action: CString::new(action).unwrap_or_default(),
            callback,
            user_data,
            free_func,
        });
    });
}

unsafe extern "C" fn notify_notification_clear_actions(notification: *mut NotifyNotification) {
    record(Call::ClearActions);
    release_actions(notification.addr());
}

unsafe extern "C" fn g_object_unref(object: gpointer) {
    let object: *mut MockObject = object.cast();
    // SAFETY: only mock objects are handed to this function.
    let remaining = unsafe {
        (*object).refs -= 1;
        (*object).refs
    };
    if remaining == 0 {
        release_actions(object.addr());
        // SAFETY: allocated by `notify_notification_new`; last reference.
        drop(unsafe { Box::from_raw(object) });
        with_state(|state| state.live_objects -= 1);
    }
}

unsafe extern "C" fn g_error_free(error: *mut GError) {
    // SAFETY: allocated by `alloc_error`.
    let error = unsafe { Box::from_raw(error) };
    // SAFETY: allocated with `CString::into_raw`.
    drop(unsafe { CString::from_raw(error.message) });
    with_state(|state| state.live_errors -= 1);
}

unsafe extern "C" fn g_free(mem: gpointer) {
    if mem.is_null() {
        return;
    }
    // SAFETY: every mock string handed out comes from `alloc_string`.
    drop(unsafe { CString::from_raw(mem.cast()) });
    with_state(|state| state.live_strings -= 1);
}

unsafe extern "C" fn g_list_free_full(list: *mut GList, free_func: GDestroyNotify) {
    let mut node = list;
    while !node.is_null() {
        // SAFETY: nodes come from `notify_get_server_caps`.
        let boxed = unsafe { Box::from_raw(node) };
        // SAFETY: element ownership travels with the list.
        unsafe { free_func(boxed.data) };
        node = boxed.next;
        with_state(|state| state.live_list_nodes -= 1);
    }
}

unsafe extern "C" fn g_quark_to_string(quark: GQuark) -> *const gchar {
    if quark == MOCK_DOMAIN {
        c"mock-error-quark".as_ptr()
    } else {
        ptr::null()
    }
}

unsafe extern "C" fn g_main_context_iteration(_context: gpointer, _may_block: gboolean) -> gboolean {
    with_state(|state| state.dispatches += 1);
    0
}
