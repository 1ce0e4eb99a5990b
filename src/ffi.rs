//! C-ABI exports of the nine operations in spec §6.
//!
//! Gated behind `features = ["ffi"]`. With `testing`, export names are
//! suffixed by build variant so a lock-free and a wait-free build of this
//! crate can be linked into the same test binary side by side:
//!   - `wait_free` feature on  → `hatstack_wait_free_*`
//!   - otherwise               → `hatstack_lock_free_*`
//! Without `testing`, exports plain `hatstack_*` names.

extern crate alloc;

use alloc::boxed::Box;

use crate::stack::HatStack;
use crate::view::View;

/// `new(initial_capacity)` → handle.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_new")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_new")
)]
pub extern "C" fn hatstack_new(initial_capacity: usize) -> *mut HatStack {
    Box::into_raw(Box::new(HatStack::new(initial_capacity)))
}

/// `init(handle, initial_capacity)` → void. In-place construction into
/// caller-provided, currently-uninitialized storage.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_init")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_init")
)]
pub unsafe extern "C" fn hatstack_init(handle: *mut HatStack, initial_capacity: usize) {
    unsafe { core::ptr::write(handle, HatStack::new(initial_capacity)) };
}

/// `cleanup(handle)` → void. Releases the current store; caller guarantees
/// no concurrent operations.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_cleanup")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_cleanup")
)]
pub unsafe extern "C" fn hatstack_cleanup(handle: *mut HatStack) {
    unsafe { (*handle).cleanup() };
}

/// `delete(handle)` → void. cleanup + free the handle.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_delete")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_delete")
)]
pub unsafe extern "C" fn hatstack_delete(handle: *mut HatStack) {
    drop(unsafe { Box::from_raw(handle) });
}

/// `push(handle, item)` → void.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_push")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_push")
)]
pub unsafe extern "C" fn hatstack_push(handle: *const HatStack, item: usize) {
    unsafe { (*handle).push(item) };
}

/// `pop(handle, *empty_flag)` → item.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_pop")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_pop")
)]
pub unsafe extern "C" fn hatstack_pop(handle: *const HatStack, empty_flag: *mut bool) -> usize {
    match unsafe { (*handle).pop() } {
        Some(item) => {
            unsafe { *empty_flag = false };
            item
        }
        None => {
            unsafe { *empty_flag = true };
            0
        }
    }
}

/// `view(handle)` → view_handle.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_view")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_view")
)]
pub unsafe extern "C" fn hatstack_view(handle: *const HatStack) -> *mut View {
    Box::into_raw(Box::new(unsafe { (*handle).view() }))
}

/// `view_next(view_handle, *done_flag)` → item.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_view_next")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_view_next")
)]
pub unsafe extern "C" fn hatstack_view_next(view_handle: *mut View, done_flag: *mut bool) -> usize {
    match unsafe { (*view_handle).view_next() } {
        Some(item) => {
            unsafe { *done_flag = false };
            item
        }
        None => {
            unsafe { *done_flag = true };
            0
        }
    }
}

/// `view_delete(view_handle)` → void.
#[cfg_attr(not(feature = "testing"), unsafe(no_mangle))]
#[cfg_attr(
    all(feature = "testing", feature = "wait_free"),
    unsafe(export_name = "hatstack_wait_free_view_delete")
)]
#[cfg_attr(
    all(feature = "testing", not(feature = "wait_free")),
    unsafe(export_name = "hatstack_lock_free_view_delete")
)]
pub unsafe extern "C" fn hatstack_view_delete(view_handle: *mut View) {
    drop(unsafe { Box::from_raw(view_handle) });
}
