//! Snapshot iteration over a claimed store (component G).

extern crate alloc;

use core::sync::atomic::Ordering;

use crate::cell::{POPPED, PUSHED};
use crate::reclaim::Guard;
use crate::store::Store;

/// A read-only snapshot of the stack at the instant of claim.
///
/// Holding a `View` keeps its underlying store alive (Invariant 6: "a store
/// pointed to by the stack handle is never freed while a view holds it
/// claimed") via the same hazard-pointer guard used by push/pop.
pub struct View {
    store: *const Store,
    cursor: i64,
    _guard: Guard,
}

// Safety: `store` is only ever read through shared (`&Cell`) accessors,
// and the hazard guard keeps it alive for the view's whole lifetime.
unsafe impl Send for View {}

impl View {
    pub(crate) fn new(store: *mut Store, claim_index: u32, guard: Guard) -> Self {
        Self {
            store,
            cursor: claim_index as i64 - 1,
            _guard: guard,
        }
    }

    /// `view_next(view_handle) -> item` (spec §6, §4.G). Iterates the
    /// snapshot in reverse push order, returning `None` once exhausted
    /// (the `done_flag` out-parameter of the C-ABI contract).
    pub fn view_next(&mut self) -> Option<usize> {
        let store = unsafe { &*self.store };
        while self.cursor >= 0 {
            let idx = self.cursor as usize;
            self.cursor -= 1;
            let cell = &store.cells[idx];
            let meta = cell.load_meta(Ordering::Acquire);
            if meta.has(PUSHED) && !meta.has(POPPED) {
                return Some(cell.load_payload(Ordering::Acquire));
            }
            // POPPED (or, impossibly, empty) at claim time: skip.
        }
        None
    }
}

impl Iterator for View {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.view_next()
    }
}
