//! Store: a fixed-size array of cells plus a forwarding pointer to a
//! successor (component C).

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};

use crate::cell::{Cell, MOVED, POPPED, PUSHED};
use crate::fatal::fatal;
use crate::head_state::{Decoded, HeadState, MAX_INDEX};

/// Passive container for one generation of the stack's backing array.
///
/// `next` starts null; the first thread that decides a migration is
/// needed CASes in a freshly allocated successor. `claimed`, once set,
/// prevents further mutation — any operation observing it must help
/// migrate then retry on the successor (spec §4.C).
pub struct Store {
    pub capacity: u32,
    pub head: HeadState,
    pub next: AtomicPtr<Store>,
    pub claimed: AtomicBool,
    pub cells: Box<[Cell]>,
}

impl Store {
    /// A fresh store ready to accept pushes at `(epoch=0, index=0)`.
    pub fn new(capacity: u32) -> Box<Self> {
        if capacity == 0 || capacity > MAX_INDEX {
            fatal("store capacity out of range");
        }
        let mut cells = Vec::with_capacity(capacity as usize);
        cells.resize_with(capacity as usize, Cell::new);
        Box::new(Self {
            capacity,
            head: HeadState::new_ready(0, 0),
            next: AtomicPtr::new(core::ptr::null_mut()),
            claimed: AtomicBool::new(false),
            cells: cells.into_boxed_slice(),
        })
    }

    /// A store used only as the very first generation behind a stack
    /// handle: starts in the `INITIALIZING` sentinel state so `init()`
    /// can distinguish "never touched" from "in use" (spec §4.B).
    pub fn new_initializing(capacity: u32) -> Box<Self> {
        if capacity == 0 || capacity > MAX_INDEX {
            fatal("store capacity out of range");
        }
        let mut cells = Vec::with_capacity(capacity as usize);
        cells.resize_with(capacity as usize, Cell::new);
        Box::new(Self {
            capacity,
            head: HeadState::new_initializing(),
            next: AtomicPtr::new(core::ptr::null_mut()),
            claimed: AtomicBool::new(false),
            cells: cells.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn load_head(&self, order: core::sync::atomic::Ordering) -> Decoded {
        self.head.load(order)
    }

    #[inline]
    pub fn is_claimed(&self, order: Ordering) -> bool {
        self.claimed.load(order)
    }

    /// CAS `claimed` from false to true. Used by view-claim (§4.G) and by
    /// migration's full-store trigger path shares the moving flag instead.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Counts cells whose frozen state is PUSHED-not-POPPED, used by the
    /// compress-eligible growth policy (spec §9 "Migration growth policy").
    pub fn count_live(&self, upto_index: u32) -> u32 {
        let mut live = 0u32;
        for cell in &self.cells[..upto_index as usize] {
            let meta = cell.load_meta(Ordering::Acquire);
            if meta.has(PUSHED) && !meta.has(POPPED) {
                live += 1;
            }
        }
        live
    }

    /// Successor capacity for a migration, resolving the open growth-policy
    /// question as aggressive doubling, with a compress-eligible shrink path
    /// when the live fraction at claim time is below `1/compress_threshold`.
    pub fn successor_capacity(&self, live_count: u32, compress_threshold: u32, shrink_eligible: bool) -> u32 {
        let doubled = self.capacity.max(1).saturating_mul(2);
        let shrunk = live_count.max(1);
        let candidate = if shrink_eligible && shrunk * compress_threshold <= self.capacity {
            shrunk
        } else {
            doubled
        };
        if candidate > MAX_INDEX {
            fatal("migration would exceed maximum store capacity");
        }
        candidate
    }

    /// True once every cell in `0..capacity` bears MOVED (spec §4.F step 6
    /// precondition).
    pub fn fully_moved(&self) -> bool {
        self.cells
            .iter()
            .all(|c| c.load_meta(Ordering::Acquire).has(MOVED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn new_store_starts_empty_at_zero() {
        let store = Store::new(4);
        let head = store.load_head(Ordering::Acquire);
        assert_eq!(head.index, 0);
        assert_eq!(head.epoch, 0);
        assert!(!head.moving);
        assert_eq!(store.cells.len(), 4);
    }

    #[test]
    fn claim_is_single_winner() {
        let store = Store::new(4);
        assert!(store.try_claim());
        assert!(!store.try_claim());
        assert!(store.is_claimed(Ordering::Acquire));
    }

    #[test]
    fn successor_capacity_doubles_by_default() {
        let store = Store::new(4);
        assert_eq!(store.successor_capacity(4, 4, false), 8);
    }

    #[test]
    fn successor_capacity_shrinks_when_eligible() {
        let store = Store::new(16);
        // 2 live out of 16, threshold 4: 2*4=8 <= 16, so shrink to live=2.
        assert_eq!(store.successor_capacity(2, 4, true), 2);
    }

    #[test]
    fn count_live_ignores_popped_and_empty() {
        let store = Store::new(4);
        store.cells[0].try_push(1, 1).unwrap();
        store.cells[1].try_push(2, 1).unwrap();
        let meta = store.cells[1].load_meta(Ordering::Acquire);
        store.cells[1].try_pop(meta).unwrap();
        assert_eq!(store.count_live(4), 1);
    }
}
