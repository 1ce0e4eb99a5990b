//! Minimal hazard-pointer-lite reclamation for retired stores.
//!
//! Spec §5 treats reclamation as an external collaborator but still
//! requires (Invariant 6) that a store is never freed while a view holds
//! it claimed, and more broadly that the core "must never free a store
//! that might still be referenced by a concurrent operation." A thread
//! about to dereference a store pointer it read from the handle publishes
//! that pointer into a small fixed-size hazard slot table first; `retire`
//! defers the `Box` drop until no slot names that pointer. If the table is
//! ever full, the store is leaked rather than freed unsafely (spec §9:
//! "leaking retired stores is acceptable for a first cut but must be
//! documented").

extern crate alloc;

use alloc::boxed::Box;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::stat_inc;
use crate::store::Store;
use crate::sync::SpinMutex;

const HAZARD_SLOTS: usize = 64;

struct HazardTable {
    slots: [AtomicPtr<Store>; HAZARD_SLOTS],
}

static RETIRE_GATE: SpinMutex<()> = SpinMutex::new(());

static HAZARDS: HazardTable = HazardTable {
    slots: [const { AtomicPtr::new(core::ptr::null_mut()) }; HAZARD_SLOTS],
};

/// RAII guard publishing a hazard pointer for the duration of a read of
/// `*ptr`. Clears its slot on drop.
pub struct Guard {
    slot: usize,
}

impl Guard {
    /// Publish `ptr` as in-use by the calling thread. Returns `None` if
    /// every slot is currently occupied (table is deliberately small and
    /// sized for the expected number of concurrently-active threads per
    /// stack; callers that can't get a slot simply retry their read).
    pub fn publish(ptr: *mut Store) -> Option<Self> {
        for (i, slot) in HAZARDS.slots.iter().enumerate() {
            if slot
                .compare_exchange(
                    core::ptr::null_mut(),
                    ptr,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Some(Guard { slot: i });
            }
        }
        None
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        HAZARDS.slots[self.slot].store(core::ptr::null_mut(), Ordering::Release);
    }
}

fn is_hazardous(ptr: *mut Store) -> bool {
    HAZARDS
        .slots
        .iter()
        .any(|s| s.load(Ordering::Acquire) == ptr)
}

/// Retire a store that has just been unlinked from the stack handle (or
/// superseded by a successor). Frees it immediately if provably
/// unreferenced, otherwise leaks it and records the leak via `stats`.
///
/// # Safety
/// `store` must already be unreachable from the stack handle's current
/// store pointer and from any store's `next` chain — i.e. it must have
/// already been fully migrated-from and superseded.
pub unsafe fn retire(store: Box<Store>) {
    let raw = Box::into_raw(store);
    let _gate = RETIRE_GATE.lock();
    if is_hazardous(raw) {
        // A reader is mid-dereference; leaking is the documented fallback
        // rather than risking a use-after-free.
        stat_inc!(retired_leaked);
        return;
    }
    drop(unsafe { Box::from_raw(raw) });
}
