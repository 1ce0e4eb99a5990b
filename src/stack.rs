//! The stack handle: push/pop paths (components D/E) and migration
//! (component F), wired together over a `Store` generation chain.

extern crate alloc;

use alloc::boxed::Box;
use core::sync::atomic::{AtomicPtr, Ordering};

use cfg_if::cfg_if;

use crate::backoff::{Backoff, HelpState};
use crate::cell::{POPPED, PUSHED};
use crate::config::{DEFAULT_COMPRESS_THRESHOLD, DEFAULT_INITIAL_CAPACITY};
use crate::fatal::fatal;
use crate::reclaim::{self, Guard};
use crate::stat_inc;
use crate::stats;
use crate::store::Store;
use crate::view::View;

/// A concurrent, lock-free (or wait-free, under the `wait_free` feature)
/// LIFO stack. See the crate root for the operation contract (spec §6).
pub struct HatStack {
    current: AtomicPtr<Store>,
    compress_threshold: u32,
    help: HelpState,
}

// Safety: every field is either an atomic or interior-mutable only through
// atomics; `Store` pointers are only ever dereferenced behind a hazard
// guard (see `reclaim`).
unsafe impl Send for HatStack {}
unsafe impl Sync for HatStack {}

impl HatStack {
    /// `new(initial_capacity)` → handle (spec §6). Capacity 0 falls back to
    /// the build-time default.
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = resolve_capacity(initial_capacity);
        let store = Store::new(capacity);
        Self {
            current: AtomicPtr::new(Box::into_raw(store)),
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD as u32,
            help: HelpState::new(),
        }
    }

    /// `init(handle, initial_capacity)` → in-place construction into
    /// caller-provided storage (spec §6). Rust expresses this as
    /// overwriting an existing (e.g. stack-allocated or `MaybeUninit`)
    /// handle value rather than a separate allocation step.
    pub fn init(&mut self, initial_capacity: usize) {
        let capacity = resolve_capacity(initial_capacity);
        let store = Store::new(capacity);
        self.current = AtomicPtr::new(Box::into_raw(store));
        self.compress_threshold = DEFAULT_COMPRESS_THRESHOLD as u32;
        self.help = HelpState::new();
    }

    /// `cleanup(handle)` → releases the current store. Caller guarantees no
    /// concurrent operations (spec §6).
    pub fn cleanup(&mut self) {
        let ptr = self.current.swap(core::ptr::null_mut(), Ordering::AcqRel);
        if !ptr.is_null() {
            unsafe { reclaim::retire(Box::from_raw(ptr)) };
        }
    }

    fn load_current(&self) -> (*mut Store, Guard) {
        loop {
            let ptr = self.current.load(Ordering::Acquire);
            debug_assert!(!ptr.is_null(), "use after cleanup()");
            if let Some(guard) = Guard::publish(ptr) {
                // Re-check: the pointer could have been retired between the
                // load and the publish landing.
                if self.current.load(Ordering::Acquire) == ptr {
                    return (ptr, guard);
                }
            }
            core::hint::spin_loop();
        }
    }

    /// `push(handle, item)` → void (spec §6, §4.D).
    pub fn push(&self, item: usize) {
        let mut backoff = Backoff::new(item as u64 ^ 0x9E3779B97F4A7C15);
        loop {
            let (store_ptr, guard) = self.load_current();
            let store = unsafe { &*store_ptr };
            let head = store.load_head(Ordering::Acquire);

            if head.moving || head.index >= store.capacity {
                self.help_migrate(store_ptr, guard);
                continue;
            }

            match store.head.try_reserve_push(head, store.capacity) {
                Ok(reserved) => {
                    let epoch = reserved.epoch + 1;
                    let idx = reserved.index as usize;
                    match store.cells[idx].try_push(item, epoch) {
                        Ok(()) => {
                            stat_inc!(pushes);
                            return;
                        }
                        Err(_) => {
                            // Overtaken: epoch (or the moving flag) advanced
                            // under us. Restart from the top (spec §4.D step 4).
                        }
                    }
                }
                Err(_) => {
                    // Stale head-state snapshot; restart.
                }
            }

            self.retry_delay(&mut backoff);
        }
    }

    /// `pop(handle) -> Option<item>` (spec §6, §4.E). `None` means the
    /// out-parameter `empty_flag` would have been set.
    pub fn pop(&self) -> Option<usize> {
        let mut backoff = Backoff::new(0xC2B2AE3D27D4EB4F);
        loop {
            let (store_ptr, guard) = self.load_current();
            let store = unsafe { &*store_ptr };
            let head = store.load_head(Ordering::Acquire);

            if head.moving {
                self.help_migrate(store_ptr, guard);
                continue;
            }
            if head.index == 0 {
                stat_inc!(empty_pops);
                return None;
            }

            match store.head.try_reserve_pop(head) {
                Ok(_) => {
                    let slot = head.index - 1;
                    let cell = &store.cells[slot as usize];
                    let meta = cell.load_meta(Ordering::Acquire);

                    if !meta.has(PUSHED) || meta.has(POPPED) {
                        // Dead slot (already popped) or a late pusher that
                        // hasn't landed yet: we've already moved the head
                        // down past it, so just rescan lower (spec §4.E
                        // steps 4/6).
                        continue;
                    }

                    match cell.try_pop(meta) {
                        Ok(()) => {
                            stat_inc!(pops);
                            return Some(cell.load_payload(Ordering::Acquire));
                        }
                        Err(_) => {
                            // Another popper (or migration) beat us to this
                            // cell; restart the scan.
                        }
                    }
                }
                Err(_) => {
                    // Stale head-state snapshot; restart.
                }
            }

            self.retry_delay(&mut backoff);
        }
    }

    #[inline]
    fn retry_delay(&self, backoff: &mut Backoff) {
        cfg_if! {
            if #[cfg(feature = "wait_free")] {
                if backoff.should_escalate() {
                    self.help.escalate();
                }
                backoff.spin(self.help.level());
            } else {
                let _ = backoff;
                core::hint::spin_loop();
            }
        }
    }

    /// `view(handle) -> view_handle` (spec §6, §4.G). Claims the current
    /// store, forcing a migration on mutators, and captures the snapshot
    /// boundary.
    pub fn view(&self) -> View {
        loop {
            let (store_ptr, guard) = self.load_current();
            let store = unsafe { &*store_ptr };
            if store.try_claim() {
                stat_inc!(view_claims);
                let head = store.load_head(Ordering::Acquire);
                // Force the store to migrate off so mutators stop touching
                // it; the view itself reads the frozen snapshot directly
                // through its own guard, so it needs a hazard entry
                // independent of whatever help_migrate uses and releases.
                if let Some(helper_guard) = Guard::publish(store_ptr) {
                    self.help_migrate(store_ptr, helper_guard);
                }
                return View::new(store_ptr, head.index, guard);
            }
            // Someone else already claimed (or migrated) this generation;
            // retry against whatever the handle now points at.
        }
    }

    /// Triggers and helps drive migration of `store_ptr` to completion,
    /// then publishes the successor on the handle if not already done.
    /// Takes ownership of the caller's hazard guard on `store_ptr` so it
    /// can be dropped at the precise point it's safe to retire: after the
    /// last read of `store`, before the handle-publish CAS that may make
    /// this thread the one to free it (a thread must never hold its own
    /// hazard on a pointer it's about to reclaim, or `retire` would
    /// spuriously treat it as still in use and leak it every time).
    fn help_migrate(&self, store_ptr: *mut Store, guard: Guard) {
        let store = unsafe { &*store_ptr };
        let head = store.load_head(Ordering::Acquire);

        if !head.moving && store.head.try_set_moving(head).is_ok() {
            stat_inc!(migrations_started);
        }

        // Successor allocation: any helper may win this CAS. A view claim
        // (store.claimed already true here) makes this migration eligible
        // for the compress shrink path; a plain full-store migration never
        // is (spec §9 "Migration growth policy").
        if store.next.load(Ordering::Acquire).is_null() {
            let live_estimate = store.count_live(store.capacity);
            let shrink_eligible = store.is_claimed(Ordering::Acquire);
            let capacity = store.successor_capacity(live_estimate, self.compress_threshold, shrink_eligible);
            let successor = Box::into_raw(Store::new(capacity));
            if store
                .next
                .compare_exchange(
                    core::ptr::null_mut(),
                    successor,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                // Lost the race; free our speculative allocation.
                drop(unsafe { Box::from_raw(successor) });
            }
        }

        let successor_ptr = store.next.load(Ordering::Acquire);
        debug_assert!(!successor_ptr.is_null());
        let successor = unsafe { &*successor_ptr };

        let live_count = copy_all(store, successor);
        successor.head.seed_migrated(live_count);
        debug_assert!(store.fully_moved());

        // Done reading through `store`/`store_ptr`; release our hazard
        // before possibly retiring it below.
        drop(guard);

        if self
            .current
            .compare_exchange(
                store_ptr,
                successor_ptr,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            stat_inc!(migrations_completed);
            unsafe { reclaim::retire(Box::from_raw(store_ptr)) };
        }
        // Else: someone else already published the successor; nothing
        // left for us to do.
    }
}

impl Drop for HatStack {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl Default for HatStack {
    fn default() -> Self {
        Self::new(0)
    }
}

fn resolve_capacity(initial_capacity: usize) -> u32 {
    let capacity = if initial_capacity == 0 {
        DEFAULT_INITIAL_CAPACITY
    } else {
        initial_capacity
    };
    if capacity == 0 || capacity as u64 > u32::MAX as u64 {
        fatal("initial capacity out of range");
    }
    capacity as u32
}

/// Migration's freeze-copy-mark pass (spec §4.F steps 3-5), safe to run
/// redundantly from any number of concurrent helpers: every operation
/// here is itself an idempotent CAS, and the destination index assigned
/// to each live source cell is a pure function of the (now-stable, once
/// observed MOVING) cell states scanned so far in ascending order — so
/// every helper computes the same assignment independently. Returns the
/// live count, which the caller seeds as the successor's starting head
/// index (the cells below it are occupied, matching invariant 2).
fn copy_all(old: &Store, new: &Store) -> u32 {
    let mut dest = 0u32;
    for cell in old.cells.iter() {
        let meta = cell.mark_moving();
        if meta.has(PUSHED) && !meta.has(POPPED) {
            let item = cell.load_payload(Ordering::Acquire);
            new.cells[dest as usize].try_install_migrated(item);
            dest += 1;
        }
        cell.mark_moved();
    }
    dest
}

pub(crate) fn stats_snapshot() -> stats::Snapshot {
    stats::snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo_single_thread() {
        let stack = HatStack::new(4);
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn pop_on_fresh_stack_is_empty() {
        let stack = HatStack::new(4);
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn push_past_capacity_migrates_and_preserves_order() {
        let stack = HatStack::new(4);
        for i in 1..=5usize {
            stack.push(i);
        }
        for expect in (1..=5usize).rev() {
            assert_eq!(stack.pop(), Some(expect));
        }
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn capacity_one_push_push_migrate_pop_pop() {
        let stack = HatStack::new(1);
        stack.push(10);
        stack.push(20);
        assert_eq!(stack.pop(), Some(20));
        assert_eq!(stack.pop(), Some(10));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn cleanup_then_init_is_reusable() {
        let mut stack = HatStack::new(2);
        stack.push(1);
        stack.cleanup();
        stack.init(2);
        stack.push(2);
        assert_eq!(stack.pop(), Some(2));
    }
}
