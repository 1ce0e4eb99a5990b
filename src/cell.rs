//! Cell protocol: the per-slot atomic state machine (component A).
//!
//! A cell holds an opaque payload word plus a tightly packed `meta` word of
//! `(valid_after epoch : 60 bits, state flags : 4 bits)`, and a third
//! `writer` token used only during publish. The spec's own design notes
//! sanction widening the single conceptual (item, state, epoch) CAS into
//! "two atomics with a generation counter" on targets without a double-word
//! CAS; a bare two-atomic split (payload then a racing meta CAS) allows two
//! concurrent pushers who both observe the cell as available — one whose
//! reservation has already been overtaken by a popper decrementing the head
//! index back onto this slot — to clobber each other's payload before
//! either CAS resolves. `writer` closes that window: a pusher must win it
//! before touching `payload`, so at most one thread is ever mid-write.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Cell contains a valid item.
pub const PUSHED: u64 = 1;
/// Cell's item has been consumed.
pub const POPPED: u64 = 2;
/// Cell is being migrated.
pub const MOVING: u64 = 4;
/// Cell migration is complete.
pub const MOVED: u64 = 8;

const STATE_BITS: u32 = 4;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

/// No thread currently holds the publish-exclusivity token.
const NO_WRITER: u64 = 0;

/// Decoded view of a cell's `meta` word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Meta {
    pub state: u64,
    pub valid_after: u64,
}

impl Meta {
    #[inline]
    fn pack(self) -> u64 {
        (self.valid_after << STATE_BITS) | self.state
    }

    #[inline]
    fn unpack(word: u64) -> Self {
        Self {
            state: word & STATE_MASK,
            valid_after: word >> STATE_BITS,
        }
    }

    #[inline]
    pub fn has(self, flag: u64) -> bool {
        self.state & flag != 0
    }
}

/// One slot in a [`Store`](crate::store::Store).
///
/// `payload` is an opaque machine word; the stack never dereferences it.
/// `meta` packs the state bitmask and validity epoch described in spec §3.
pub struct Cell {
    payload: AtomicUsize,
    meta: AtomicU64,
    /// Epoch of whoever currently holds exclusive publish rights to
    /// `payload`, or `NO_WRITER`. Private to this implementation — not
    /// part of the documented cell bit-layout contract.
    writer: AtomicU64,
}

impl Cell {
    pub const fn new() -> Self {
        Self {
            payload: AtomicUsize::new(0),
            meta: AtomicU64::new(0),
            writer: AtomicU64::new(NO_WRITER),
        }
    }

    #[inline]
    pub fn load_meta(&self, order: Ordering) -> Meta {
        Meta::unpack(self.meta.load(order))
    }

    #[inline]
    pub fn load_payload(&self, order: Ordering) -> usize {
        self.payload.load(order)
    }

    /// empty -> PUSHED, installing `(item, PUSHED, epoch-1)`.
    ///
    /// Succeeds only if the cell's current `valid_after` is strictly less
    /// than `epoch` (spec §4.A) and this call wins the publish-exclusivity
    /// token. Returns `Ok(())` on success, `Err(current)` with the observed
    /// meta otherwise so the caller can decide whether to retry with a
    /// fresh slot.
    pub fn try_push(&self, item: usize, epoch: u64) -> Result<(), Meta> {
        let current = self.load_meta(Ordering::Acquire);
        // A cell that has started freezing for migration must never accept
        // a fresh push: state literally resets to PUSHED below (a new
        // logical occupancy for this slot), which would otherwise clobber
        // an already-set MOVING bit and violate invariant 3.
        if current.valid_after >= epoch || current.has(MOVING) {
            return Err(current);
        }

        if self
            .writer
            .compare_exchange(NO_WRITER, epoch, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Someone else is mid-publish on this slot (or already lost and
            // is about to release); the caller restarts with a fresh slot.
            return Err(current);
        }

        // Exclusive until we clear `writer` below: safe to touch payload.
        self.payload.store(item, Ordering::Relaxed);

        let want = Meta {
            state: PUSHED,
            valid_after: epoch - 1,
        }
        .pack();
        let result = self.meta.compare_exchange(
            current.pack(),
            want,
            Ordering::Release,
            Ordering::Acquire,
        );

        self.writer.store(NO_WRITER, Ordering::Release);

        result.map(|_| ()).map_err(Meta::unpack)
    }

    /// PUSHED -> PUSHED|POPPED, preserving `valid_after`.
    pub fn try_pop(&self, expected: Meta) -> Result<(), Meta> {
        let want = Meta {
            state: expected.state | POPPED,
            valid_after: expected.valid_after,
        }
        .pack();
        match self.meta.compare_exchange(
            expected.pack(),
            want,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(actual) => Err(Meta::unpack(actual)),
        }
    }

    /// OR `MOVING` into the cell's state. Retries until observed set,
    /// returning the meta with `MOVING` present.
    pub fn mark_moving(&self) -> Meta {
        let mut current = self.load_meta(Ordering::Acquire);
        loop {
            if current.has(MOVING) {
                return current;
            }
            let want = Meta {
                state: current.state | MOVING,
                valid_after: current.valid_after,
            }
            .pack();
            match self.meta.compare_exchange_weak(
                current.pack(),
                want,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    current.state |= MOVING;
                    return current;
                }
                Err(actual) => current = Meta::unpack(actual),
            }
        }
    }

    /// OR `MOVED` into the cell's state. Retries until observed set.
    pub fn mark_moved(&self) {
        let mut current = self.load_meta(Ordering::Acquire);
        loop {
            if current.has(MOVED) {
                return;
            }
            let want = Meta {
                state: current.state | MOVED,
                valid_after: current.valid_after,
            }
            .pack();
            match self.meta.compare_exchange_weak(
                current.pack(),
                want,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = Meta::unpack(actual),
            }
        }
    }

    /// Used only by migration to populate a destination cell in a fresh
    /// successor store: CAS from empty straight to `(item, PUSHED, 0)`.
    /// All racing helpers write the same source item, so an unguarded
    /// payload store is harmless here; a helper that loses the meta CAS
    /// just confirms the destination already holds it (spec §4.F step 4).
    pub fn try_install_migrated(&self, item: usize) -> bool {
        self.payload.store(item, Ordering::Relaxed);
        let want = Meta {
            state: PUSHED,
            valid_after: 0,
        }
        .pack();
        self.meta
            .compare_exchange(0, want, Ordering::Release, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}
