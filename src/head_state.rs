//! Head-state word: the single source of truth for slot assignment
//! (component B).
//!
//! Bit layout is part of the spec's external contract (§6): bits 0..31 are
//! the next free index, bits 32..62 are the epoch, and bit 63 is the
//! store-moving flag. The all-ones word is reserved to mean "initializing".

use core::sync::atomic::{AtomicU64, Ordering};

use crate::fatal::fatal;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1u64 << INDEX_BITS) - 1;
const EPOCH_BITS: u32 = 30;
const EPOCH_SHIFT: u32 = INDEX_BITS;
const EPOCH_MASK: u64 = ((1u64 << EPOCH_BITS) - 1) << EPOCH_SHIFT;
const MOVING_BIT: u64 = 1 << 63;

/// Reserved pattern published by the creator of a store before it installs
/// the first real head-state value.
pub const INITIALIZING: u64 = u64::MAX;

/// Index values above this are refused: spec §7 treats capacity overflow
/// beyond 2^31 slots as fatal.
pub const MAX_INDEX: u32 = 1 << 31;
/// Epoch values above this are refused: spec §7 treats epoch overflow as
/// fatal. The real ceiling is the 30-bit epoch subfield's own range, which
/// is stricter than the spec's nominal 2^31 and is what actually bounds a
/// long-lived store (capacity oscillating via push/pop with no migration
/// ever resetting the epoch).
pub const MAX_EPOCH: u64 = (1u64 << EPOCH_BITS) - 1;

/// Decoded view of a head-state word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub index: u32,
    pub epoch: u64,
    pub moving: bool,
}

impl Decoded {
    #[inline]
    fn pack(self) -> u64 {
        debug_assert!((self.index as u64) <= INDEX_MASK);
        debug_assert!(self.epoch <= (EPOCH_MASK >> EPOCH_SHIFT));
        (self.index as u64)
            | (self.epoch << EPOCH_SHIFT)
            | if self.moving { MOVING_BIT } else { 0 }
    }

    #[inline]
    fn unpack(word: u64) -> Self {
        Self {
            index: (word & INDEX_MASK) as u32,
            epoch: (word & EPOCH_MASK) >> EPOCH_SHIFT,
            moving: word & MOVING_BIT != 0,
        }
    }
}

/// Atomic `(index, epoch, moving)` word driving slot assignment.
pub struct HeadState(AtomicU64);

impl HeadState {
    pub const fn new_initializing() -> Self {
        Self(AtomicU64::new(INITIALIZING))
    }

    pub const fn new_ready(index: u32, epoch: u64) -> Self {
        // Pack manually: `Decoded::pack` isn't const-fn-friendly with
        // `debug_assert!`, and this path is only used for tests/const init.
        Self(AtomicU64::new((index as u64) | (epoch << EPOCH_SHIFT)))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> Decoded {
        Decoded::unpack(self.0.load(order))
    }

    /// First successful CAS from `INITIALIZING` installs `(epoch=0, index=0)`.
    pub fn try_complete_init(&self) -> bool {
        self.0
            .compare_exchange(
                INITIALIZING,
                Decoded {
                    index: 0,
                    epoch: 0,
                    moving: false,
                }
                .pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Attempt to reserve the next push slot: `(epoch+1, index+1)`.
    /// Returns the pre-CAS decoded word (with `index` being the slot the
    /// caller now owns) on success.
    pub fn try_reserve_push(&self, current: Decoded, capacity: u32) -> Result<Decoded, Decoded> {
        debug_assert!(!current.moving);
        debug_assert!(current.index < capacity);
        let next_epoch = current.epoch + 1;
        if next_epoch > MAX_EPOCH {
            fatal("head-state epoch overflow");
        }
        let next = Decoded {
            index: current.index + 1,
            epoch: next_epoch,
            moving: false,
        };
        match self.0.compare_exchange(
            current.pack(),
            next.pack(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(current),
            Err(actual) => Err(Decoded::unpack(actual)),
        }
    }

    /// Attempt to reserve the next pop slot: `(epoch+1, index-1)`.
    pub fn try_reserve_pop(&self, current: Decoded) -> Result<Decoded, Decoded> {
        debug_assert!(current.index > 0);
        let next_epoch = current.epoch + 1;
        if next_epoch > MAX_EPOCH {
            fatal("head-state epoch overflow");
        }
        let next = Decoded {
            index: current.index - 1,
            epoch: next_epoch,
            moving: false,
        };
        match self.0.compare_exchange(
            current.pack(),
            next.pack(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(next),
            Err(actual) => Err(Decoded::unpack(actual)),
        }
    }

    /// Advance a freshly built (still `(0, 0)`) store's head past the
    /// cells migration already populated. Safe to call redundantly from
    /// any number of concurrent helpers: `index` is a pure function of the
    /// frozen source store's cell states, so every helper computes the same
    /// value (spec §4.F step 5). CASes from the pristine `(0, 0)` word
    /// rather than storing unconditionally, so a straggler helper that is
    /// still finishing its own (redundant) copy pass after the successor
    /// has already gone live and advanced further can't roll head back
    /// down and clobber real pushes/pops that happened in the meantime.
    pub fn seed_migrated(&self, index: u32) {
        let word = Decoded {
            index,
            epoch: 0,
            moving: false,
        }
        .pack();
        let _ = self.0.compare_exchange(0, word, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Atomically OR the moving flag on, preserving index/epoch.
    pub fn try_set_moving(&self, current: Decoded) -> Result<Decoded, Decoded> {
        if current.moving {
            return Ok(current);
        }
        let next = Decoded {
            moving: true,
            ..current
        };
        match self.0.compare_exchange(
            current.pack(),
            next.pack(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(next),
            Err(actual) => Err(Decoded::unpack(actual)),
        }
    }
}
