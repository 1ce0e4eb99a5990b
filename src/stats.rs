//! Stack operation counters.
//!
//! All counters use `Relaxed` ordering — they are observational only and
//! not used as synchronization primitives. The stack's own CAS loops
//! provide the ordering guarantees for correctness; these counters are
//! purely for monitoring.
//!
//! # Usage
//!
//! ```ignore
//! let snap = hatstack::stats::snapshot();
//! println!("pushes: {}", snap.pushes);
//! ```
//!
//! Obtain a [`Snapshot`] with [`snapshot()`]. Individual counter loads are
//! individually atomic but not globally consistent with each other.

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    /// Successful `push` calls.
    pub pushes: AtomicU64,
    /// Successful `pop` calls that returned an item.
    pub pops: AtomicU64,
    /// `pop` calls that observed the stack empty at linearization.
    pub empty_pops: AtomicU64,
    /// Migrations a thread initiated (set the moving flag).
    pub migrations_started: AtomicU64,
    /// Migrations a thread observed complete (successor published).
    pub migrations_completed: AtomicU64,
    /// Successful view claims.
    pub view_claims: AtomicU64,
    /// Times a pusher escalated to the wait-free help path after exceeding
    /// `RETRY_THRESHOLD` CAS failures.
    pub help_escalations: AtomicU64,
    /// Times the wait-free backoff loop spun waiting on a help window.
    pub backoff_spins: AtomicU64,
    /// Retired stores leaked because the hazard table had no free slot.
    pub retired_leaked: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            pushes: AtomicU64::new(0),
            pops: AtomicU64::new(0),
            empty_pops: AtomicU64::new(0),
            migrations_started: AtomicU64::new(0),
            migrations_completed: AtomicU64::new(0),
            view_claims: AtomicU64::new(0),
            help_escalations: AtomicU64::new(0),
            backoff_spins: AtomicU64::new(0),
            retired_leaked: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time snapshot of all stack operation counters.
///
/// Fields are plain `u64` values loaded from the global atomic counters.
/// Individual fields are each atomically read, but the snapshot as a whole
/// is not globally consistent — concurrent operations may race between
/// loads. For monitoring purposes this is always sufficient.
///
/// Obtain a snapshot with [`snapshot()`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub pushes: u64,
    pub pops: u64,
    pub empty_pops: u64,
    pub migrations_started: u64,
    pub migrations_completed: u64,
    pub view_claims: u64,
    pub help_escalations: u64,
    pub backoff_spins: u64,
    pub retired_leaked: u64,
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        pushes: s.pushes.load(Ordering::Relaxed),
        pops: s.pops.load(Ordering::Relaxed),
        empty_pops: s.empty_pops.load(Ordering::Relaxed),
        migrations_started: s.migrations_started.load(Ordering::Relaxed),
        migrations_completed: s.migrations_completed.load(Ordering::Relaxed),
        view_claims: s.view_claims.load(Ordering::Relaxed),
        help_escalations: s.help_escalations.load(Ordering::Relaxed),
        backoff_spins: s.backoff_spins.load(Ordering::Relaxed),
        retired_leaked: s.retired_leaked.load(Ordering::Relaxed),
    }
}
