//! Wait-free push mode's help-shift counter and randomized exponential
//! backoff (component H).
//!
//! After `RETRY_THRESHOLD` consecutive CAS failures a pusher escalates a
//! shared help-shift counter; other pushers observing a high shift value
//! back off for a randomized, exponentially growing window capped at
//! `MAX_BACKOFF_LOG` doublings of `BACKOFF_INCREMENT`. This converts the
//! base lock-free retry loop into the bounded-step guarantee spec §4.H
//! asks for. Mirrors the teacher's `SpinLock::lock_slow` spin-then-retry
//! shape (`sync.rs`), generalized with jitter so many backed-off pushers
//! don't resynchronize into the same retry cadence.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{BACKOFF_INCREMENT, MAX_BACKOFF_LOG, RETRY_THRESHOLD};
use crate::stat_inc;

/// Shared per-stack-handle counter dilating the help window (spec §3: "in
/// wait-free mode, an atomic counter used to dilate help windows").
pub struct HelpState {
    shift: AtomicU32,
}

impl HelpState {
    pub const fn new() -> Self {
        Self {
            shift: AtomicU32::new(0),
        }
    }

    /// Bump the shift counter; called once a pusher has exceeded
    /// `RETRY_THRESHOLD` consecutive CAS failures.
    pub fn escalate(&self) -> u32 {
        stat_inc!(help_escalations);
        self.shift.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn level(&self) -> u32 {
        self.shift.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.shift.store(0, Ordering::Relaxed);
    }
}

impl Default for HelpState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call retry/backoff state. Not shared across threads.
pub struct Backoff {
    attempts: u32,
    seed: u64,
}

impl Backoff {
    pub fn new(seed: u64) -> Self {
        // Never let the xorshift state settle at the absorbing zero state.
        Self {
            attempts: 0,
            seed: seed | 1,
        }
    }

    /// Number of consecutive failures seen so far in this call.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once the caller has failed enough times to escalate the help
    /// window (spec §4.H "after a threshold number of CAS failures").
    #[inline]
    pub fn should_escalate(&self) -> bool {
        self.attempts >= RETRY_THRESHOLD
    }

    /// Record one more failed attempt and spin for a randomized,
    /// exponentially growing window scaled by `help_level`. Under `std`,
    /// large windows yield the thread instead of busy-spinning the full
    /// duration.
    pub fn spin(&mut self, help_level: u32) {
        stat_inc!(backoff_spins);
        let exponent = self.attempts.min(MAX_BACKOFF_LOG);
        self.attempts += 1;

        let base = BACKOFF_INCREMENT.saturating_mul(1u32 << exponent);
        let scaled = base.saturating_add(help_level.saturating_mul(BACKOFF_INCREMENT));
        let jitter = (xorshift(&mut self.seed) % (scaled as u64 + 1)) as u32;
        let spins = scaled / 2 + jitter;

        #[cfg(feature = "std")]
        {
            if spins > BACKOFF_INCREMENT * (1 << MAX_BACKOFF_LOG) / 2 {
                std::thread::yield_now();
                return;
            }
        }
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }
}

#[inline]
fn xorshift(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}
