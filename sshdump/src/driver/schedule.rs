//! Fixed-period cycle schedule.
//!
//! Ticks fall on `start + n * period`. A cycle that runs past one or more
//! boundaries gets a single catch-up tick immediately; the remaining missed
//! boundaries are dropped and the schedule continues at the next boundary
//! after `now`. Ticks are never queued.

use std::time::Duration;

use tokio::time::Instant;

use crate::transport::deadline_after;

/// The next time a cycle should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// When to start the cycle.
    pub at: Instant,

    /// Boundaries that passed without a cycle and will not be run.
    pub skipped: u64,
}

/// Computes tick times for a fixed period.
#[derive(Debug, Clone)]
pub struct Schedule {
    period: Duration,
    next: Instant,
}

impl Schedule {
    /// First tick is one full period after `start`.
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            period,
            next: deadline_after(start, period),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The tick to wait for, given the current time.
    pub fn next_tick(&mut self, now: Instant) -> Tick {
        if self.next >= now {
            let at = self.next;
            self.next = deadline_after(self.next, self.period);
            return Tick { at, skipped: 0 };
        }

        let period = self.period.as_nanos().max(1);
        let behind = (now - self.next).as_nanos();
        let skipped = behind / period;
        let advance = period.saturating_mul(skipped + 1);
        let advance = Duration::from_nanos(u64::try_from(advance).unwrap_or(u64::MAX));
        self.next = deadline_after(self.next, advance);

        Tick {
            at: now,
            skipped: u64::try_from(skipped).unwrap_or(u64::MAX),
        }
    }
}
