//! Time management helper for scacchiera
//!
//! The scheduler measures a wall-clock budget from submission. The engine is
//! told to think for less than that, so a healthy engine answers before the
//! forfeit deadline even with process and pipe latency.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeManager {
    /// Reserved for spawn latency, pipe I/O and the reader thread
    pub move_overhead: Duration,
    /// Never ask the engine for less than this
    pub min_movetime: Duration,
}

impl Default for TimeManager {
    fn default() -> Self {
        Self {
            move_overhead: Duration::from_millis(100),
            min_movetime: Duration::from_millis(10),
        }
    }
}

impl TimeManager {
    pub fn new(move_overhead: Duration, min_movetime: Duration) -> Self {
        Self {
            move_overhead,
            min_movetime,
        }
    }

    /// `go movetime` for a request with the given budget
    pub fn engine_movetime(&self, budget: Duration) -> Duration {
        let usable = budget.saturating_sub(self.move_overhead);
        // Se il budget è più piccolo dell'overhead usiamo metà budget
        let usable = if usable.is_zero() { budget / 2 } else { usable };
        usable.max(self.min_movetime)
    }

    /// Per-move budget from a clock: remaining / moves-to-go plus most of
    /// the increment, with the usual default of 40 moves to go.
    pub fn budget_from_clock(
        &self,
        remaining: Duration,
        increment: Duration,
        moves_to_go: Option<u32>,
    ) -> Duration {
        let moves_to_go = moves_to_go.unwrap_or(40).max(2);
        let base = (remaining / moves_to_go).max(self.min_movetime);
        let bonus = increment * 8 / 10;
        (base + bonus).min(remaining.saturating_sub(self.move_overhead).max(self.min_movetime))
    }
}
