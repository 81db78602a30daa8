use std::sync::atomic::{AtomicU32, Ordering};

use crate::goal::GoalId;

/// Per-mutant timeout counters.
///
/// A mutant whose re-executions keep hanging is disabled once it reaches the
/// configured number of timeouts; scoring skips it from then on.
#[derive(Debug)]
pub struct MutationTimeouts {
    counts: Vec<AtomicU32>,
    threshold: u32,
}

impl MutationTimeouts {
    pub fn new(goal_count: usize, threshold: u32) -> Self {
        Self {
            counts: (0..goal_count).map(|_| AtomicU32::new(0)).collect(),
            threshold,
        }
    }

    /// Record one timeout. Returns true if this timeout disabled the mutant.
    pub fn record_timeout(&self, goal: GoalId) -> bool {
        let previous = self.counts[goal.index()].fetch_add(1, Ordering::AcqRel);
        previous.saturating_add(1) == self.threshold
    }

    pub fn timeouts(&self, goal: GoalId) -> u32 {
        self.counts[goal.index()].load(Ordering::Acquire)
    }

    pub fn is_disabled(&self, goal: GoalId) -> bool {
        self.threshold > 0 && self.timeouts(goal) >= self.threshold
    }

    pub fn disabled_count(&self) -> usize {
        (0..self.counts.len())
            .filter(|&i| self.is_disabled(GoalId::new(i)))
            .count()
    }
}
