use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::execution::TestCase;
use crate::goal::GoalId;

/// Best value recorded for one goal across the whole search.
#[derive(Debug)]
struct GoalRecord {
    solved: AtomicBool,
    /// `f64` bits of the lowest value seen so far; starts at `+inf`.
    best: AtomicU64,
    best_test: Mutex<Option<Arc<TestCase>>>,
}

impl GoalRecord {
    fn new() -> Self {
        Self {
            solved: AtomicBool::new(false),
            best: AtomicU64::new(f64::INFINITY.to_bits()),
            best_test: Mutex::new(None),
        }
    }
}

/// Outcome of [`CoverageArchive::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUpdate {
    /// The value did not improve on the recorded best.
    Unchanged,
    /// The value is the new best partial solution.
    Improved,
    /// The goal was solved by this update.
    Solved,
}

/// Goals solved by any suite evaluated so far, plus the best partial value
/// and test seen for each goal.
///
/// Shared by every evaluation in a search session. All updates are per-goal
/// compare-and-set: the solved flag only ever goes from false to true, and
/// the best value only ever decreases.
#[derive(Debug)]
pub struct CoverageArchive {
    records: Vec<GoalRecord>,
}

impl CoverageArchive {
    pub fn new(goal_count: usize) -> Self {
        Self {
            records: (0..goal_count).map(|_| GoalRecord::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_solution(&self, goal: GoalId) -> bool {
        self.records[goal.index()].solved.load(Ordering::Acquire)
    }

    /// Record that `test` reached `value` for `goal` (0 means solved).
    pub fn update(&self, goal: GoalId, test: &Arc<TestCase>, value: f64) -> ArchiveUpdate {
        let record = &self.records[goal.index()];

        if !self.lower_best(record, value) {
            return ArchiveUpdate::Unchanged;
        }

        {
            let mut best_test = record.best_test.lock();
            // A concurrent writer may have stored an even lower value meanwhile.
            if f64::from_bits(record.best.load(Ordering::Acquire)) == value {
                *best_test = Some(Arc::clone(test));
            }
        }

        if value == 0.0
            && record
                .solved
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            return ArchiveUpdate::Solved;
        }

        ArchiveUpdate::Improved
    }

    /// Lowest value recorded for `goal`, if any.
    pub fn best_value(&self, goal: GoalId) -> Option<f64> {
        let value = f64::from_bits(self.records[goal.index()].best.load(Ordering::Acquire));
        value.is_finite().then_some(value)
    }

    /// Test that reached the best value for `goal`.
    pub fn solution(&self, goal: GoalId) -> Option<Arc<TestCase>> {
        self.records[goal.index()].best_test.lock().clone()
    }

    pub fn solved_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.solved.load(Ordering::Acquire))
            .count()
    }

    /// Store `value` if it is strictly lower than the current best.
    fn lower_best(&self, record: &GoalRecord, value: f64) -> bool {
        let mut current = record.best.load(Ordering::Acquire);
        loop {
            if value >= f64::from_bits(current) {
                return false;
            }
            match record.best.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}
