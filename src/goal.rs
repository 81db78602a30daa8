use std::collections::HashMap;
use std::fmt;

use anyhow::{Result, bail};
use log::{debug, warn};
use serde::Serialize;

use crate::execution::{ExecutionResult, TestCase, TestExecutor};
use crate::mutant::Mutant;
use crate::options::FitnessOptions;
use crate::timeouts::MutationTimeouts;

/// Distance reported for a surviving mutant whose run showed no divergence.
///
/// Keeps survivors strictly apart from killed mutants (distance 0).
pub const MIN_SURVIVOR_DISTANCE: f64 = 1e-6;

/// Dense index of a mutation goal in its [`GoalRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GoalId(usize);

impl GoalId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Verdict of evaluating one test against one mutant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalVerdict {
    /// Divergence magnitude; 0 means the mutant was killed.
    Distance(f64),

    /// The mutant run exceeded its budget.
    TimedOut,
}

/// The goal of killing one mutant.
#[derive(Debug, Clone)]
pub struct MutationGoal {
    pub id: GoalId,
    pub mutant: Mutant,
}

impl MutationGoal {
    /// Re-execute `test` against this goal's mutant and measure how close it
    /// came to being killed.
    ///
    /// The run is bounded by a budget derived from the original runtime in
    /// `result`. A run that exceeds it counts as a timeout against the mutant.
    pub fn evaluate<E: TestExecutor + ?Sized>(
        &self,
        test: &TestCase,
        result: &ExecutionResult,
        executor: &E,
        options: &FitnessOptions,
        timeouts: &MutationTimeouts,
    ) -> Result<GoalVerdict> {
        let budget = options.mutant_budget(result.runtime);

        debug!(
            "executing test {:?} against mutant {} ({})",
            test.name,
            self.mutant.id,
            self.mutant.location()
        );
        let run = executor.run_against_mutant(test, &self.mutant, budget)?;

        if run.timed_out || run.runtime > budget {
            if timeouts.record_timeout(self.id) {
                warn!(
                    "mutant {} disabled after {} timeouts",
                    self.mutant.id,
                    timeouts.timeouts(self.id)
                );
            }
            return Ok(GoalVerdict::TimedOut);
        }

        if run.killed {
            return Ok(GoalVerdict::Distance(0.0));
        }

        if run.distance.is_nan() || run.distance < 0.0 {
            bail!(
                "mutant {} reported invalid distance {} for test {:?}",
                self.mutant.id,
                run.distance,
                test.name
            );
        }

        Ok(GoalVerdict::Distance(run.distance.max(MIN_SURVIVOR_DISTANCE)))
    }
}

/// All mutation goals of a search session.
#[derive(Debug, Clone, Default)]
pub struct GoalRegistry {
    goals: Vec<MutationGoal>,
    by_mutant: HashMap<u64, GoalId>,
}

impl GoalRegistry {
    /// Build one goal per mutant. Mutant ids must be unique.
    pub fn from_mutants(mutants: impl IntoIterator<Item = Mutant>) -> Result<Self> {
        let mut registry = Self::default();

        for mutant in mutants {
            let id = GoalId::new(registry.goals.len());
            if registry.by_mutant.insert(mutant.id, id).is_some() {
                bail!("duplicate mutant id {}", mutant.id);
            }
            registry.goals.push(MutationGoal { id, mutant });
        }

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn get(&self, id: GoalId) -> &MutationGoal {
        &self.goals[id.index()]
    }

    pub fn for_mutant(&self, mutant_id: u64) -> Option<&MutationGoal> {
        self.by_mutant.get(&mutant_id).map(|&id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MutationGoal> {
        self.goals.iter()
    }
}
