use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use serde::Serialize;

use crate::archive::CoverageArchive;
use crate::branch::StructuralFitness;
use crate::distance::normalize;
use crate::execution::TestExecutor;
use crate::goal::{GoalId, GoalRegistry, GoalVerdict};
use crate::options::FitnessOptions;
use crate::prioritize::prioritize_tests;
use crate::suite::TestSuite;
use crate::timeouts::MutationTimeouts;

/// Contribution of a goal that no test of the suite reached.
pub const UNTOUCHED_PENALTY: f64 = 3.0;

/// Errors raised while scoring a suite.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    /// A test was scored before it was executed.
    #[error("test #{index} ({test:?}) has no execution result; execute the suite before scoring it")]
    NotExecuted { index: usize, test: String },

    /// Re-executing a test against a mutant failed.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

/// Outcome of scoring one suite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuiteScore {
    /// Lower is better; 0 means full structural coverage and every goal killed.
    pub fitness: f64,

    /// Goals solved so far in the session, including by earlier suites.
    pub killed: usize,

    /// Goals this suite was the first to kill.
    pub newly_killed: usize,

    /// Number of goals in the session.
    pub total_goals: usize,

    /// Number of (test, goal) pairs whose distance was resolved.
    pub checked: usize,

    /// `killed / total_goals`.
    pub coverage: f64,

    /// The suite was charged the worst-case fitness because something hung.
    pub timed_out: bool,
}

/// Per-suite bookkeeping of one ordered sweep.
#[derive(Debug, Default)]
struct Sweep {
    best: BTreeMap<GoalId, f64>,
    covered: Vec<(usize, GoalId)>,
    newly_killed: usize,
    checked: usize,
    timed_out: bool,
}

/// Strong-mutation fitness for test suites.
///
/// One instance lives for a whole search session: the set of open goals,
/// the coverage archive and the timeout counters are shared by every suite
/// it scores, so a goal killed by one suite no longer counts against later
/// ones. Scoring only needs `&self`; suites may be scored from several
/// threads at once.
#[derive(Debug)]
pub struct MutationSuiteFitness<'g, S> {
    goals: &'g GoalRegistry,
    structural: S,
    archive: Arc<CoverageArchive>,
    timeouts: MutationTimeouts,
    open: Vec<AtomicBool>,
    options: FitnessOptions,
}

impl<'g, S: StructuralFitness> MutationSuiteFitness<'g, S> {
    pub fn new(goals: &'g GoalRegistry, structural: S, options: FitnessOptions) -> Self {
        let archive = Arc::new(CoverageArchive::new(goals.len()));
        Self::with_archive(goals, structural, archive, options)
    }

    /// Use an archive shared with other fitness functions of the session.
    pub fn with_archive(
        goals: &'g GoalRegistry,
        structural: S,
        archive: Arc<CoverageArchive>,
        options: FitnessOptions,
    ) -> Self {
        debug_assert_eq!(archive.len(), goals.len(), "archive must cover every goal");

        Self {
            goals,
            structural,
            archive,
            timeouts: MutationTimeouts::new(goals.len(), options.mutation_timeouts),
            open: (0..goals.len()).map(|_| AtomicBool::new(true)).collect(),
            options,
        }
    }

    pub fn goals(&self) -> &GoalRegistry {
        self.goals
    }

    pub fn archive(&self) -> &Arc<CoverageArchive> {
        &self.archive
    }

    pub fn timeouts(&self) -> &MutationTimeouts {
        &self.timeouts
    }

    pub fn is_open(&self, goal: GoalId) -> bool {
        self.open[goal.index()].load(Ordering::Acquire)
    }

    pub fn open_goals(&self) -> impl Iterator<Item = GoalId> + '_ {
        (0..self.open.len())
            .map(GoalId::new)
            .filter(|&g| self.is_open(g))
    }

    pub fn open_goal_count(&self) -> usize {
        self.open_goals().count()
    }

    /// Goals removed from the open set so far (killed here or solved in the archive).
    pub fn killed_count(&self) -> usize {
        self.open.len() - self.open_goal_count()
    }

    pub fn coverage(&self) -> f64 {
        if self.open.is_empty() {
            return 1.0;
        }
        self.killed_count() as f64 / self.open.len() as f64
    }

    /// Fitness charged to a suite that contains a hung execution.
    pub fn worst_case_fitness(&self) -> f64 {
        self.structural.max_fitness() + UNTOUCHED_PENALTY * self.open_goal_count() as f64
    }

    /// Score `suite` and attach the result to it.
    ///
    /// Every test must already carry an execution result.
    pub fn score<E: TestExecutor + ?Sized>(
        &self,
        suite: &mut TestSuite,
        executor: &E,
    ) -> Result<SuiteScore, FitnessError> {
        let order = prioritize_tests(suite)?;

        // Goals solved through a shared archive are no longer open.
        self.close_archived();

        if suite.has_timeout() {
            debug!("suite {:?} contains a timed-out test", suite.name);
            let score = self.timed_out_score(0, 0);
            info!(
                "suite {:?} timed out, setting fitness to max value {}",
                suite.name, score.fitness
            );
            report_fitness(suite, &score);
            return Ok(score);
        }

        // Reflection-only tests still count for structural coverage.
        let baseline = self.structural.fitness(suite);
        let sweep = self.sweep(suite, &order, executor)?;

        for &(index, goal) in &sweep.covered {
            suite.tests[index].covered_goals.insert(goal);
        }

        let score = if sweep.timed_out {
            info!(
                "suite {:?} hung while executing a mutant, setting fitness to max value",
                suite.name
            );
            self.timed_out_score(sweep.newly_killed, sweep.checked)
        } else {
            let fitness = baseline + sweep.best.values().sum::<f64>();
            SuiteScore {
                fitness,
                killed: self.killed_count(),
                newly_killed: sweep.newly_killed,
                total_goals: self.goals.len(),
                checked: sweep.checked,
                coverage: self.coverage(),
                timed_out: false,
            }
        };

        debug!(
            "mutants killed: {}, checked: {}, goals: {}, archived: {}, disabled: {}",
            score.killed,
            score.checked,
            score.total_goals,
            self.archive.solved_count(),
            self.timeouts.disabled_count()
        );

        report_fitness(suite, &score);
        Ok(score)
    }

    fn timed_out_score(&self, newly_killed: usize, checked: usize) -> SuiteScore {
        SuiteScore {
            fitness: self.worst_case_fitness(),
            killed: self.killed_count(),
            newly_killed,
            total_goals: self.goals.len(),
            checked,
            coverage: 0.0,
            timed_out: true,
        }
    }

    fn close_archived(&self) {
        for goal in self.open_goals() {
            if self.archive.has_solution(goal) {
                self.close(goal);
            }
        }
    }

    /// Returns true if this call removed `goal` from the open set.
    fn close(&self, goal: GoalId) -> bool {
        self.open[goal.index()].swap(false, Ordering::AcqRel)
    }

    fn sweep<E: TestExecutor + ?Sized>(
        &self,
        suite: &TestSuite,
        order: &[usize],
        executor: &E,
    ) -> Result<Sweep, FitnessError> {
        let mut sweep = Sweep::default();

        for goal in self.open_goals() {
            if self.archive.has_solution(goal) {
                self.close(goal);
                continue;
            }
            sweep.best.insert(goal, UNTOUCHED_PENALTY);
        }
        let candidates: Vec<GoalId> = sweep.best.keys().copied().collect();

        for &index in order {
            let chromosome = &suite.tests[index];
            let Some(result) = chromosome.last_result.as_ref() else {
                continue;
            };

            // Private reflection can kill mutants through calls no real
            // client could make.
            if result.called_reflection {
                debug!("skipping test {:?}: it used reflection", chromosome.test.name);
                continue;
            }

            let trace = &result.trace;
            if trace.touched_nothing() {
                continue;
            }
            debug!(
                "test {:?} touched {} mutants",
                chromosome.test.name,
                trace.touched_mutants.len().max(trace.mutation_distances.len())
            );

            for &id in &candidates {
                if !self.is_open(id) {
                    continue;
                }

                if self.archive.has_solution(id) {
                    self.close(id);
                    sweep.best.insert(id, 0.0);
                    continue;
                }

                let goal = self.goals.get(id);
                if self.timeouts.is_disabled(id) {
                    debug!("skipping timed out mutant {}", goal.mutant.id);
                    continue;
                }

                if !trace.touches(goal.mutant.id) {
                    continue;
                }
                sweep.checked += 1;

                let magnitude = match trace.distance(goal.mutant.id) {
                    Some(d) if d > 0.0 => d,
                    _ => match goal.evaluate(
                        &chromosome.test,
                        result,
                        executor,
                        &self.options,
                        &self.timeouts,
                    )? {
                        GoalVerdict::Distance(d) => d,
                        GoalVerdict::TimedOut => {
                            sweep.timed_out = true;
                            return Ok(sweep);
                        }
                    },
                };

                let penalty = if magnitude == 0.0 {
                    if self.close(id) {
                        sweep.newly_killed += 1;
                    }
                    sweep.covered.push((index, id));
                    0.0
                } else {
                    1.0 + normalize(magnitude)
                };

                if self.options.test_archive {
                    self.archive.update(id, &chromosome.test, penalty);
                }

                if let Some(best) = sweep.best.get_mut(&id) {
                    *best = best.min(penalty);
                }
            }
        }

        // Goals closed while the sweep ran, here or by a concurrent
        // evaluation, count as solved.
        for (&id, best) in sweep.best.iter_mut() {
            if !self.is_open(id) {
                *best = 0.0;
            }
        }

        Ok(sweep)
    }
}

/// Attach a score to the suite it was computed for.
pub fn report_fitness(suite: &mut TestSuite, score: &SuiteScore) {
    suite.fitness = Some(score.fitness);
    suite.coverage = score.coverage;
    suite.covered_goals = score.killed;
    suite.newly_killed = score.newly_killed;
}
