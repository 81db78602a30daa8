use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::branch::StructuralFitness;
use crate::fitness::{MutationSuiteFitness, SuiteScore};
use crate::goal::{GoalId, GoalRegistry};
use crate::mutant::Mutant;
use crate::suite::TestSuite;

/// Outcome of one suite in a scoring run, as reported onto the suite.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub name: String,

    /// Number of tests in the suite.
    pub tests: usize,

    /// Fitness, if the suite could be scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,

    /// Session-wide coverage after this suite.
    pub coverage: f64,

    /// Goals solved so far in the session.
    pub killed: usize,

    /// Goals this suite was the first to kill.
    pub newly_killed: usize,

    /// Number of (test, goal) pairs whose distance was resolved.
    pub checked: usize,

    /// The suite was charged the worst-case fitness.
    pub timed_out: bool,

    /// Killed mutants per test name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub killers: BTreeMap<String, Vec<u64>>,

    /// Why the suite could not be scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuiteReport {
    pub fn scored(suite: &TestSuite, goals: &GoalRegistry, score: &SuiteScore) -> Self {
        let killers = suite
            .tests
            .iter()
            .filter(|t| !t.covered_goals.is_empty())
            .map(|t| {
                let mutants = t
                    .covered_goals
                    .iter()
                    .map(|&g| goals.get(g).mutant.id)
                    .collect();
                (t.test.name.clone(), mutants)
            })
            .collect();

        Self {
            name: suite.name.clone(),
            tests: suite.len(),
            fitness: suite.fitness,
            coverage: suite.coverage,
            killed: suite.covered_goals,
            newly_killed: suite.newly_killed,
            checked: score.checked,
            timed_out: score.timed_out,
            killers,
            error: None,
        }
    }

    pub fn failed(suite: &TestSuite, error: String) -> Self {
        Self {
            name: suite.name.clone(),
            tests: suite.len(),
            fitness: None,
            coverage: 0.0,
            killed: 0,
            newly_killed: 0,
            checked: 0,
            timed_out: false,
            killers: BTreeMap::new(),
            error: Some(error),
        }
    }
}

/// Final state of one mutation goal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Killed by some suite of the run.
    Killed,

    /// Still open.
    Open,

    /// Disabled after repeated timeouts.
    Disabled,
}

/// Final state of one mutation goal, with the best test the archive kept for it.
#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    pub goal: GoalId,
    pub mutant: Mutant,
    pub status: GoalStatus,

    /// Lowest penalty recorded in the archive (0 when killed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_value: Option<f64>,

    /// Test that reached `best_value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_test: Option<String>,
}

/// Summary counts for a scoring run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EvaluationSummary {
    /// Suites scored successfully.
    pub scored: usize,

    /// Suites that could not be scored.
    pub failed: usize,

    /// Suites charged the worst-case fitness.
    pub timed_out: usize,

    pub total_goals: usize,
    pub killed: usize,
    pub open: usize,
    pub disabled: usize,

    /// `killed / total_goals`.
    pub coverage: f64,

    /// Lowest fitness among scored suites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_fitness: Option<f64>,
}

impl EvaluationSummary {
    pub fn from_run(suites: &[SuiteReport], goals: &[GoalReport]) -> Self {
        let scored: Vec<&SuiteReport> = suites.iter().filter(|s| s.fitness.is_some()).collect();
        let count = |status| goals.iter().filter(|g| g.status == status).count();

        let killed = count(GoalStatus::Killed);
        let coverage = if goals.is_empty() {
            1.0
        } else {
            killed as f64 / goals.len() as f64
        };

        Self {
            scored: scored.len(),
            failed: suites.len() - scored.len(),
            timed_out: scored.iter().filter(|s| s.timed_out).count(),
            total_goals: goals.len(),
            killed,
            open: count(GoalStatus::Open),
            disabled: count(GoalStatus::Disabled),
            coverage,
            best_fitness: scored.iter().filter_map(|s| s.fitness).reduce(f64::min),
        }
    }
}

/// Collect the final state of every goal.
pub fn goal_reports<S: StructuralFitness>(fitness: &MutationSuiteFitness<'_, S>) -> Vec<GoalReport> {
    fitness
        .goals()
        .iter()
        .map(|goal| {
            let status = if !fitness.is_open(goal.id) {
                GoalStatus::Killed
            } else if fitness.timeouts().is_disabled(goal.id) {
                GoalStatus::Disabled
            } else {
                GoalStatus::Open
            };

            GoalReport {
                goal: goal.id,
                mutant: goal.mutant.clone(),
                status,
                best_value: fitness.archive().best_value(goal.id),
                best_test: fitness.archive().solution(goal.id).map(|t| t.name.clone()),
            }
        })
        .collect()
}

/// Machine-readable report for a scoring run.
///
/// In `--json` mode we print this to stdout as pretty JSON.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    /// Tool name, stable across versions.
    pub tool: &'static str,

    /// Current crate version.
    pub version: &'static str,

    /// The session file used for this run.
    pub session: PathBuf,

    pub summary: EvaluationSummary,

    pub suites: Vec<SuiteReport>,

    pub goals: Vec<GoalReport>,

    /// Optional high-level error message (for example a session that failed to load).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationReport {
    pub fn success(session: PathBuf, suites: Vec<SuiteReport>, goals: Vec<GoalReport>) -> Self {
        Self {
            tool: "mutant-fitness",
            version: env!("CARGO_PKG_VERSION"),
            session,
            summary: EvaluationSummary::from_run(&suites, &goals),
            suites,
            goals,
            error: None,
        }
    }

    pub fn failure(session: PathBuf, error: String) -> Self {
        Self {
            tool: "mutant-fitness",
            version: env!("CARGO_PKG_VERSION"),
            session,
            summary: EvaluationSummary::default(),
            suites: Vec::new(),
            goals: Vec::new(),
            error: Some(error),
        }
    }
}
