use std::collections::BTreeSet;
use std::sync::Arc;

use crate::execution::{ExecutionResult, TestCase};
use crate::goal::GoalId;

/// A test case inside a candidate suite, with its cached execution result.
#[derive(Debug, Clone)]
pub struct TestChromosome {
    /// The test itself, shared between suites.
    pub test: Arc<TestCase>,

    /// Result of the most recent execution, if the test has been run.
    pub last_result: Option<ExecutionResult>,

    /// Mutation goals this test killed during scoring.
    pub covered_goals: BTreeSet<GoalId>,
}

impl TestChromosome {
    pub fn new(test: Arc<TestCase>) -> Self {
        Self {
            test,
            last_result: None,
            covered_goals: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub fn with_result(test: Arc<TestCase>, result: ExecutionResult) -> Self {
        Self {
            test,
            last_result: Some(result),
            covered_goals: BTreeSet::new(),
        }
    }
}

/// Candidate test suite being ranked by the search.
///
/// Scoring never reorders `tests`; it only fills in the fitness fields.
#[derive(Debug, Clone)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestChromosome>,

    /// Fitness from the last scoring (lower is better, 0 is perfect).
    pub fitness: Option<f64>,

    /// Share of all mutation goals solved so far in the session.
    pub coverage: f64,

    /// Number of mutation goals solved so far in the session.
    pub covered_goals: usize,

    /// Number of goals this suite was the first to kill.
    pub newly_killed: usize,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, tests: Vec<TestChromosome>) -> Self {
        Self {
            name: name.into(),
            tests,
            fitness: None,
            coverage: 0.0,
            covered_goals: 0,
            newly_killed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Results of all executed tests, in suite order.
    pub fn results(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.tests.iter().filter_map(|t| t.last_result.as_ref())
    }

    /// Does any contained test report a timeout?
    pub fn has_timeout(&self) -> bool {
        self.results().any(|r| r.timeout)
    }
}
