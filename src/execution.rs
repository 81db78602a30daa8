use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::mutant::Mutant;
use crate::suite::TestSuite;

/// A generated test: a named sequence of program actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    /// Unique name within a session.
    pub name: String,

    /// Statements in execution order.
    #[serde(default)]
    pub statements: Vec<String>,
}

/// What a single execution of a test observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionTrace {
    /// Mutants whose mutated instruction was reached.
    #[serde(default)]
    pub touched_mutants: BTreeSet<u64>,

    /// Infection distance already observed for a touched mutant.
    ///
    /// `0.0` means the values still matched after the mutated point.
    #[serde(default)]
    pub mutation_distances: BTreeMap<u64, f64>,

    /// Branch distance towards the `true` outcome, per branch id (0 = taken).
    #[serde(default)]
    pub true_distances: BTreeMap<u32, f64>,

    /// Branch distance towards the `false` outcome, per branch id (0 = taken).
    #[serde(default)]
    pub false_distances: BTreeMap<u32, f64>,

    /// Methods entered during the execution.
    #[serde(default)]
    pub covered_methods: BTreeSet<String>,
}

impl ExecutionTrace {
    /// Did the execution reach the given mutant?
    pub fn touches(&self, mutant_id: u64) -> bool {
        self.touched_mutants.contains(&mutant_id) || self.mutation_distances.contains_key(&mutant_id)
    }

    /// True when no mutant was reached at all.
    pub fn touched_nothing(&self) -> bool {
        self.touched_mutants.is_empty() && self.mutation_distances.is_empty()
    }

    /// Recorded infection distance for a mutant, if any.
    pub fn distance(&self, mutant_id: u64) -> Option<f64> {
        self.mutation_distances.get(&mutant_id).copied()
    }
}

/// Result of executing a test case against the original program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// How long the execution ran.
    #[serde(rename = "runtime_ms", with = "duration_ms")]
    pub runtime: Duration,

    /// Did the execution exceed its time budget?
    #[serde(default)]
    pub timeout: bool,

    /// Did the test use reflection to reach otherwise inaccessible code?
    #[serde(default)]
    pub called_reflection: bool,

    /// Trace collected during the execution.
    #[serde(default)]
    pub trace: ExecutionTrace,
}

/// Result of re-executing a test against a single mutant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MutantRun {
    /// How long the mutant run took.
    #[serde(rename = "runtime_ms", with = "duration_ms", default)]
    pub runtime: Duration,

    /// Did the run hang and get cut off?
    #[serde(default)]
    pub timed_out: bool,

    /// Did the observable outcome differ from the original program?
    #[serde(default)]
    pub killed: bool,

    /// Divergence observed when the mutant was not killed.
    #[serde(default)]
    pub distance: f64,
}

/// Executes tests against the original program and against mutants.
///
/// Implementations are expected to be deterministic: running the same test
/// against the same mutant twice should produce the same verdict.
pub trait TestExecutor {
    /// Execute a test against the original program.
    fn run_test(&self, test: &TestCase) -> Result<ExecutionResult>;

    /// Re-execute a test with `mutant` applied, within `budget`.
    fn run_against_mutant(&self, test: &TestCase, mutant: &Mutant, budget: Duration)
    -> Result<MutantRun>;
}

/// Execute every test in `suite` that has no cached result yet.
///
/// Returns the number of tests that were executed.
pub fn execute_suite<E: TestExecutor + ?Sized>(suite: &mut TestSuite, executor: &E) -> Result<usize> {
    let mut executed = 0;

    for chromosome in suite.tests.iter_mut() {
        if chromosome.last_result.is_some() {
            continue;
        }

        let result = executor
            .run_test(&chromosome.test)
            .with_context(|| format!("failed to execute test {:?}", chromosome.test.name))?;

        chromosome.last_result = Some(result);
        executed += 1;
    }

    Ok(executed)
}

mod duration_ms {
    use serde::ser::Error as _;

    use super::{Deserialize, Deserializer, Duration, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(d.as_millis())
            .map_err(|_| S::Error::custom(format!("duration {d:?} does not fit in u64 milliseconds")))?;
        s.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}
