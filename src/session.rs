use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::branch::BranchCoverageFitness;
use crate::execution::{ExecutionResult, MutantRun, TestCase, TestExecutor};
use crate::goal::GoalRegistry;
use crate::mutant::Mutant;
use crate::suite::{TestChromosome, TestSuite};

/// On-disk description of a search session: mutants, recorded test
/// executions and the candidate suites to score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    /// Number of branches in the program under test.
    #[serde(default)]
    pub branches: u32,

    /// Methods of the program under test.
    #[serde(default)]
    pub methods: Vec<String>,

    pub mutants: Vec<Mutant>,

    pub tests: Vec<RecordedTest>,

    pub suites: Vec<SuiteSpec>,
}

/// A test together with its recorded executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTest {
    #[serde(flatten)]
    pub test: TestCase,

    /// Execution against the original program.
    pub result: ExecutionResult,

    /// Executions against individual mutants, keyed by mutant id.
    #[serde(default)]
    pub mutant_runs: BTreeMap<u64, MutantRun>,
}

/// A candidate suite, by test name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub name: String,

    #[serde(default)]
    pub tests: Vec<String>,
}

/// Executor that replays recorded executions instead of running code.
#[derive(Debug, Clone, Default)]
pub struct ReplayExecutor {
    results: HashMap<String, ExecutionResult>,
    mutant_runs: HashMap<(String, u64), MutantRun>,
}

impl TestExecutor for ReplayExecutor {
    fn run_test(&self, test: &TestCase) -> Result<ExecutionResult> {
        self.results
            .get(&test.name)
            .cloned()
            .with_context(|| format!("no recorded execution for test {:?}", test.name))
    }

    fn run_against_mutant(&self, test: &TestCase, mutant: &Mutant, _budget: Duration) -> Result<MutantRun> {
        self.mutant_runs
            .get(&(test.name.clone(), mutant.id))
            .cloned()
            .with_context(|| {
                format!(
                    "no recorded run of test {:?} against mutant {}",
                    test.name, mutant.id
                )
            })
    }
}

/// A loaded and validated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// File the session was loaded from.
    pub path: PathBuf,

    pub structural: BranchCoverageFitness,

    pub goals: GoalRegistry,

    /// All tests, in file order.
    pub tests: Vec<Arc<TestCase>>,

    pub suites: Vec<SuiteSpec>,

    executor: ReplayExecutor,
}

impl Session {
    /// Read and validate a session file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {:?}", path))?;
        let file: SessionFile = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse session file {:?}", path))?;

        Self::from_file(path.to_path_buf(), file)
    }

    pub fn from_file(path: PathBuf, file: SessionFile) -> Result<Self> {
        let goals = GoalRegistry::from_mutants(file.mutants)?;

        let mut executor = ReplayExecutor::default();
        let mut tests = Vec::with_capacity(file.tests.len());
        let mut names = HashSet::new();

        for recorded in file.tests {
            let name = recorded.test.name.clone();
            if !names.insert(name.clone()) {
                bail!("duplicate test name {:?}", name);
            }

            for (mutant_id, run) in recorded.mutant_runs {
                if goals.for_mutant(mutant_id).is_none() {
                    bail!("test {:?} records a run against unknown mutant {}", name, mutant_id);
                }
                executor.mutant_runs.insert((name.clone(), mutant_id), run);
            }

            executor.results.insert(name, recorded.result);
            tests.push(Arc::new(recorded.test));
        }

        for suite in &file.suites {
            for test in &suite.tests {
                if !names.contains(test) {
                    bail!("suite {:?} refers to unknown test {:?}", suite.name, test);
                }
            }
        }

        Ok(Self {
            path,
            structural: BranchCoverageFitness::new(file.branches, file.methods),
            goals,
            tests,
            suites: file.suites,
            executor,
        })
    }

    pub fn executor(&self) -> &ReplayExecutor {
        &self.executor
    }

    pub fn test(&self, name: &str) -> Option<&Arc<TestCase>> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Recorded execution of a test against the original program.
    pub fn recorded_result(&self, name: &str) -> Option<&ExecutionResult> {
        self.executor.results.get(name)
    }

    /// Fresh, unexecuted suites in file order.
    pub fn build_suites(&self) -> Vec<TestSuite> {
        self.suites
            .iter()
            .map(|spec| {
                let tests = spec
                    .tests
                    .iter()
                    .filter_map(|name| self.test(name))
                    .map(|test| TestChromosome::new(Arc::clone(test)))
                    .collect();
                TestSuite::new(spec.name.clone(), tests)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::execute_suite;
    use tempfile::TempDir;

    fn fixture() -> Session {
        Session::load(Path::new("tests/fixtures/stack_session.json"))
            .expect("fixture session should load")
    }

    fn write_session(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("session.json");
        fs::write(&path, json).expect("write session");
        path
    }

    #[test]
    fn loads_fixture() {
        let session = fixture();

        assert_eq!(session.goals.len(), 4);
        assert_eq!(session.tests.len(), 4);
        assert_eq!(session.structural.branches, 2);
        assert_eq!(session.structural.methods.len(), 2);

        let names: Vec<_> = session.suites.iter().map(|s| s.name.as_str()).collect();
        insta::assert_debug_snapshot!(names, @r#"
        [
            "only_reflection",
            "push_and_pop",
            "with_timeout",
            "idle",
        ]
        "#);
    }

    #[test]
    fn built_suites_replay_recorded_results() {
        let session = fixture();
        let mut suites = session.build_suites();

        let push_and_pop = &mut suites[1];
        assert_eq!(push_and_pop.len(), 2);
        assert!(push_and_pop.tests.iter().all(|t| t.last_result.is_none()));

        let executed = execute_suite(push_and_pop, session.executor()).unwrap();
        assert_eq!(executed, 2);
        assert_eq!(
            push_and_pop.tests[0].last_result.as_ref(),
            session.recorded_result("pop_empty")
        );
        assert!(suites[3].is_empty());
    }

    #[test]
    fn replays_mutant_runs() {
        let session = fixture();
        let test = session.test("push_one").unwrap();
        let mutant = &session.goals.for_mutant(1).unwrap().mutant;

        let run = session
            .executor()
            .run_against_mutant(test, mutant, Duration::from_secs(1))
            .unwrap();
        assert!(run.killed);

        let other = &session.goals.for_mutant(2).unwrap().mutant;
        let err = session
            .executor()
            .run_against_mutant(test, other, Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("against mutant 2"));
    }

    #[test]
    fn unknown_test_in_suite_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_session(
            &dir,
            r#"{"mutants": [], "tests": [], "suites": [{"name": "s", "tests": ["ghost"]}]}"#,
        );

        let err = Session::load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown test \"ghost\""));
    }

    #[test]
    fn duplicate_test_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_session(
            &dir,
            r#"{"mutants": [], "suites": [],
                "tests": [{"name": "t", "result": {"runtime_ms": 1}},
                          {"name": "t", "result": {"runtime_ms": 2}}]}"#,
        );

        let err = Session::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate test name"));
    }

    #[test]
    fn run_against_unknown_mutant_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_session(
            &dir,
            r#"{"mutants": [], "suites": [],
                "tests": [{"name": "t", "result": {"runtime_ms": 1},
                           "mutant_runs": {"9": {"killed": true}}}]}"#,
        );

        let err = Session::load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown mutant 9"));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = write_session(&dir, "{ not json");

        let err = Session::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse session file"));
    }
}
