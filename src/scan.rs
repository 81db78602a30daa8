use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::session::Session;

/// High-level overview of a session file, printed by `inspect`.
#[derive(Debug, Clone)]
pub struct SessionOverview {
    /// Path of the session file.
    pub path: PathBuf,

    /// Number of mutants (one mutation goal each).
    pub mutants: usize,

    /// Number of recorded tests.
    pub tests: usize,

    /// Number of candidate suites.
    pub suites: usize,

    /// Branches in the program under test.
    pub branches: u32,

    /// Methods in the program under test.
    pub methods: usize,

    /// Mutants reached by at least one test that did not use reflection.
    pub touched_mutants: usize,

    /// Tests excluded from mutation scoring because they used reflection.
    pub reflection_tests: usize,

    /// Tests whose recorded execution timed out.
    pub timed_out_tests: usize,

    /// Sum of all recorded runtimes.
    pub total_runtime: Duration,
}

impl SessionOverview {
    /// Build an overview from a loaded session.
    pub fn from_session(session: &Session) -> Self {
        let mut touched = BTreeSet::new();
        let mut reflection_tests = 0;
        let mut timed_out_tests = 0;
        let mut total_runtime = Duration::ZERO;

        for test in &session.tests {
            let Some(result) = session.recorded_result(&test.name) else {
                continue;
            };

            total_runtime += result.runtime;
            if result.timeout {
                timed_out_tests += 1;
            }
            if result.called_reflection {
                reflection_tests += 1;
                continue;
            }

            for goal in session.goals.iter() {
                if result.trace.touches(goal.mutant.id) {
                    touched.insert(goal.mutant.id);
                }
            }
        }

        SessionOverview {
            path: session.path.clone(),
            mutants: session.goals.len(),
            tests: session.tests.len(),
            suites: session.suites.len(),
            branches: session.structural.branches,
            methods: session.structural.methods.len(),
            touched_mutants: touched.len(),
            reflection_tests,
            timed_out_tests,
            total_runtime,
        }
    }
}

/// Load a session file and return its overview.
pub fn scan_session(path: &Path) -> Result<SessionOverview> {
    let session = Session::load(path)?;
    Ok(SessionOverview::from_session(&session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_stack_fixture() {
        let overview = scan_session(Path::new("tests/fixtures/stack_session.json"))
            .expect("scan_session should succeed");

        insta::assert_debug_snapshot!(overview, @r#"
        SessionOverview {
            path: "tests/fixtures/stack_session.json",
            mutants: 4,
            tests: 4,
            suites: 4,
            branches: 2,
            methods: 2,
            touched_mutants: 3,
            reflection_tests: 1,
            timed_out_tests: 1,
            total_runtime: 2.045s,
        }
        "#);
    }
}
