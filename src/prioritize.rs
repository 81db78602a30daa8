use crate::fitness::FitnessError;
use crate::suite::TestSuite;

/// Order the tests of `suite` by their recorded runtime, quickest first.
///
/// Returns indices into `suite.tests`; ties keep suite order. Every test must
/// already carry an execution result.
pub fn prioritize_tests(suite: &TestSuite) -> Result<Vec<usize>, FitnessError> {
    if suite.is_empty() {
        return Ok(Vec::new());
    }

    let mut keyed = Vec::with_capacity(suite.tests.len());

    for (index, chromosome) in suite.tests.iter().enumerate() {
        let result = chromosome
            .last_result
            .as_ref()
            .ok_or_else(|| FitnessError::NotExecuted {
                index,
                test: chromosome.test.name.clone(),
            })?;
        keyed.push((result.runtime, index));
    }

    // `sort_by_key` is stable.
    keyed.sort_by_key(|&(runtime, _)| runtime);

    Ok(keyed.into_iter().map(|(_, index)| index).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionResult, TestCase};
    use crate::suite::TestChromosome;
    use std::sync::Arc;
    use std::time::Duration;

    fn executed(name: &str, ms: u64) -> TestChromosome {
        TestChromosome::with_result(
            Arc::new(TestCase {
                name: name.to_string(),
                statements: Vec::new(),
            }),
            ExecutionResult {
                runtime: Duration::from_millis(ms),
                ..ExecutionResult::default()
            },
        )
    }

    #[test]
    fn quicker_tests_first_and_ties_stable() {
        let suite = TestSuite::new(
            "s",
            vec![
                executed("slow", 50),
                executed("fast", 10),
                executed("tie_a", 20),
                executed("tie_b", 20),
            ],
        );

        let order = prioritize_tests(&suite).unwrap();
        assert_eq!(order, vec![1, 2, 3, 0]);

        // The suite itself is untouched.
        assert_eq!(suite.tests[0].test.name, "slow");
    }

    #[test]
    fn empty_suite_has_empty_order() {
        let suite = TestSuite::new("empty", Vec::new());
        assert!(prioritize_tests(&suite).unwrap().is_empty());
    }

    #[test]
    fn unexecuted_test_is_reported() {
        let mut missing = executed("never_run", 5);
        missing.last_result = None;

        let suite = TestSuite::new("s", vec![executed("ok", 1), missing]);

        match prioritize_tests(&suite) {
            Err(FitnessError::NotExecuted { index, test }) => {
                assert_eq!(index, 1);
                assert_eq!(test, "never_run");
            }
            other => panic!("expected NotExecuted, got {other:?}"),
        }
    }
}
