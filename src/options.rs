use std::time::Duration;

/// Timeouts after which a mutant is disabled.
pub const DEFAULT_MUTATION_TIMEOUTS: u32 = 3;

/// Multiple of the original runtime a mutant run may take.
pub const DEFAULT_MUTANT_TIMEOUT_FACTOR: u32 = 5;

/// Floor for a mutant run's budget, in milliseconds.
pub const DEFAULT_MIN_MUTANT_BUDGET_MS: u64 = 500;

/// Configuration for mutation fitness scoring, derived from the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessOptions {
    /// Record measured penalties and solving tests in the coverage archive.
    pub test_archive: bool,

    /// Number of timeouts after which a mutant is disabled.
    pub mutation_timeouts: u32,

    /// A mutant run may take this many times the original runtime.
    pub mutant_timeout_factor: u32,

    /// Lower bound for the time budget of a single mutant run.
    pub min_mutant_budget: Duration,
}

impl FitnessOptions {
    /// Time budget for re-executing a test whose original run took `runtime`.
    pub fn mutant_budget(&self, runtime: Duration) -> Duration {
        runtime
            .saturating_mul(self.mutant_timeout_factor)
            .max(self.min_mutant_budget)
    }
}

impl Default for FitnessOptions {
    fn default() -> Self {
        Self {
            test_archive: true,
            mutation_timeouts: DEFAULT_MUTATION_TIMEOUTS,
            mutant_timeout_factor: DEFAULT_MUTANT_TIMEOUT_FACTOR,
            min_mutant_budget: Duration::from_millis(DEFAULT_MIN_MUTANT_BUDGET_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_scales_with_runtime_above_floor() {
        let options = FitnessOptions::default();
        assert_eq!(
            options.mutant_budget(Duration::from_millis(10)),
            Duration::from_millis(500)
        );
        assert_eq!(
            options.mutant_budget(Duration::from_millis(200)),
            Duration::from_millis(1000)
        );
    }
}
