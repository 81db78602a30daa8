use std::collections::BTreeMap;

use crate::distance::normalize;
use crate::suite::TestSuite;

/// Baseline structural score added to every mutation fitness.
pub trait StructuralFitness {
    /// Fitness of `suite` (lower is better, 0 is full coverage).
    fn fitness(&self, suite: &TestSuite) -> f64;

    /// Worst value `fitness` can return.
    fn max_fitness(&self) -> f64;
}

/// Branch and method coverage computed from the suite's execution traces.
///
/// Every branch contributes up to 1 per outcome (0 if taken, the normalized
/// branch distance if reached but not taken, 1 if never reached), and every
/// method that no test entered contributes 1.
#[derive(Debug, Clone, Default)]
pub struct BranchCoverageFitness {
    pub branches: u32,
    pub methods: Vec<String>,
}

impl BranchCoverageFitness {
    pub fn new(branches: u32, methods: Vec<String>) -> Self {
        Self { branches, methods }
    }
}

impl StructuralFitness for BranchCoverageFitness {
    fn fitness(&self, suite: &TestSuite) -> f64 {
        let mut min_true: BTreeMap<u32, f64> = BTreeMap::new();
        let mut min_false: BTreeMap<u32, f64> = BTreeMap::new();

        for result in suite.results() {
            merge_min(&mut min_true, &result.trace.true_distances);
            merge_min(&mut min_false, &result.trace.false_distances);
        }

        let mut fitness = 0.0;

        for branch in 0..self.branches {
            for side in [&min_true, &min_false] {
                fitness += side.get(&branch).map_or(1.0, |&d| normalize(d));
            }
        }

        for method in &self.methods {
            let called = suite
                .results()
                .any(|r| r.trace.covered_methods.contains(method));
            if !called {
                fitness += 1.0;
            }
        }

        fitness
    }

    fn max_fitness(&self) -> f64 {
        2.0 * f64::from(self.branches) + self.methods.len() as f64
    }
}

fn merge_min(into: &mut BTreeMap<u32, f64>, from: &BTreeMap<u32, f64>) {
    for (&branch, &distance) in from {
        into.entry(branch)
            .and_modify(|d| *d = d.min(distance))
            .or_insert(distance);
    }
}
