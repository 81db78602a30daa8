use serde::{Deserialize, Serialize};

/// Representation of a single injected fault in the program under test.
///
/// Mutants are produced by an external instrumentation step and are never
/// modified once they are part of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mutant {
    /// Stable identifier, as reported in execution traces.
    pub id: u64,

    /// Short name of the mutation operator (for example `ReplaceComparisonOperator`).
    pub operator: String,

    /// Fully qualified class containing the mutated instruction.
    pub class_name: String,

    /// Method containing the mutated instruction.
    pub method_name: String,

    /// Source line of the mutated instruction.
    pub line: u32,

    /// Original source snippet (before mutation).
    #[serde(default)]
    pub original_snippet: String,

    /// Mutated source snippet (after mutation).
    #[serde(default)]
    pub mutated_snippet: String,
}

impl Mutant {
    /// `class.method:line`, used in log lines and reports.
    pub fn location(&self) -> String {
        format!("{}.{}:{}", self.class_name, self.method_name, self.line)
    }
}

#[cfg(test)]
pub(crate) fn sample_mutant(id: u64) -> Mutant {
    Mutant {
        id,
        operator: "ReplaceComparisonOperator".to_string(),
        class_name: "com.example.Stack".to_string(),
        method_name: "push".to_string(),
        line: 40 + id as u32,
        original_snippet: "size < capacity".to_string(),
        mutated_snippet: "size <= capacity".to_string(),
    }
}
