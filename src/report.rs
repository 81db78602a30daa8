use crate::run_report::{GoalReport, GoalStatus, SuiteReport};

/// Print a detailed list of all goals and their final state.
pub fn print_all_goals(goals: &[GoalReport]) {
    if goals.is_empty() {
        return;
    }

    println!("--- goals (detailed) ---");
    for g in goals {
        println!(
            "{:>8} {:>8} {}",
            status_label(g.status),
            best_value_label(g.best_value),
            format_goal_short(g)
        );
    }
}

/// Print the goals no suite managed to kill, disabled ones included.
pub fn print_open_goals(goals: &[GoalReport]) {
    let open: Vec<&GoalReport> = goals
        .iter()
        .filter(|g| g.status != GoalStatus::Killed)
        .collect();

    if open.is_empty() {
        return;
    }

    println!("--- open goals ({} of {}) ---", open.len(), goals.len());

    for g in open {
        println!("{}", format_goal_short(g));
    }
}

/// Print the suites that could not be scored.
pub fn print_failed_suites(suites: &[SuiteReport]) {
    for s in suites {
        if let Some(error) = &s.error {
            println!("suite {} failed: {error}", s.name);
        }
    }
}

fn status_label(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Killed => "killed",
        GoalStatus::Open => "open",
        GoalStatus::Disabled => "disabled",
    }
}

fn best_value_label(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "-".to_string(),
    }
}

/// Format one goal as a single, readable line.
pub fn format_goal_short(g: &GoalReport) -> String {
    let m = &g.mutant;

    format!(
        "#{id} {location} {operator}: {orig:?} -> {mutated:?}",
        id = m.id,
        location = m.location(),
        operator = m.operator,
        orig = m.original_snippet,
        mutated = m.mutated_snippet,
    )
}

/// Format one goal together with the test the archive kept for it.
pub fn format_goal_with_test(g: &GoalReport) -> String {
    match &g.best_test {
        Some(test) => format!("{} [{}]", format_goal_short(g), test),
        None => format_goal_short(g),
    }
}
