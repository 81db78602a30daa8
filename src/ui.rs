use console::{Term, style};
use std::{env, fmt::Display};

use crate::fitness::SuiteScore;

/// Small UI helper:
/// - normal mode: human output to stdout, errors to stderr
/// - `--json` mode: ALL human output to stderr (stdout stays machine-readable JSON)
/// - fancy styling only on a real TTY and when NO_COLOR/CI are not set
#[derive(Debug, Clone)]
pub struct Ui {
    out: Term,
    err: Term,
    fancy: bool,
    enabled: bool,

    // Counters for the run summary; they do not affect output formatting.
    suites_scored: u64,
    suites_timed_out: u64,
    suite_errors: u64,
}

impl Ui {
    pub fn new(json: bool) -> Self {
        // In --json mode, keep stdout clean for JSON and send all human output to stderr.
        let out = if json { Term::stderr() } else { Term::stdout() };
        let err = Term::stderr();

        // Fancy output must only activate when the actual stream used for human output is a TTY.
        let out_is_tty = out.is_term();

        let no_color = env::var_os("NO_COLOR").is_some();
        let in_ci = env::var_os("CI").is_some();

        let fancy = out_is_tty && !no_color && !in_ci;

        Self {
            out,
            err,
            fancy,
            enabled: true,
            suites_scored: 0,
            suites_timed_out: 0,
            suite_errors: 0,
        }
    }

    /// Useful for unit tests to avoid noisy output.
    #[cfg(test)]
    pub fn silent() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            fancy: false,
            enabled: false,
            suites_scored: 0,
            suites_timed_out: 0,
            suite_errors: 0,
        }
    }

    fn write_out(&self, s: &str) {
        if self.enabled {
            let _ = self.out.write_line(s);
        }
    }

    fn write_err(&self, s: &str) {
        if self.enabled {
            let _ = self.err.write_line(s);
        }
    }

    pub fn line(&self, msg: impl Display) {
        self.write_out(&msg.to_string());
    }

    pub fn title(&self, msg: impl Display) {
        let s = msg.to_string();
        if self.fancy {
            self.write_out(&style(s).bold().to_string());
        } else {
            self.write_out(&s);
        }
    }

    pub fn error(&self, msg: impl Display) {
        let s = msg.to_string();
        if self.fancy {
            self.write_err(&style(s).red().bold().to_string());
        } else {
            self.write_err(&s);
        }
    }

    /// Per-suite progress line.
    ///
    /// Non-fancy lines are plain and stable so CLI tests can match them.
    pub fn suite_progress(&mut self, name: &str, score: &SuiteScore) {
        self.suites_scored = self.suites_scored.saturating_add(1);
        if score.timed_out {
            self.suites_timed_out = self.suites_timed_out.saturating_add(1);
        }

        if !self.fancy {
            if score.timed_out {
                self.line(format!(
                    "suite {name} timed out (fitness {:.4})",
                    score.fitness
                ));
            } else {
                self.line(format!(
                    "suite {name} fitness {:.4} (killed {}/{}, new {})",
                    score.fitness, score.killed, score.total_goals, score.newly_killed
                ));
            }
            return;
        }

        let tag = if score.timed_out {
            style("TIMEOUT").yellow().bold()
        } else if score.newly_killed > 0 {
            style("KILLS").green().bold()
        } else {
            style("SCORED").cyan().bold()
        };

        self.line(format!(
            "{tag:>8} {fitness:>10.4}  {name}  killed {killed}/{total} (+{new}), checked {checked}",
            fitness = score.fitness,
            killed = score.killed,
            total = score.total_goals,
            new = score.newly_killed,
            checked = score.checked,
        ));
    }

    /// Used for suites that could not be scored; keeps stderr/stdout routing consistent.
    pub fn suite_error(&mut self, msg: impl Display) {
        self.suite_errors += 1;
        self.error(msg);
    }

    pub fn suites_scored(&self) -> u64 {
        self.suites_scored
    }

    pub fn suites_timed_out(&self) -> u64 {
        self.suites_timed_out
    }

    pub fn suite_errors(&self) -> u64 {
        self.suite_errors
    }

    #[allow(dead_code)]
    pub fn is_fancy(&self) -> bool {
        self.fancy && self.enabled
    }
}
