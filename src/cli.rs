use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::execution::execute_suite;
use crate::fitness::{FitnessError, MutationSuiteFitness};
use crate::options::{
    DEFAULT_MIN_MUTANT_BUDGET_MS, DEFAULT_MUTANT_TIMEOUT_FACTOR, DEFAULT_MUTATION_TIMEOUTS,
    FitnessOptions,
};
use crate::out::write_all;
use crate::report::{print_all_goals, print_failed_suites, print_open_goals};
use crate::run_report::{EvaluationReport, SuiteReport, goal_reports};
use crate::scan::{SessionOverview, scan_session};
use crate::session::Session;
use crate::ui::Ui;

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_SURVIVORS: i32 = 2;

/// Top-level CLI arguments for the `mutant-fitness` binary.
#[derive(Debug, Parser)]
#[command(
    name = "mutant-fitness",
    version,
    about = "Mutation-based fitness scoring for generated test suites"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands supported by `mutant-fitness`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print an overview of a session file.
    Inspect {
        /// Path to the session file.
        #[arg(long)]
        session: PathBuf,
    },

    /// Score every suite of a session, in file order.
    Score {
        /// Path to the session file.
        #[arg(long)]
        session: PathBuf,

        /// Print a detailed list of all goals and their final state.
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Emit a machine-readable JSON report to stdout.
        #[arg(long)]
        json: bool,

        /// Also write scores.json, killed.txt, open.txt and log into this directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Exit with code 2 if any goal is still open at the end (useful for CI).
        #[arg(long)]
        fail_on_survivors: bool,

        /// Do not record penalties and solving tests in the coverage archive.
        #[arg(long)]
        no_archive: bool,

        /// Disable a mutant after this many timeouts.
        #[arg(long, default_value_t = DEFAULT_MUTATION_TIMEOUTS)]
        mutation_timeouts: u32,

        /// A mutant run may take this many times the original runtime.
        #[arg(long, default_value_t = DEFAULT_MUTANT_TIMEOUT_FACTOR)]
        timeout_factor: u32,

        /// Minimum time budget for a mutant run, in milliseconds.
        #[arg(long, default_value_t = DEFAULT_MIN_MUTANT_BUDGET_MS)]
        min_budget_ms: u64,
    },
}

fn print_json_and_exit(report: &EvaluationReport, exit_code: i32) -> ! {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize report: {e}"),
    }
    std::process::exit(exit_code);
}

/// Parse CLI arguments and dispatch the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { session } => {
            let ui = Ui::new(false);

            ui.title("mutant-fitness: inspect");
            ui.line(format!("session: {:?}", session));

            match scan_session(&session) {
                Ok(overview) => print_overview(&ui, &overview),
                Err(e) => {
                    ui.error(format!("failed to load session {:?}: {e:#}", session));
                    std::process::exit(EXIT_ERROR);
                }
            }

            Ok(())
        }

        Command::Score {
            session,
            verbose,
            json,
            out,
            fail_on_survivors,
            no_archive,
            mutation_timeouts,
            timeout_factor,
            min_budget_ms,
        } => {
            let options =
                fitness_options(no_archive, mutation_timeouts, timeout_factor, min_budget_ms);

            score_session(&session, options, verbose, json, out.as_deref(), fail_on_survivors)
        }
    }
}

fn fitness_options(
    no_archive: bool,
    mutation_timeouts: u32,
    timeout_factor: u32,
    min_budget_ms: u64,
) -> FitnessOptions {
    FitnessOptions {
        test_archive: !no_archive,
        mutation_timeouts,
        mutant_timeout_factor: timeout_factor,
        min_mutant_budget: Duration::from_millis(min_budget_ms),
    }
}

fn score_session(
    session_path: &Path,
    options: FitnessOptions,
    verbose: bool,
    json: bool,
    out: Option<&Path>,
    fail_on_survivors: bool,
) -> Result<()> {
    let mut ui = Ui::new(json);

    ui.title("mutant-fitness: score");
    ui.line(format!("session: {:?}", session_path));

    let session = match Session::load(session_path) {
        Ok(s) => s,
        Err(e) => {
            if json {
                let report = EvaluationReport::failure(
                    session_path.to_path_buf(),
                    format!("failed to load session: {e:#}"),
                );
                print_json_and_exit(&report, EXIT_ERROR);
            }

            ui.error(format!("failed to load session {:?}: {e:#}", session_path));
            return Err(e);
        }
    };

    ui.line(format!(
        "goals: {}, suites: {}",
        session.goals.len(),
        session.suites.len()
    ));
    if session.goals.is_empty() {
        ui.line("no mutants in session, scoring structural fitness only");
    }

    let fitness = MutationSuiteFitness::new(&session.goals, session.structural.clone(), options);
    let executor = session.executor();
    let started = Instant::now();

    let mut suite_reports = Vec::with_capacity(session.suites.len());
    for mut suite in session.build_suites() {
        let scored = execute_suite(&mut suite, executor)
            .map_err(FitnessError::from)
            .and_then(|_| fitness.score(&mut suite, executor));

        match scored {
            Ok(score) => {
                ui.suite_progress(&suite.name, &score);
                suite_reports.push(SuiteReport::scored(&suite, &session.goals, &score));
            }
            Err(e) => {
                ui.suite_error(format!("failed to score suite {}: {e:#}", suite.name));
                suite_reports.push(SuiteReport::failed(&suite, format!("{e:#}")));
            }
        }
    }

    let elapsed = started.elapsed();
    let report = EvaluationReport::success(
        session_path.to_path_buf(),
        suite_reports,
        goal_reports(&fitness),
    );

    if let Some(dir) = out {
        write_all(dir, &report)?;
        ui.line(format!("wrote results to {:?}", dir));
    }

    // CI policy
    let wants_ci_fail = fail_on_survivors && report.summary.open + report.summary.disabled > 0;
    let exit_code = if wants_ci_fail {
        EXIT_SURVIVORS
    } else {
        EXIT_OK
    };

    if json {
        print_json_and_exit(&report, exit_code);
    }

    let s = &report.summary;
    ui.line("--- fitness summary ---");
    ui.line(format!("suites scored:    {}", ui.suites_scored()));
    ui.line(format!("suites timed out: {}", ui.suites_timed_out()));
    ui.line(format!("suites failed:    {}", ui.suite_errors()));
    ui.line(format!(
        "goals killed:     {} of {} ({:.2}%)",
        s.killed,
        s.total_goals,
        s.coverage * 100.0
    ));
    ui.line(format!("goals disabled:   {}", s.disabled));
    if let Some(best) = s.best_fitness {
        ui.line(format!("best fitness:     {best:.4}"));
    }
    ui.line(format!("scored in {:?}", elapsed));

    if verbose {
        print_all_goals(&report.goals);
    }

    print_failed_suites(&report.suites);
    print_open_goals(&report.goals);

    if wants_ci_fail {
        ui.error(format!(
            "fitness policy failed: {} goal(s) still open (--fail-on-survivors)",
            s.open + s.disabled
        ));
        std::process::exit(EXIT_SURVIVORS);
    }

    Ok(())
}

/// Print a short summary based on the session overview.
fn print_overview(ui: &Ui, overview: &SessionOverview) {
    ui.line("--- session overview ---");
    ui.line(format!("session file:        {}", overview.path.display()));
    ui.line(format!("mutants (goals):     {}", overview.mutants));
    ui.line(format!("tests:               {}", overview.tests));
    ui.line(format!("suites:              {}", overview.suites));
    ui.line(format!("branches:            {}", overview.branches));
    ui.line(format!("methods:             {}", overview.methods));
    ui.line(format!("touched mutants:     {}", overview.touched_mutants));
    ui.line(format!("reflection tests:    {}", overview.reflection_tests));
    ui.line(format!("timed-out tests:     {}", overview.timed_out_tests));
    ui.line(format!("total test runtime:  {:?}", overview.total_runtime));
}
