mod archive;
mod branch;
mod cli;
mod distance;
mod execution;
mod fitness;
mod goal;
mod mutant;
mod options;
mod out;
mod prioritize;
mod report;
mod run_report;
mod scan;
mod session;
mod suite;
mod timeouts;
mod ui;

/// Entry point for the `mutant-fitness` binary.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    cli::run()
}
