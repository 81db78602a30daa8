use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::report::format_goal_with_test;
use crate::run_report::{EvaluationReport, GoalStatus};

/// Write every output file for a run into `out_dir`, creating it if needed.
pub fn write_all(out_dir: &Path, report: &EvaluationReport) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output dir {:?}", out_dir))?;

    write_scores_json(out_dir, report)?;
    write_goal_txts(out_dir, report)?;
    write_log(out_dir, report)?;
    Ok(())
}

/// Write `scores.json` containing the full evaluation report.
pub fn write_scores_json(out_dir: &Path, report: &EvaluationReport) -> Result<()> {
    let path = out_dir.join("scores.json");
    write_pretty_json(&path, report)
}

/// Write goal lists:
/// - killed.txt   (killed goals, with the test kept for them)
/// - open.txt     (goals still open, disabled ones included)
pub fn write_goal_txts(out_dir: &Path, report: &EvaluationReport) -> Result<()> {
    let mut killed = String::new();
    let mut open = String::new();

    for g in &report.goals {
        let target = if g.status == GoalStatus::Killed {
            &mut killed
        } else {
            &mut open
        };
        target.push_str(&format_goal_with_test(g));
        target.push('\n');
    }

    // The files are created even when the lists are empty.
    write_atomic(&out_dir.join("killed.txt"), killed.as_bytes())?;
    write_atomic(&out_dir.join("open.txt"), open.as_bytes())?;
    Ok(())
}

/// Write a stable `log` file (no timestamps) with summary, suites and error.
pub fn write_log(out_dir: &Path, report: &EvaluationReport) -> Result<()> {
    let s = &report.summary;

    let mut lines = Vec::new();
    lines.push(format!("tool: {}", report.tool));
    lines.push(format!("version: {}", report.version));
    lines.push(format!("session: {}", report.session.display()));
    lines.push(format!(
        "suites: scored={} failed={} timed_out={}",
        s.scored, s.failed, s.timed_out
    ));
    lines.push(format!(
        "goals: total={} killed={} open={} disabled={}",
        s.total_goals, s.killed, s.open, s.disabled
    ));
    for suite in &report.suites {
        match (suite.fitness, &suite.error) {
            (Some(fitness), _) => lines.push(format!(
                "suite {}: fitness={:.4} killed={} new={} timed_out={}",
                suite.name, fitness, suite.killed, suite.newly_killed, suite.timed_out
            )),
            (None, Some(err)) => lines.push(format!("suite {}: error={err}", suite.name)),
            (None, None) => {}
        }
    }
    if let Some(err) = &report.error {
        lines.push(format!("error: {err}"));
    }

    let content = lines.join("\n") + "\n";
    write_atomic(&out_dir.join("log"), content.as_bytes())
}

// `?Sized` allows passing unsized values such as slices.
fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    write_atomic(path, json.as_bytes())
}

/// Write through a temp file in the same directory so readers never see a partial file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {:?}", dir))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {:?}", path))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {:?}", path))?;
    Ok(())
}
