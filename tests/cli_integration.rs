use assert_cmd::Command;
use regex::Regex;
use std::fs;
use tempfile::TempDir;

const FIXTURE: &str = "tests/fixtures/stack_session.json";

struct Output {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

fn normalize_output(text: &str) -> String {
    // Redact durations like `261.502302ms`, `8s`, `234ms`, `2.045s`.
    let re_dur = Regex::new(r"\b\d+(\.\d+)?(ns|us|µs|ms|s)\b").unwrap();
    let out = re_dur.replace_all(text, "<DUR>");

    let re_tmp_unix = Regex::new(r#"/tmp/[^\s"]+"#).unwrap();
    let out = re_tmp_unix.replace_all(&out, "<TMP>");

    out.to_string()
}

fn run_mutant_fitness(args: &[&str]) -> Output {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mutant-fitness"));
    cmd.args(args)
        .env("NO_COLOR", "1")
        .env("RUST_BACKTRACE", "0")
        .env_remove("RUST_LOG");

    let output = cmd.output().expect("command should run");

    Output {
        code: output.status.code(),
        stdout: normalize_output(&String::from_utf8_lossy(&output.stdout)),
        stderr: normalize_output(&String::from_utf8_lossy(&output.stderr)),
    }
}

#[test]
fn help_lists_subcommands() {
    let out = run_mutant_fitness(&["--help"]);

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.contains("inspect"));
    assert!(out.stdout.contains("score"));
}

#[test]
fn inspect_fixture() {
    let out = run_mutant_fitness(&["inspect", "--session", FIXTURE]);

    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    insta::assert_snapshot!(out.stdout, @r#"
    mutant-fitness: inspect
    session: "tests/fixtures/stack_session.json"
    --- session overview ---
    session file:        tests/fixtures/stack_session.json
    mutants (goals):     4
    tests:               4
    suites:              4
    branches:            2
    methods:             2
    touched mutants:     3
    reflection tests:    1
    timed-out tests:     1
    total test runtime:  <DUR>
    "#);
}

#[test]
fn score_fixture() {
    let out = run_mutant_fitness(&["score", "--session", FIXTURE]);

    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    insta::assert_snapshot!(out.stdout, @r#"
    mutant-fitness: score
    session: "tests/fixtures/stack_session.json"
    goals: 4, suites: 4
    suite only_reflection fitness 18.0000 (killed 0/4, new 0)
    suite push_and_pop fitness 6.9667 (killed 1/4, new 1)
    suite with_timeout timed out (fitness 15.0000)
    suite idle fitness 15.0000 (killed 1/4, new 0)
    --- fitness summary ---
    suites scored:    4
    suites timed out: 1
    suites failed:    0
    goals killed:     1 of 4 (25.00%)
    goals disabled:   0
    best fitness:     6.9667
    scored in <DUR>
    --- open goals (3 of 4) ---
    #2 com.example.Stack.pop:20 NegateCondition: "isEmpty()" -> "!isEmpty()"
    #3 com.example.Stack.push:14 ReplaceConstant: "size + 1" -> "size + 0"
    #4 com.example.Stack.peek:27 DeleteStatement: "checkBounds()" -> ""
    "#);
}

#[test]
fn score_fail_on_survivors_exits_2() {
    let out = run_mutant_fitness(&["score", "--session", FIXTURE, "--fail-on-survivors"]);

    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("3 goal(s) still open"));
}

#[test]
fn score_json_report() {
    let out = run_mutant_fitness(&["score", "--session", FIXTURE, "--json"]);

    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    // Human output goes to stderr in JSON mode.
    assert!(out.stderr.contains("mutant-fitness: score"));

    let report: serde_json::Value = serde_json::from_str(&out.stdout).expect("stdout is JSON");
    assert_eq!(report["tool"], "mutant-fitness");
    assert_eq!(report["summary"]["scored"], 4);
    assert_eq!(report["summary"]["killed"], 1);
    assert_eq!(report["summary"]["timed_out"], 1);

    let suites = report["suites"].as_array().unwrap();
    assert_eq!(suites[1]["name"], "push_and_pop");
    assert_eq!(suites[1]["newly_killed"], 1);
    assert_eq!(suites[2]["timed_out"], true);
    assert_eq!(suites[1]["killers"]["push_one"][0], 1);

    let goals = report["goals"].as_array().unwrap();
    assert_eq!(goals[0]["status"], "killed");
    assert_eq!(goals[0]["best_test"], "push_one");
    assert_eq!(goals[1]["best_test"], "pop_empty");
    let m2 = goals[1]["best_value"].as_f64().unwrap();
    assert!((m2 - 1.8).abs() < 1e-9);
    assert!(goals[3].get("best_value").is_none());
}

#[test]
fn score_without_archive_keeps_no_best_values() {
    let out = run_mutant_fitness(&["score", "--session", FIXTURE, "--json", "--no-archive"]);

    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    let report: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();

    // Kills still close goals, but nothing is archived.
    assert_eq!(report["summary"]["killed"], 1);
    for goal in report["goals"].as_array().unwrap() {
        assert!(goal.get("best_value").is_none());
    }
}

#[test]
fn score_writes_output_dir() {
    let td = TempDir::new().unwrap();
    let out_dir = td.path().join("results");
    let out_arg = out_dir.to_string_lossy().to_string();

    let out = run_mutant_fitness(&["score", "--session", FIXTURE, "--out", &out_arg]);
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);

    let killed = fs::read_to_string(out_dir.join("killed.txt")).unwrap();
    assert_eq!(
        killed,
        "#1 com.example.Stack.push:12 ReplaceComparisonOperator: \"size < capacity\" -> \"size <= capacity\" [push_one]\n"
    );

    let open = fs::read_to_string(out_dir.join("open.txt")).unwrap();
    assert_eq!(open.lines().count(), 3);

    let log = fs::read_to_string(out_dir.join("log")).unwrap();
    assert!(log.contains("suite with_timeout: fitness=15.0000 killed=1 new=0 timed_out=true"));
}

#[test]
fn score_missing_session_fails() {
    let out = run_mutant_fitness(&["score", "--session", "tests/fixtures/missing.json"]);

    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("failed to read session file"));
}

#[test]
fn score_missing_session_json_reports_error() {
    let out = run_mutant_fitness(&["score", "--session", "tests/fixtures/missing.json", "--json"]);

    assert_eq!(out.code, Some(1));
    let report: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
    assert!(
        report["error"]
            .as_str()
            .unwrap()
            .starts_with("failed to load session")
    );
}

#[test]
fn hanging_mutant_is_disabled_after_repeated_timeouts() {
    let td = TempDir::new().unwrap();
    let session = td.path().join("hang.json");
    fs::write(
        &session,
        r#"{
          "mutants": [{"id": 1, "operator": "RemoveLoopExit", "class_name": "Loop",
                       "method_name": "run", "line": 3}],
          "tests": [{"name": "t", "result": {"runtime_ms": 1,
                      "trace": {"touched_mutants": [1]}},
                     "mutant_runs": {"1": {"timed_out": true}}}],
          "suites": [{"name": "g1", "tests": ["t"]},
                     {"name": "g2", "tests": ["t"]},
                     {"name": "g3", "tests": ["t"]}]
        }"#,
    )
    .unwrap();
    let session_arg = session.to_string_lossy().to_string();

    let out = run_mutant_fitness(&[
        "score",
        "--session",
        &session_arg,
        "--mutation-timeouts",
        "2",
        "--json",
    ]);
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);

    let report: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
    let suites = report["suites"].as_array().unwrap();
    assert_eq!(suites[0]["timed_out"], true);
    assert_eq!(suites[1]["timed_out"], true);
    assert_eq!(suites[2]["timed_out"], false);
    assert_eq!(suites[2]["fitness"], 3.0);
    assert_eq!(report["goals"][0]["status"], "disabled");
    assert!(out.stderr.contains("disabled after 2 timeouts"));
}
