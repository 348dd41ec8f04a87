//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_iku-brain"))
        .env("IKU_BRAIN_DATA_DIR", data_dir)
        .env_remove("IKU_BRAIN_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_record_then_memory() {
    let dir = tempfile::tempdir().unwrap();
    let event = run_json(
        dir.path(),
        &["record", "task:completed", "--payload", r#"{"id":"t1","title":"Ship"}"#],
    );
    assert_eq!(event["type"], "task:completed");
    assert_eq!(event["payload"]["id"], "t1");

    let memory = run_json(dir.path(), &["memory", "--summary"]);
    assert_eq!(memory["events"], 1);
    assert_eq!(memory["byType"]["task:completed"], 1);
}

#[test]
fn test_record_mood_feeds_quick() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["record", "mood:set", "--payload", r#"{"mood":3}"#]);
    let quick = run_json(dir.path(), &["quick"]);
    assert_eq!(quick["lastMood"], 3.0);
}

#[test]
fn test_record_mood_flag_reaches_patterns() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "min_events_for_analysis", "1"]);
    assert_eq!(code, 0);

    let event = run_json(dir.path(), &["record", "mood:set", "--mood", "8"]);
    assert_eq!(event["payload"]["mood"], 8.0);
    assert_eq!(event["context"]["mood"], 8.0);

    let patterns = run_json(dir.path(), &["patterns"]);
    assert_eq!(patterns["mental"]["avgMood"], 8.0);
    let quick = run_json(dir.path(), &["quick"]);
    assert_eq!(quick["lastMood"], 8.0);
}

#[test]
fn test_record_mood_set_without_mood_reports_none() {
    let dir = tempfile::tempdir().unwrap();
    let event = run_json(dir.path(), &["record", "mood:set"]);
    assert!(event["payload"].get("mood").is_none());

    let quick = run_json(dir.path(), &["quick"]);
    assert!(quick["lastMood"].is_null());
    let suggestions = run_json(dir.path(), &["suggestions"]);
    assert_ne!(suggestions["now"]["id"], "low-mood-support");
}

#[test]
fn test_record_unknown_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["record", "task:exploded"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_record_rejects_out_of_range_mood() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["record", "water:added", "--mood", "11"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("mood must be between 1 and 10"));
}

#[test]
fn test_analyze_stores_score() {
    let dir = tempfile::tempdir().unwrap();
    let score = run_json(dir.path(), &["analyze"]);
    let overall = score["overall"].as_u64().unwrap();
    assert!(overall <= 100);

    let memory = run_json(dir.path(), &["memory", "--summary"]);
    assert_eq!(memory["scores"], 1);
}

#[test]
fn test_wellbeing_json_has_display_fields() {
    let dir = tempfile::tempdir().unwrap();
    let wellbeing = run_json(dir.path(), &["wellbeing"]);
    assert!(wellbeing["score"]["breakdown"].is_object());
    assert!(wellbeing["description"].is_string());
    assert!(wellbeing["color"].is_string());
}

#[test]
fn test_dismiss_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["dismiss", "journal-evening"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("dismissed: journal-evening"));

    let memory = run_json(dir.path(), &["memory", "--summary"]);
    assert_eq!(memory["dismissed"][0], "journal-evening");
}

#[test]
fn test_reset_clears_events() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["record", "water:added", "--payload", r#"{"ml":250}"#]);
    let (_, _, code) = run_cli(dir.path(), &["reset"]);
    assert_eq!(code, 0);

    let memory = run_json(dir.path(), &["memory", "--summary"]);
    assert_eq!(memory["events"], 0);
}

#[test]
fn test_predict_and_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let predictions = run_json(dir.path(), &["predict"]);
    assert!(predictions["energyLevel"].is_string());

    let detailed = run_json(dir.path(), &["predict", "--detailed"]);
    assert!(detailed.is_array());

    let suggestions = run_json(dir.path(), &["suggestions"]);
    assert!(suggestions["upcoming"].is_array());
}

#[test]
fn test_welcome_and_evening_print_text() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["welcome"]);
    assert_eq!(code, 0);
    assert!(!stdout.trim().is_empty());

    let (stdout, _, code) = run_cli(dir.path(), &["evening"]);
    assert_eq!(code, 0);
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "thresholds.low_mood", "3.5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("ok"));

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "thresholds.low_mood"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3.5");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no_such_key"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_json(dir.path(), &["config", "list"]);
    assert_eq!(config["retention_days"], 7);
    assert_eq!(config["max_recent_events"], 500);
}
