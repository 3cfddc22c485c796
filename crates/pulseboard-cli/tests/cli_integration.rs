use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{now}"));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn db_path(dir: &Path) -> String {
    let path = dir.join("pulseboard.sqlite3");
    path.to_str()
        .unwrap_or_else(|| panic!("path should be valid UTF-8: {}", path.display()))
        .to_string()
}

fn run_pb<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_pb"))
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("failed to execute pb binary: {err}"))
}

fn run_json<I, S>(args: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_pb(args);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "pb command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
            output.status, stdout, stderr
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn as_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string field `{key}` in payload: {value}"))
}

fn as_array<'a>(value: &'a Value, key: &str) -> &'a Vec<Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .unwrap_or_else(|| panic!("missing array field `{key}` in payload: {value}"))
}

#[test]
fn seed_then_list_returns_the_full_fixture_corpus() {
    let dir = unique_temp_dir("pb-seed-list");
    let db = db_path(&dir);

    let seeded = run_json(["--db", &db, "seed"]);
    assert_eq!(seeded.get("already_seeded").and_then(Value::as_bool), Some(false));
    assert_eq!(seeded.get("activities").and_then(Value::as_u64), Some(12));
    assert_eq!(seeded.get("tasks").and_then(Value::as_u64), Some(7));
    assert_eq!(seeded.get("documents").and_then(Value::as_u64), Some(5));

    let page = run_json(["--db", &db, "activity", "list", "--limit", "50"]);
    assert_eq!(as_str(&page, "contract_version"), "cli.v1");
    assert_eq!(as_array(&page, "activities").len(), 12);
    assert_eq!(page.get("has_more").and_then(Value::as_bool), Some(false));
    assert_eq!(page.get("next_cursor"), Some(&Value::Null));

    let types = run_json(["--db", &db, "activity", "types"]);
    let action_types = as_array(&types, "action_types");
    assert!(action_types.iter().any(|value| value.as_str() == Some("email_sent")));
}

#[test]
fn activity_add_and_set_status_round_trip() {
    let dir = unique_temp_dir("pb-activity-status");
    let db = db_path(&dir);

    let added = run_json([
        "--db",
        &db,
        "activity",
        "add",
        "--action-type",
        "api_call",
        "--description",
        "Fetched deployment status from CI",
        "--status",
        "pending",
        "--tag",
        "ci",
    ]);
    assert_eq!(as_str(&added, "status"), "pending");
    let id = as_str(&added, "id").to_string();

    let updated =
        run_json(["--db", &db, "activity", "set-status", "--id", &id, "--status", "success"]);
    assert_eq!(as_str(&updated, "id"), id);
    assert_eq!(as_str(&updated, "status"), "success");
}

#[test]
fn global_search_finds_roadmap_matches_across_stores() {
    let dir = unique_temp_dir("pb-global-search");
    let db = db_path(&dir);
    run_json(["--db", &db, "seed"]);

    let results = run_json(["--db", &db, "search", "--query", "roadmap"]);
    assert_eq!(results.get("total_matches").and_then(Value::as_u64), Some(2));
    assert_eq!(as_array(&results, "documents").len(), 1);
    assert_eq!(as_array(&results, "activities").len(), 1);
    assert_eq!(as_array(&results, "tasks").len(), 0);
}

#[test]
fn content_index_truncates_long_previews() {
    let dir = unique_temp_dir("pb-preview");
    let db = db_path(&dir);
    let content = "z".repeat(250);

    let indexed = run_json([
        "--db",
        &db,
        "content",
        "index",
        "--title",
        "long document",
        "--content",
        &content,
        "--content-type",
        "document",
    ]);
    let preview = as_str(&indexed, "preview");
    assert_eq!(preview.chars().count(), 203);
    assert!(preview.ends_with("..."));
}

#[test]
fn empty_content_update_is_a_no_op() {
    let dir = unique_temp_dir("pb-noop-update");
    let db = db_path(&dir);

    let indexed = run_json([
        "--db",
        &db,
        "content",
        "index",
        "--title",
        "notes",
        "--content",
        "stable body",
        "--content-type",
        "memory",
    ]);
    let id = as_str(&indexed, "id").to_string();

    let updated = run_json(["--db", &db, "content", "update", "--id", &id]);
    assert_eq!(updated.get("updated"), Some(&Value::Null));
}

#[test]
fn week_window_is_inclusive_and_bounded() {
    let dir = unique_temp_dir("pb-week");
    let db = db_path(&dir);
    let week_start: i64 = 1_700_000_000_000;
    let week_end = week_start + 7 * 24 * 60 * 60 * 1_000 - 1;

    for (title, start) in [("inside meeting", week_end), ("outside meeting", week_end + 1)] {
        run_json([
            "--db",
            &db,
            "task",
            "add",
            "--title",
            title,
            "--start-time",
            &start.to_string(),
            "--task-type",
            "meeting",
        ]);
    }

    let window = run_json([
        "--db",
        &db,
        "task",
        "week",
        "--week-start",
        &week_start.to_string(),
        "--week-end",
        &week_end.to_string(),
    ]);
    let tasks = as_array(&window, "tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].get("title").and_then(Value::as_str), Some("inside meeting"));
}

#[test]
fn removing_a_missing_task_exits_nonzero() {
    let dir = unique_temp_dir("pb-remove-missing");
    let db = db_path(&dir);

    // any well-formed ULID that was never inserted
    let output = run_pb([
        "--db",
        &db,
        "task",
        "remove",
        "--id",
        "01ARZ3NDEKTSV4RRFFQ69G5FAV",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}
