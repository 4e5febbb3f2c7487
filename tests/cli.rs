//! CLI tests for the `survey_insights` binary.
//
// Every test writes its own snapshot file into a temp dir and runs the binary
// with the classifier environment removed, so results never depend on the
// developer's shell. Tests that start a mock classifier server are #[serial].

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use regex::Regex;
use serde_json::{Value as Json, json};
use serial_test::serial;

// --------------------- helpers ---------------------

/// Survey 1 with two English text answers and one NPS answer.
fn snapshot() -> Json {
    json!({
        "surveys": [{"id": 1, "title": "Hotel stay", "creator": "ops"}],
        "responses": [
            {"id": 1, "survey_id": 1, "language": "en"},
            {"id": 2, "survey_id": 1, "language": "en-GB"}
        ],
        "answers": [
            {
                "id": 1,
                "response_id": 1,
                "text_answer": "The staff was wonderful. The room was dirty."
            },
            {"id": 2, "response_id": 2, "text_answer": "Breakfast was excellent!"},
            {"id": 3, "response_id": 2, "question_kind": "nps", "nps_rating": 9}
        ],
        "clusters": [
            {"id": 1, "name": "Service", "owner": "ops"}
        ]
    })
}

/// Write the snapshot into `dir` and return its path.
fn write_data(dir: &assert_fs::TempDir, data: &Json) -> PathBuf {
    let f = dir.child("survey.json");
    f.write_str(&serde_json::to_string_pretty(data).unwrap())
        .unwrap();
    f.path().to_path_buf()
}

fn cli(dir: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::cargo_bin("survey_insights").unwrap();
    cmd.current_dir(dir)
        .env_remove("SURVEY_CLASSIFIER_URL")
        .env_remove("SURVEY_CLASSIFIER_API_KEY")
        .env_remove("SURVEY_CLASSIFIER_MODEL");
    for proxy in [
        "HTTP_PROXY",
        "http_proxy",
        "HTTPS_PROXY",
        "https_proxy",
        "ALL_PROXY",
        "all_proxy",
    ] {
        cmd.env_remove(proxy);
    }
    cmd
}

/// Run CLI successfully and return stdout.
fn run_ok(dir: &Path, args: &[&str]) -> String {
    let out = cli(dir).args(args).assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

fn read_json<P: AsRef<Path>>(p: P) -> Json {
    serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap()
}

/// Chat-completions reply carrying `content` as the assistant message.
fn chat_reply(content: &Json) -> String {
    json!({"choices": [{"message": {"content": content.to_string()}}]}).to_string()
}

// --------------------- process & summarize ---------------------

#[test]
fn process_survey_then_summarize() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let data_arg = data.to_str().unwrap();

    let out = run_ok(td.path(), &["--data", data_arg, "process", "--survey", "1"]);
    let report: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["processed"], 2);
    assert_eq!(report["skipped"], 1);

    // the store file was written back
    let saved = read_json(&data);
    let answers = saved["answers"].as_array().unwrap();
    assert_eq!(answers[0]["processed"], true);
    assert_eq!(answers[2]["processed"], false);
    assert!(!saved["words"].as_array().unwrap().is_empty());

    let out = run_ok(td.path(), &["--data", data_arg, "summarize", "--survey", "1"]);
    let summary: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["survey_id"], 1);
    assert_eq!(summary["response_count"], 2);
    assert_eq!(summary["satisfaction_basis"], "nps");
    assert_eq!(summary["language_breakdown"]["en"], 2);
    assert!(!summary["top_clusters"].as_array().unwrap().is_empty());
}

#[test]
fn process_single_answer() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let data_arg = data.to_str().unwrap();

    let out = run_ok(td.path(), &["--data", data_arg, "process", "--answer", "2"]);
    let outcome: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(outcome["status"], "processed");
    assert_eq!(outcome["sentences"], 1);

    let out = run_ok(td.path(), &["--data", data_arg, "process", "--answer", "2"]);
    let outcome: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(outcome["status"], "skipped");
    assert_eq!(outcome["reason"], "already_processed");
}

#[test]
fn summarize_recompute_reflects_new_processing() {
    let td = assert_fs::TempDir::new().unwrap();
    let mut data = snapshot();
    data["answers"][2]["question_kind"] = json!("text");
    let data = write_data(&td, &data);
    let data_arg = data.to_str().unwrap();

    let out = run_ok(td.path(), &["--data", data_arg, "summarize", "--survey", "1"]);
    let before: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(before["satisfaction_basis"], "none");

    run_ok(td.path(), &["--data", data_arg, "process", "--survey", "1"]);
    let out = run_ok(
        td.path(),
        &["--data", data_arg, "summarize", "--survey", "1", "--recompute"],
    );
    let after: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(after["satisfaction_basis"], "sentiment");
}

// --------------------- export ---------------------

#[test]
fn export_csv_file_naming() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let data_arg = data.to_str().unwrap();
    run_ok(td.path(), &["--data", data_arg, "process", "--survey", "1"]);

    let out = run_ok(
        td.path(),
        &["--data", data_arg, "export", "--survey", "1", "--out", "reports"],
    );
    assert_eq!(out.lines().count(), 3);

    let re = Regex::new(r"^1_\d{8}_\d{6}_(words|clusters|wordfreq)\.csv$").unwrap();
    let names: Vec<String> = fs::read_dir(td.path().join("reports"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| re.is_match(n)), "unexpected files: {names:?}");

    let freq = names.iter().find(|n| n.ends_with("_wordfreq.csv")).unwrap();
    let content = fs::read_to_string(td.path().join("reports").join(freq)).unwrap();
    assert_eq!(content.lines().next(), Some("word,count"));
    assert!(content.contains("staff,1"));
}

#[test]
fn export_json_tables() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let data_arg = data.to_str().unwrap();
    run_ok(td.path(), &["--data", data_arg, "process", "--survey", "1"]);

    let out = run_ok(
        td.path(),
        &["--data", data_arg, "export", "--survey", "1", "--format", "json"],
    );
    let words_path = out.lines().find(|l| l.ends_with("_words.json")).unwrap();
    let words = read_json(td.path().join(words_path));
    let words = words.as_array().unwrap();
    assert!(!words.is_empty());
    for w in words {
        let label = w["label"].as_str().unwrap();
        assert!(["positive", "negative", "neutral"].contains(&label));
    }

    let clusters_path = out.lines().find(|l| l.ends_with("_clusters.json")).unwrap();
    let clusters = read_json(td.path().join(clusters_path));
    assert!(clusters.as_array().unwrap().iter().any(|c| c["name"] == "Other"));
}

// --------------------- classify ---------------------

#[test]
fn classify_without_classifier_maps_to_other() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let out = run_ok(
        td.path(),
        &["--data", data.to_str().unwrap(), "classify", "--words", "staff,wifi"],
    );
    let mapping: Json = serde_json::from_str(&out).unwrap();
    assert_eq!(mapping, json!({"staff": "Other", "wifi": "Other"}));
}

#[test]
#[serial]
fn classify_through_http_classifier() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "gpt-4o-mini"})),
            // the payload travels as an escaped JSON string inside the user message
            Matcher::Regex(r#"\\"clusters\\":\[\\"Service\\"\]"#.to_string()),
            Matcher::Regex(r#"\\"words\\":\[\\"staff\\",\\"wifi\\"\]"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(&json!({
            "assignments": [{"word": "staff", "assigned_cluster": "Service"}]
        })))
        .expect(1)
        .create();

    let out = cli(td.path())
        .env("SURVEY_CLASSIFIER_URL", server.url())
        .args([
            "--data",
            data.to_str().unwrap(),
            "classify",
            "--words",
            "staff,wifi",
            "--text",
            "The staff was nice, the wifi slow.",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let mapping: Json = serde_json::from_slice(&out).unwrap();
    assert_eq!(mapping, json!({"staff": "Service", "wifi": "Other"}));
    mock.assert();
}

#[test]
#[serial]
fn failing_classifier_is_not_fatal() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    let mut server = Server::new();
    // two text answers, each tried once and retried once
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .expect(4)
        .create();
    let url = server.url();

    cli(td.path())
        .args([
            "--data",
            data.to_str().unwrap(),
            "--classifier-url",
            url.as_str(),
            "--classifier-timeout",
            "2",
            "process",
            "--survey",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"processed\": 2"));

    let saved = read_json(&data);
    assert!(
        saved["words"]
            .as_array()
            .unwrap()
            .iter()
            .all(|w| w["cluster_name"] == "Other")
    );
    mock.assert();
}

// --------------------- failures ---------------------

#[test]
fn missing_data_file_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    cli(td.path())
        .args(["--data", "nope.json", "process", "--survey", "1"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_survey_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    for cmd in ["process", "summarize", "export"] {
        cli(td.path())
            .args(["--data", data.to_str().unwrap(), cmd, "--survey", "42"])
            .assert()
            .failure()
            .code(1);
    }
}

#[test]
fn process_needs_a_target() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = write_data(&td, &snapshot());
    cli(td.path())
        .args(["--data", data.to_str().unwrap(), "process"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--survey"));
}
