use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn tenderscout(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tenderscout").unwrap();
    cmd.current_dir(workdir.path()).env("RUST_LOG", "warn");
    cmd
}

fn stdout_json(output: std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn parse_response_reads_fenced_typed_object() {
    let workdir = TempDir::new().unwrap();
    let output = tenderscout(&workdir)
        .args(["--output", "json", "parse-response"])
        .write_stdin("```json\n{\"type\":\"url\",\"values\":[\"https://a.example/1\",null]}\n```")
        .output()
        .unwrap();

    let parsed = stdout_json(output);
    assert_eq!(parsed["type"], "url");
    assert_eq!(parsed["values"], serde_json::json!(["https://a.example/1"]));
}

#[test]
fn parse_response_reports_prose_as_untyped() {
    let workdir = TempDir::new().unwrap();
    let output = tenderscout(&workdir)
        .args(["parse-response", "--text", "No tenders today."])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "no typed values");
}

#[test]
fn content_type_lists_each_file() {
    let workdir = TempDir::new().unwrap();
    let output = tenderscout(&workdir)
        .args(["-o", "json", "content-type", "list.CSV", "notice.pdf", "archive.zip"])
        .output()
        .unwrap();

    let classified = stdout_json(output);
    assert_eq!(classified[0]["content_type"], "text/csv");
    assert_eq!(classified[1]["content_type"], "application/pdf");
    assert_eq!(classified[2]["content_type"], "application/octet-stream");
}

#[test]
fn inspect_orders_steps() {
    let workdir = TempDir::new().unwrap();
    let dir = workdir.path().join("configurations");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("city-tenders.json"),
        r#"{
            "name": "City tenders",
            "target_url": "https://tenders.example/search",
            "steps": [
                {"order": 2, "type": "ai_prompt", "name": "Find tenders", "payload": {"prompt": "List tenders"}},
                {"order": 1, "type": "playwright", "name": "Download", "payload": [{"order": 1, "action_kind": "goto"}]}
            ]
        }"#,
    )
    .unwrap();

    let output = tenderscout(&workdir)
        .args(["--output", "json", "inspect", "city-tenders"])
        .output()
        .unwrap();

    let summary = stdout_json(output);
    assert_eq!(summary["id"], "city-tenders");
    assert_eq!(summary["steps"][0]["name"], "Download");
    assert_eq!(summary["steps"][0]["detail"], "1 actions");
    assert_eq!(summary["steps"][1]["step_type"], "ai_prompt");
}

#[test]
fn run_fails_for_unknown_configuration() {
    let workdir = TempDir::new().unwrap();
    let output = tenderscout(&workdir)
        .env("TENDERSCOUT__LLM__PROVIDER", "scripted")
        .args(["run", "missing"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration not found: missing"));
}
