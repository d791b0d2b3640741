//! End-to-end tests for the siftc binary.
//!
//! Each test writes a schema description to a temp file, invokes the
//! binary, and asserts on its output.

use std::path::PathBuf;
use std::process::{Command, Output};

const SCHEMA_JSON: &str = r#"{
    "events": {
        "table": "events",
        "fields": {
            "status": "text",
            "priority": "integer",
            "title": "text",
            "content": "text",
            "time_start": "utc_date_time"
        },
        "assocs": {
            "organization": {
                "kind": "belongs_to",
                "schema": "organizations",
                "owner_key": "organization_id",
                "related_key": "id"
            }
        }
    },
    "organizations": {
        "table": "organizations",
        "fields": { "name": "text" }
    }
}"#;

fn write_schema() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("schema.json");
    std::fs::write(&path, SCHEMA_JSON).expect("failed to write schema");
    (dir, path)
}

fn siftc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_siftc"))
        .args(args)
        .output()
        .expect("failed to invoke siftc")
}

#[test]
fn compiles_a_simple_expression() {
    let (_dir, schema) = write_schema();
    let output = siftc(&[
        "compile",
        "status:live",
        "--schema",
        schema.to_str().unwrap(),
        "--root",
        "events",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(
        "SELECT \"events\".* FROM \"events\" WHERE \"events\".\"status\" = $1"
    ));
    assert!(stdout.contains("$1 = live"));
}

#[test]
fn compiles_an_association_filter_with_alias() {
    let (_dir, schema) = write_schema();
    let output = siftc(&[
        "compile",
        "status:live AND org.name:Bea*",
        "--schema",
        schema.to_str().unwrap(),
        "--root",
        "events",
        "--allow",
        "status",
        "--allow",
        "org.name=organization.name",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("LEFT JOIN \"organizations\""));
    assert!(stdout.contains("$2 = Bea%"));
}

#[test]
fn json_output_carries_meta() {
    let (_dir, schema) = write_schema();
    let output = siftc(&[
        "compile",
        "jazz status:published",
        "--schema",
        schema.to_str().unwrap(),
        "--root",
        "events",
        "--search-field",
        "title",
        "--search-field",
        "content",
        "--json",
    ]);

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("output is not JSON");
    assert_eq!(parsed["meta"]["uses_full_text"], serde_json::json!(true));
    assert!(parsed["sql"].as_str().unwrap().contains("ILIKE"));
    assert_eq!(parsed["params"].as_array().unwrap().len(), 3);
}

#[test]
fn syntax_errors_render_a_report_and_fail() {
    let (_dir, schema) = write_schema();
    let output = siftc(&[
        "compile",
        "status:'unterminated",
        "--schema",
        schema.to_str().unwrap(),
        "--root",
        "events",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unterminated string at position 7"));
}

#[test]
fn strict_mode_rejects_unknown_fields() {
    let (_dir, schema) = write_schema();
    let output = siftc(&[
        "compile",
        "secret:x",
        "--schema",
        schema.to_str().unwrap(),
        "--root",
        "events",
        "--mode",
        "strict",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown field 'secret'"));
}

#[test]
fn parse_subcommand_prints_ast_json() {
    let output = siftc(&["parse", "status:live OR priority>3"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("output is not JSON");
    assert!(parsed.get("Or").is_some());
}
