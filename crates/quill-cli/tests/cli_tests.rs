//! CLI integration tests
//!
//! Every command runs in an empty temporary directory with HOME pointing
//! there, so no stray quill.toml or global config is picked up.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn quill_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quill").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("QUILL_DIALECT")
        .env_remove("QUILL_LOCALE")
        .env_remove("QUILL_LOG")
        .env_remove("QUILL_MODULES")
        .env_remove("QUILL_OUTPUT");
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("functions"))
        .stdout(predicate::str::contains("call"))
        .stdout(predicate::str::contains("docs"))
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quill"));
}

// ══════════════════════════════════════════════════════════════════════════════
// CALL
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_call_add() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["call", "add", "1", "2", "3"])
        .assert()
        .success()
        .stdout("6\n");
}

#[test]
fn test_call_with_wrong_arity_prints_usage() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["call", "upper"])
        .assert()
        .success()
        .stdout("Usage: ${upper(string)}. Example: ${upper(\"hello\")}\n");
}

#[test]
fn test_dialect_flag_changes_usage() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["--dialect", "script", "call", "upper"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Usage: ${{$.upper(string)}}."));
}

#[test]
fn test_dialect_from_project_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("quill.toml"), "[runtime]\ndialect = \"script\"\n").unwrap();
    quill_cmd(&dir)
        .args(["call", "upper"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Usage: ${{$.upper("));
}

#[test]
fn test_call_json_output() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["call", "--json", "split", "a,b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a\""))
        .stdout(predicate::str::contains("\"b\""));
}

#[test]
fn test_call_size_skips_nulls() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["call", "size", "[1,2,null,3]"])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_call_unknown_function_fails() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["call", "no_such_function"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown function 'no_such_function'"));
}

#[test]
fn test_unlicensed_function_fails() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .env("QUILL_MODULES", "core")
        .args(["call", "encrypt", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires module 'crypto'"));
}

#[test]
fn test_config_setting() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("quill.toml"),
        "[settings.mail]\nhost = \"smtp.local\"\n",
    )
    .unwrap();
    quill_cmd(&dir)
        .args(["call", "config", "mail.host"])
        .assert()
        .success()
        .stdout("smtp.local\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// DOCUMENTATION
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_doc_resolves_alias() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["doc", "modulo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("### mod"))
        .stdout(predicate::str::contains("Usage: ${mod(value1, value2)}."));
}

#[test]
fn test_doc_unknown_function() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["doc", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown function 'nope'"));
}

#[test]
fn test_functions_by_category() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["functions", "-c", "math"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("upper").not());
}

#[test]
fn test_functions_unknown_category() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .args(["functions", "--category", "poetry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category 'poetry'"));
}

#[test]
fn test_functions_all_marks_unlicensed() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .env("QUILL_MODULES", "core")
        .args(["functions", "--all", "-c", "system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[requires crypto]"));
}

#[test]
fn test_docs_markdown() {
    let dir = TempDir::new().unwrap();
    quill_cmd(&dir)
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Built-in functions"))
        .stdout(predicate::str::contains("## database"));
}
