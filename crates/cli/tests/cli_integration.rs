//! End-to-end tests for the `courgette` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const CLEAN: &str = "\
Schedule: Rates
  When single: $100 per fortnight

Scenario: Age Pension
  When age >= 67
  Then age_pension_eligible = true
  And rate is determined by Rates
";

const BROKEN: &str = "\
Scenario: Age Pension
  When age >= 67
";

fn courgette() -> Command {
    Command::cargo_bin("courgette").expect("binary")
}

fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("write source");
    path
}

#[test]
fn compile_writes_python_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", CLEAN);
    courgette()
        .args(["compile"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("class age_pension_eligible(Variable):"))
        .stdout(predicate::str::contains("rates_single = 100"));
}

#[test]
fn compile_out_writes_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", CLEAN);
    let out = dir.path().join("generated.py");
    courgette()
        .args(["compile"])
        .arg(&source)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
    let code = fs::read_to_string(&out).expect("generated file");
    assert!(code.contains("class age_pension_payment(Variable):"));
}

#[test]
fn compile_income_variable_flag_changes_the_reference() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(
        &dir,
        "rules.courgette",
        "Scenario: S\n  When age >= 22\n  Then s_eligible = true\n  And payment is $1000\n  And payment reduces by 50 cents per dollar over $200\n",
    );
    courgette()
        .args(["compile"])
        .arg(&source)
        .args(["--income-variable", "assessable_income"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "amount = max(0, amount - (assessable_income - 200) * 0.5)",
        ));
}

#[test]
fn compile_json_output_wraps_the_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", CLEAN);
    let assert = courgette()
        .args(["--output", "json", "compile"])
        .arg(&source)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert!(value["code"]
        .as_str()
        .expect("code field")
        .contains("class age_pension_eligible(Variable):"));
}

#[test]
fn compile_rejects_blockless_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "prose.courgette", "no headers here\njust words\n");
    courgette()
        .args(["compile"])
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Courgette blocks found"));
}

#[test]
fn validate_clean_file_exits_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", CLEAN);
    courgette()
        .args(["validate"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("no findings"));
}

#[test]
fn validate_errors_exit_one_and_name_the_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", BROKEN);
    courgette()
        .args(["validate"])
        .arg(&source)
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "1:1: error: Scenario missing outcome statements (Then...)",
        ));
}

#[test]
fn validate_json_output_is_a_diagnostic_array() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", BROKEN);
    let assert = courgette()
        .args(["--output", "json", "validate"])
        .arg(&source)
        .assert()
        .failure();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    let first = &value.as_array().expect("array")[0];
    assert_eq!(first["severity"], "error");
    assert_eq!(first["line"], 1);
    assert!(first["startOffset"].is_u64());
}

#[test]
fn quiet_suppresses_the_summary_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = write_source(&dir, "rules.courgette", CLEAN);
    courgette()
        .args(["--quiet", "validate"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_file_is_a_failure() {
    courgette()
        .args(["compile", "does-not-exist.courgette"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading file"));
}
