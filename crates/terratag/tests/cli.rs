mod common;

use assert_cmd::Command;
use common::{fixture, listing, read, workspace, ADDED, TAGS};
use predicates::prelude::*;

const MAIN: &str = r#"resource "aws_s3_bucket" "logs" {
  bucket = "logs"
}
"#;

fn terratag() -> Command {
    let mut cmd = Command::cargo_bin("terratag").unwrap();
    cmd.env_remove("TERRATAG_TAGS");
    cmd.env_remove("TERRATAG_DIR");
    cmd.env_remove("TERRATAG_SKIP_TERRATAG_FILES");
    cmd.env_remove("TERRATAG_TERRAFORM_VERSION");
    cmd.env_remove("TERRATAG_SCHEMA");
    cmd.env_remove("TERRATAG_FILTER");
    cmd.env_remove("TERRATAG_RENAME");
    cmd.env_remove("TERRATAG_LOG");
    cmd
}

#[test]
fn tags_directory() {
    let dir = workspace(&[("main.tf", MAIN)]);

    terratag()
        .arg("--dir")
        .arg(dir.path())
        .args(["--tags", TAGS, "--terraform-version", "12"])
        .arg("--schema")
        .arg(fixture("schema.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("processing file"));

    let tagged = read(dir.path(), "main.terratag.tf");
    assert!(tagged.contains("tags = local.terratag_added_main"));
    assert!(tagged.contains(&format!("terratag_added_main = {ADDED}")));
    assert_eq!(read(dir.path(), "main.tf"), MAIN);
}

#[test]
fn settings_from_environment() {
    let dir = workspace(&[("main.tf", MAIN)]);

    terratag()
        .env("TERRATAG_TAGS", TAGS)
        .env("TERRATAG_DIR", dir.path())
        .env("TERRATAG_TERRAFORM_VERSION", "0.11.14")
        .env("TERRATAG_SCHEMA", fixture("schema.json"))
        .env("TERRATAG_RENAME", "true")
        .assert()
        .success();

    assert_eq!(listing(dir.path()), ["main.terratag.tf", "main.tf.bak"]);
    assert!(read(dir.path(), "main.terratag.tf")
        .contains(r#"tags = "${local.terratag_added_main}""#));
}

#[test]
fn json_report() {
    let dir = workspace(&[("main.tf", MAIN), ("empty.tf", "")]);

    terratag()
        .arg("--dir")
        .arg(dir.path())
        .args(["--tags", TAGS, "--terraform-version", "1.5.7", "--report", "json"])
        .arg("--schema")
        .arg(fixture("schema.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tagged\""))
        .stdout(predicate::str::contains("main.terratag.tf"))
        .stdout(predicate::str::contains("\"untouched\""))
        .stdout(predicate::str::contains("empty.tf"));
}

#[test]
fn malformed_tags_touch_nothing() {
    let dir = workspace(&[("main.tf", MAIN)]);

    terratag()
        .arg("--dir")
        .arg(dir.path())
        .args(["--tags", r#"{"env":{"nested":"x"}}"#, "--terraform-version", "12"])
        .arg("--schema")
        .arg(fixture("schema.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "tags must be a flat JSON object of strings",
        ));

    assert_eq!(listing(dir.path()), ["main.tf"]);
}

#[test]
fn uninitialized_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.tf"), MAIN).unwrap();

    terratag()
        .arg("--dir")
        .arg(dir.path())
        .args(["--tags", TAGS, "--terraform-version", "12"])
        .arg("--schema")
        .arg(fixture("schema.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("terraform init"));

    assert_eq!(listing(dir.path()), ["main.tf"]);
}

#[test]
fn invalid_version() {
    terratag()
        .args(["--tags", TAGS, "--terraform-version", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized terraform version"));
}

#[test]
fn tags_are_required() {
    terratag()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tags"));
}
