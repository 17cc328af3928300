use std::time::Duration;

use assert_cmd::Command;
use buildpack_notify::freshness::{FreshnessStore, SqliteStore};
use buildpack_notify::test_utils::fixtures::buildpack;
use predicates::prelude::*;
use tempfile::TempDir;

fn command() -> Command {
    let mut cmd = Command::cargo_bin("buildpack-notify").unwrap();
    cmd.env_clear().env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_modes() {
    command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--notify"))
        .stdout(predicate::str::contains("--clear"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    command().args(["--verbose", "--quiet"]).assert().failure();
}

#[test]
fn test_notify_without_configuration_fails() {
    command()
        .arg("--notify")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required configuration"))
        .stderr(predicate::str::contains("CF_API"));
}

#[test]
fn test_unsupported_database_url_fails() {
    command()
        .arg("--clear")
        .env("DATABASE_URL", "postgres://localhost/notify")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DATABASE_URL"));
}

#[test]
fn test_clear_then_keeps_serving_health_checks() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notify.db");
    SqliteStore::open(&path)
        .unwrap()
        .save(&buildpack("bp-1", "python_buildpack", "2016-06-08T16:41:45Z"))
        .unwrap();

    command()
        .arg("--clear")
        .env("DATABASE_URL", format!("sqlite://{}", path.display()))
        .env("PORT", "0")
        .timeout(Duration::from_secs(2))
        .assert()
        .interrupted()
        .stderr(predicate::str::contains("cleared freshness records"))
        .stderr(predicate::str::contains("health-check listener started"));

    assert!(SqliteStore::open(&path).unwrap().load().unwrap().is_empty());
}
