//! Scenario: `oms collectors` works from config alone.
//!
//! # Invariant under test
//! Listing collectors never opens a database connection; the built-in
//! defaults register the three mock channels.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn collectors_lists_default_mock_channels_without_db() -> anyhow::Result<()> {
    Command::cargo_bin("oms")?
        .env_remove("OMS_DATABASE_URL")
        .arg("collectors")
        .assert()
        .success()
        .stdout(predicate::str::contains("channel=NAVER type=MOCK connected=true"))
        .stdout(predicate::str::contains("channel=COUPANG type=MOCK"))
        .stdout(predicate::str::contains("channel=11ST type=MOCK"))
        .stdout(predicate::str::contains("collectors=3"));
    Ok(())
}

#[test]
fn db_backed_command_without_url_names_the_env_var() -> anyhow::Result<()> {
    Command::cargo_bin("oms")?
        .env_remove("OMS_DATABASE_URL")
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OMS_DATABASE_URL"));
    Ok(())
}
