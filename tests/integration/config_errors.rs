use predicates::prelude::*;
use test_support::{cmd_bin, conduit_env, write_config, BIN};

#[test]
fn missing_config_file_names_the_path() {
  let td = test_support::tempdir();
  let missing = td.path().join("absent.toml");

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&missing)
    .args(["-c", "2021C1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn zero_batch_size_is_a_config_error() {
  let td = test_support::tempdir();
  let path = td.path().join("lifecycle.toml");
  std::fs::write(
    &path,
    test_support::config_toml("").replace("fetch_batch_size = 2", "fetch_batch_size = 0"),
  )
  .unwrap();

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&path)
    .args(["-c", "2021C1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("fetch_batch_size"));
}

#[test]
fn custom_field_shadowing_a_base_field_is_rejected() {
  let td = test_support::tempdir();
  let config = write_config(td.path(), "[custom_fields]\nenabled = [\"closed\"]\n");

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&config)
    .args(["-c", "2021C1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("collides with a built-in report field"));
}

#[test]
fn unknown_project_tags_abort_before_any_output() {
  let td = test_support::tempdir();
  let config = write_config(td.path(), "");
  let out_path = td.path().join("report.csv");

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&config)
    .args(["-c", "2021C1", "-p", "messaging,mesaging,ghost", "--out"])
    .arg(&out_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("You have misspelled some project tags: mesaging, ghost"));

  assert!(!out_path.exists());
}

#[test]
fn malformed_project_tags_are_rejected() {
  cmd_bin(BIN)
    .args(["-c", "2021C1", "-p", "messaging,no spaces"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Malformed project tags: no spaces"));
}

#[test]
fn conduit_failure_aborts_without_writing() {
  let td = test_support::tempdir();
  let config = write_config(td.path(), "");
  let out_path = td.path().join("report.csv");

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .env("LIFECYCLE_TEST_CONDUIT_ERROR", "ERR-CONDUIT-CORE: upstream unavailable")
    .arg("--config")
    .arg(&config)
    .args(["-c", "2021C1", "--out"])
    .arg(&out_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("upstream unavailable"));

  assert!(!out_path.exists());
}

#[test]
fn env_token_satisfies_missing_file_token() {
  let td = test_support::tempdir();
  let path = td.path().join("lifecycle.toml");
  std::fs::write(
    &path,
    test_support::config_toml("").replace("api_token = \"api-test-token\"\n", ""),
  )
  .unwrap();

  cmd_bin(BIN)
    .envs(conduit_env("empty"))
    .arg("--config")
    .arg(&path)
    .args(["-c", "2021C1", "-q"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("LIFECYCLE_API_TOKEN"));

  cmd_bin(BIN)
    .envs(conduit_env("empty"))
    .env("LIFECYCLE_API_TOKEN", "api-from-env")
    .arg("--config")
    .arg(&path)
    .args(["-c", "2021C1", "-q"])
    .assert()
    .success();
}
