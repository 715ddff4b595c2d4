use predicates::prelude::*;
use test_support::{cmd_bin, conduit_env, write_config, BIN};

const CUSTOM_FIELDS: &str = "[custom_fields]\nenabled = [\"root_cause_frontend\"]\n";

fn run_basic(extra_args: &[&str]) -> std::process::Output {
  let td = test_support::tempdir();
  let config = write_config(td.path(), CUSTOM_FIELDS);

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&config)
    .args(["--cycle", "2021C1", "--tz", "utc", "--now-override", "1700000000"])
    .args(extra_args)
    .output()
    .unwrap()
}

#[test]
fn csv_report_for_tagged_cycle() {
  let out = run_basic(&["--projects", "messaging", "-q"]);
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  insta::assert_snapshot!(String::from_utf8_lossy(&out.stdout), @r"
  id,status,priority,created,closed,qa_verified,days_open_to_closed,qa_verified_to_closed,timestamp,tagged_messaging,root_cause_frontend
  T101,RESOLVED,80,1609545600,1609977600,0,5,-1,1700000000,0,0
  T102,OPEN,50,1609632000,0,0,-1,-1,1700000000,1609700000,1609750000
  T103,RESOLVED,80,1609718400,1610582400,1610236800,10,4,1700000000,1609804800,1610000000
  ");
}

#[test]
fn untagged_run_has_no_tag_columns() {
  let out = run_basic(&["-q"]);
  assert!(out.status.success());

  let stdout = String::from_utf8_lossy(&out.stdout);
  let header = stdout.lines().next().unwrap();
  assert_eq!(
    header,
    "id,status,priority,created,closed,qa_verified,days_open_to_closed,qa_verified_to_closed,timestamp,root_cause_frontend"
  );
  assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn qa_verified_tag_reuses_configured_phid() {
  let out = run_basic(&["-p", "qa_verified,messaging", "-q"]);
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let stdout = String::from_utf8_lossy(&out.stdout);
  let lines: Vec<&str> = stdout.lines().collect();
  assert!(lines[0].ends_with(",timestamp,tagged_qa_verified,tagged_messaging,root_cause_frontend"));
  assert!(lines[3].starts_with("T103,"));
  assert!(lines[3].ends_with(",1610236800,1609804800,1610000000"));
}

#[test]
fn info_logs_go_to_stderr_unless_quiet() {
  let out = run_basic(&[]);
  assert!(out.status.success());
  let err = String::from_utf8_lossy(&out.stderr);
  assert!(err.contains("Found 3 tickets"), "stderr: {}", err);
  assert!(err.contains("Get transaction data from 2 tickets"), "stderr: {}", err);
  assert!(!String::from_utf8_lossy(&out.stdout).contains("Found"));

  let quiet = run_basic(&["--quiet"]);
  assert!(quiet.status.success());
  assert!(String::from_utf8_lossy(&quiet.stderr).trim().is_empty());
}

#[test]
fn json_report_written_to_nested_out_path() {
  let td = test_support::tempdir();
  let config = write_config(td.path(), CUSTOM_FIELDS);
  let out_path = td.path().join("reports/2021C1/lifecycle.json");

  cmd_bin(BIN)
    .envs(conduit_env("basic"))
    .arg("--config")
    .arg(&config)
    .args(["-c", "2021C1", "--tz", "utc", "--now-override", "2023-11-14T22:13:20Z", "--format", "json", "-q"])
    .arg("--out")
    .arg(&out_path)
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
  assert_eq!(v["generated_at"], 1_700_000_000);
  assert_eq!(v["tickets"].as_array().unwrap().len(), 3);
  assert_eq!(v["tickets"][0]["id"], "T101");
  assert_eq!(v["tickets"][2]["qa_verified_to_closed"], 4);
  assert_eq!(v["tickets"][1]["days_open_to_closed"], -1);
}

#[test]
fn empty_search_still_emits_header() {
  let td = test_support::tempdir();
  let config = write_config(td.path(), "");

  let out = cmd_bin(BIN)
    .envs(conduit_env("empty"))
    .arg("--config")
    .arg(&config)
    .args(["-c", "2021C2", "--tz", "utc"])
    .output()
    .unwrap();

  assert!(out.status.success());
  assert_eq!(
    String::from_utf8_lossy(&out.stdout),
    "id,status,priority,created,closed,qa_verified,days_open_to_closed,qa_verified_to_closed,timestamp\n"
  );
  assert!(String::from_utf8_lossy(&out.stderr).contains("No tickets found"));
}
