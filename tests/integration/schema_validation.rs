use jsonschema::validator_for;
use test_support::{cmd_bin, conduit_env, write_config, BIN};

fn read_schema(name: &str) -> serde_json::Value {
  let path = test_support::schemas_dir().join(name);
  let data = std::fs::read(&path).expect("schema file");
  serde_json::from_slice(&data).expect("valid schema JSON")
}

fn compile_schema(name: &str) -> jsonschema::Validator {
  let schema = read_schema(name);
  validator_for(&schema).expect("compile schema")
}

fn json_report(fixtures: &str, extra: &str, args: &[&str]) -> serde_json::Value {
  let td = test_support::tempdir();
  let config = write_config(td.path(), extra);

  let out = cmd_bin(BIN)
    .envs(conduit_env(fixtures))
    .arg("--config")
    .arg(&config)
    .args(["--format", "json", "--tz", "utc", "-q"])
    .args(args)
    .output()
    .unwrap();

  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn tagged_report_conforms_to_schema() {
  let v = json_report(
    "basic",
    "[custom_fields]\nenabled = [\"root_cause_frontend\", \"root_cause_backend\"]\n",
    &["-c", "2021C1", "-p", "messaging,client_success"],
  );

  let compiled = compile_schema("lifecycle-report.schema.json");
  compiled.validate(&v).expect("schema validation failed for tagged report");

  let fields: Vec<&str> = v["fields"].as_array().unwrap().iter().filter_map(|f| f.as_str()).collect();
  assert_eq!(
    &fields[9..],
    &["tagged_messaging", "tagged_client_success", "root_cause_frontend", "root_cause_backend"]
  );
}

#[test]
fn empty_explicit_window_report_conforms_to_schema() {
  let v = json_report("empty", "", &["-s", "1609459200", "-e", "1609545599"]);

  let compiled = compile_schema("lifecycle-report.schema.json");
  compiled.validate(&v).expect("schema validation failed for empty report");
  assert_eq!(v["window"]["end"], 1_609_545_599);
}
