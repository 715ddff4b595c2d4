// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Conduit (Phabricator API) access behind a trait seam: HTTP backend via ureq and an env-backed fixture backend
// role: conduit/api
// inputs: Config (host, token); env LIFECYCLE_TEST_* fixtures select the env backend
// outputs: Raw `result` JSON of maniphest.search, maniphest.gettasktransactions and project.search
// side_effects: Network calls to <host>/api/<method>
// invariants:
// - Every call is a single attempt; no retries
// - A Conduit error_code, transport failure or HTTP error status is returned as Err
// errors: anyhow errors naming the Conduit method; callers abort the run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use crate::config::Config;
use crate::constraints::SearchConstraints;
use crate::ext::serde_json::JsonFetch;

const USER_AGENT: &str = concat!("ticket-lifecycle-report/", env!("CARGO_PKG_VERSION"));

pub const ENV_SEARCH: &str = "LIFECYCLE_TEST_SEARCH_JSON";
pub const ENV_TRANSACTIONS: &str = "LIFECYCLE_TEST_TRANSACTIONS_JSON";
pub const ENV_PROJECTS: &str = "LIFECYCLE_TEST_PROJECTS_JSON";
pub const ENV_ERROR: &str = "LIFECYCLE_TEST_CONDUIT_ERROR";

// --- Trait seam for Conduit ---
pub trait ConduitApi {
  /// `maniphest.search`; returns `{data: [...], cursor: {after}}`.
  fn search_tasks_json(&self, constraints: &SearchConstraints, limit: usize, after: Option<&str>) -> Result<Value>;
  /// `maniphest.gettasktransactions`; returns `{"<id>": [txn, ...]}`.
  fn task_transactions_json(&self, ids: &[u64]) -> Result<Value>;
  /// `project.search` by slug; returns `{maps: {slugMap: {...}}}`.
  fn project_search_json(&self, slugs: &[String]) -> Result<Value>;
}

/// Unwrap the Conduit response envelope `{result, error_code, error_info}`.
fn unwrap_envelope(method: &str, envelope: Value) -> Result<Value> {
  if let Some(code) = envelope.fetch("error_code").to::<String>() {
    let info = envelope.fetch("error_info").to::<String>().unwrap_or_default();
    bail!("Conduit {} failed: {} ({})", method, info, code);
  }

  Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
}

struct ConduitHttpApi {
  agent: ureq::Agent,
  base_url: String,
  token: String,
}

impl ConduitHttpApi {
  fn new(host: &str, token: String) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(Duration::from_secs(120)))
      .build()
      .into();
    let base_url = host.trim_end_matches('/').trim_end_matches("/api").to_string();

    Self { agent, base_url, token }
  }

  fn call(&self, method: &str, mut params: Value) -> Result<Value> {
    let url = format!("{}/api/{}", self.base_url, method);
    params["__conduit__"] = json!({ "token": self.token });
    let encoded = serde_json::to_string(&params)?;

    let mut resp = self
      .agent
      .post(&url)
      .header("User-Agent", USER_AGENT)
      .header("Accept", "application/json")
      .send_form([("params", encoded.as_str()), ("output", "json"), ("__conduit__", "1")])
      .with_context(|| format!("calling Conduit method {}", method))?;

    let envelope = resp
      .body_mut()
      .read_json::<Value>()
      .with_context(|| format!("decoding Conduit {} response", method))?;

    unwrap_envelope(method, envelope)
  }
}

impl ConduitApi for ConduitHttpApi {
  fn search_tasks_json(&self, constraints: &SearchConstraints, limit: usize, after: Option<&str>) -> Result<Value> {
    self.call(
      "maniphest.search",
      json!({ "constraints": constraints, "limit": limit, "after": after }),
    )
  }

  fn task_transactions_json(&self, ids: &[u64]) -> Result<Value> {
    self.call("maniphest.gettasktransactions", json!({ "ids": ids }))
  }

  fn project_search_json(&self, slugs: &[String]) -> Result<Value> {
    self.call("project.search", json!({ "constraints": { "slugs": slugs } }))
  }
}

/// Backend that serves fixtures from LIFECYCLE_TEST_* environment variables.
///
/// Search pages are a JSON array; the cursor handed out is the index of the next page.
struct ConduitEnvApi;

impl ConduitEnvApi {
  fn read(var: &str) -> Result<Option<Value>> {
    if let Ok(msg) = std::env::var(ENV_ERROR) {
      bail!("Conduit fixture error: {}", msg);
    }

    match std::env::var(var) {
      Ok(s) => Ok(Some(serde_json::from_str::<Value>(&s).with_context(|| format!("parsing {}", var))?)),
      Err(_) => Ok(None),
    }
  }
}

impl ConduitApi for ConduitEnvApi {
  fn search_tasks_json(&self, _constraints: &SearchConstraints, _limit: usize, after: Option<&str>) -> Result<Value> {
    let pages = Self::read(ENV_SEARCH)?
      .and_then(|v| v.as_array().cloned())
      .unwrap_or_default();
    let index = match after {
      Some(a) => a.parse::<usize>().with_context(|| format!("bad fixture cursor {:?}", a))?,
      None => 0,
    };

    let data = pages.get(index).map(|p| p.fetch("data").to_or_default::<Value>()).unwrap_or(json!([]));
    let next = if index + 1 < pages.len() { Some((index + 1).to_string()) } else { None };

    Ok(json!({ "data": data, "cursor": { "after": next } }))
  }

  fn task_transactions_json(&self, ids: &[u64]) -> Result<Value> {
    let all = Self::read(ENV_TRANSACTIONS)?.unwrap_or(json!({}));
    let mut out = serde_json::Map::new();

    for id in ids {
      let key = id.to_string();
      if let Some(log) = all.get(&key) {
        out.insert(key, log.clone());
      }
    }

    Ok(Value::Object(out))
  }

  fn project_search_json(&self, slugs: &[String]) -> Result<Value> {
    let all = Self::read(ENV_PROJECTS)?.unwrap_or(json!({}));
    let mut slug_map = serde_json::Map::new();

    for slug in slugs {
      if let Some(phid) = all.get(slug).and_then(|v| v.as_str()) {
        slug_map.insert(slug.clone(), json!({ "slug": slug, "projectPHID": phid }));
      }
    }

    Ok(json!({ "data": [], "maps": { "slugMap": slug_map } }))
  }
}

fn env_wants_mock() -> bool {
  [ENV_SEARCH, ENV_TRANSACTIONS, ENV_PROJECTS, ENV_ERROR]
    .iter()
    .any(|k| std::env::var(k).is_ok())
}

/// Build the Conduit backend for a run: env fixtures when present, HTTP otherwise.
pub fn build_api(cfg: &Config) -> Box<dyn ConduitApi> {
  if env_wants_mock() {
    Box::new(ConduitEnvApi)
  } else {
    Box::new(ConduitHttpApi::new(&cfg.host, cfg.api_token.clone()))
  }
}

// Public constructors for dependency injection in higher layers/tests.
#[cfg(any(test, feature = "testutil"))]
pub fn make_http_api(host: &str, token: &str) -> Box<dyn ConduitApi> {
  Box::new(ConduitHttpApi::new(host, token.to_string()))
}

#[cfg(any(test, feature = "testutil"))]
pub fn make_env_api() -> Box<dyn ConduitApi> {
  Box::new(ConduitEnvApi)
}
