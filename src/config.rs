// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load and validate the immutable run configuration (Conduit access, batch size, watched custom fields, classification policy)
// role: configuration
// inputs: TOML file path; env LIFECYCLE_API_TOKEN overrides the file's api_token
// outputs: Config, constructed once at startup and passed by reference to every stage
// invariants:
// - fetch_batch_size >= 1; host, token and QA PHID are non-empty
// - custom field names are unique, well-formed and never shadow a base report field
// errors: Missing file, TOML syntax and validation failures surface before any ticket fetch
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::classify::{ClassifierPolicy, ClosureRule, StatusVocabulary, TransactionOrder};
use crate::report::BASE_FIELDS;

pub const TOKEN_ENV: &str = "LIFECYCLE_API_TOKEN";

pub const DEFAULT_BUG_SUBTYPES: [&str; 2] = ["bugcategorization", "bugcat"];

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
  conduit: ConduitSection,
  projects: ProjectsSection,
  #[serde(default)]
  custom_fields: CustomFieldsSection,
  #[serde(default)]
  classification: ClassificationSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ConduitSection {
  host: String,
  #[serde(default)]
  api_token: Option<String>,
  #[serde(default = "default_batch_size")]
  fetch_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectsSection {
  qa_verified_phid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CustomFieldsSection {
  #[serde(default)]
  enabled: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ClassificationSection {
  closure_rule: Option<ClosureRule>,
  transaction_order: Option<TransactionOrder>,
  closed_statuses: Option<Vec<String>>,
  bug_subtypes: Option<Vec<String>>,
}

fn default_batch_size() -> usize {
  50
}

/// Effective configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub host: String,
  pub api_token: String,
  pub fetch_batch_size: usize,
  pub qa_verified_phid: String,
  /// Enabled custom fields, in report column order.
  pub custom_fields: Vec<String>,
  pub closure_rule: ClosureRule,
  pub transaction_order: TransactionOrder,
  pub closed_statuses: Vec<String>,
  pub bug_subtypes: Vec<String>,
}

impl Config {
  /// Read `path`, apply the token override from the environment and validate.
  pub fn load(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;

    Self::from_toml_str(&raw, token_from_env())
      .with_context(|| format!("invalid config file {}", path.display()))
  }

  pub fn from_toml_str(raw: &str, token_override: Option<String>) -> Result<Self> {
    let file: ConfigFile = toml::from_str(raw)?;
    let classification = file.classification;

    let cfg = Config {
      host: file.conduit.host.trim().trim_end_matches('/').to_string(),
      api_token: token_override
        .or(file.conduit.api_token)
        .map(|t| t.trim().to_string())
        .unwrap_or_default(),
      fetch_batch_size: file.conduit.fetch_batch_size,
      qa_verified_phid: file.projects.qa_verified_phid.trim().to_string(),
      custom_fields: file.custom_fields.enabled.iter().map(|f| f.trim().to_string()).collect(),
      closure_rule: classification.closure_rule.unwrap_or_default(),
      transaction_order: classification.transaction_order.unwrap_or_default(),
      closed_statuses: classification
        .closed_statuses
        .unwrap_or_else(|| StatusVocabulary::default().words()),
      bug_subtypes: classification
        .bug_subtypes
        .unwrap_or_else(|| DEFAULT_BUG_SUBTYPES.iter().map(|s| s.to_string()).collect()),
    };

    cfg.validate()?;

    Ok(cfg)
  }

  pub fn validate(&self) -> Result<()> {
    if self.host.is_empty() {
      bail!("[conduit] host must not be empty");
    }

    if self.api_token.is_empty() {
      bail!("Missing Conduit API token. Set [conduit] api_token or {}", TOKEN_ENV);
    }

    if self.fetch_batch_size == 0 {
      bail!("[conduit] fetch_batch_size must be at least 1");
    }

    if self.qa_verified_phid.is_empty() {
      bail!("[projects] qa_verified_phid must not be empty");
    }

    if self.closed_statuses.is_empty() {
      bail!("[classification] closed_statuses must list at least one status");
    }

    validate_custom_fields(&self.custom_fields)
  }

  pub fn classifier_policy(&self) -> ClassifierPolicy {
    ClassifierPolicy {
      closure_rule: self.closure_rule,
      order: self.transaction_order,
      closed: StatusVocabulary::new(&self.closed_statuses),
    }
  }
}

fn validate_custom_fields(fields: &[String]) -> Result<()> {
  static RE_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").unwrap());

  let mut seen = BTreeSet::new();

  for field in fields {
    if !RE_FIELD.is_match(field) {
      bail!("Unrecognized custom field name {:?} in [custom_fields] enabled", field);
    }

    if BASE_FIELDS.contains(&field.as_str()) || field.starts_with("tagged_") {
      bail!("Custom field {:?} collides with a built-in report field", field);
    }

    if !seen.insert(field.as_str()) {
      bail!("Custom field {:?} is listed more than once", field);
    }
  }

  Ok(())
}

fn token_from_env() -> Option<String> {
  std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty())
}
