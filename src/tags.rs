// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Parse the requested project tag list and resolve each slug to its project PHID
// role: query/tags
// inputs: Raw comma-separated tag string; ConduitApi for slug lookup; configured QA-verified PHID
// outputs: TagMap (ordered slug -> PHID pairs plus the QA-verified PHID)
// invariants:
// - Slugs are lowercased, trimmed, de-duplicated and keep their first-seen order
// - Every requested slug resolves or the run aborts before any ticket is fetched
// - `qa_verified` maps to the configured PHID without a lookup
// errors: Malformed slugs and unknown slugs are errors listing the offending names
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::conduit::ConduitApi;
use crate::conduit::methods;

pub const QA_VERIFIED_TAG: &str = "qa_verified";

/// Split `--projects` input into normalized slugs.
pub fn parse_project_slugs(raw: &str) -> Result<Vec<String>> {
  static RE_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_.-]+$").unwrap());

  let mut slugs: Vec<String> = Vec::new();
  let mut malformed: Vec<String> = Vec::new();

  for part in raw.split(',') {
    let slug = part.trim().to_lowercase();

    if slug.is_empty() || slugs.contains(&slug) {
      continue;
    }

    if RE_SLUG.is_match(&slug) {
      slugs.push(slug);
    } else {
      malformed.push(slug);
    }
  }

  if !malformed.is_empty() {
    bail!("Malformed project tags: {}", malformed.join(", "));
  }

  Ok(slugs)
}

/// Requested tags with their PHIDs, plus the PHID that marks QA verification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagMap {
  qa_verified_phid: String,
  requested: Vec<(String, String)>,
}

impl TagMap {
  pub fn new(qa_verified_phid: &str, requested: Vec<(String, String)>) -> Self {
    Self { qa_verified_phid: qa_verified_phid.to_string(), requested }
  }

  /// Look up every slug in one `project.search` call.
  pub fn resolve(api: &dyn ConduitApi, slugs: &[String], qa_verified_phid: &str) -> Result<Self> {
    let lookup: Vec<String> = slugs.iter().filter(|s| *s != QA_VERIFIED_TAG).cloned().collect();
    let found = methods::resolve_project_phids(api, &lookup)?;

    let missing: Vec<&str> = lookup
      .iter()
      .filter(|s| !found.contains_key(*s))
      .map(String::as_str)
      .collect();

    if !missing.is_empty() {
      bail!("You have misspelled some project tags: {}", missing.join(", "));
    }

    let requested = slugs
      .iter()
      .map(|slug| {
        let phid = if slug == QA_VERIFIED_TAG {
          qa_verified_phid.to_string()
        } else {
          found[slug].clone()
        };
        (slug.clone(), phid)
      })
      .collect::<Vec<_>>();

    if !requested.is_empty() {
      info!(tags = requested.len(), "Resolved project tags");
    }

    Ok(Self::new(qa_verified_phid, requested))
  }

  pub fn qa_verified_phid(&self) -> &str {
    &self.qa_verified_phid
  }

  pub fn requested(&self) -> impl Iterator<Item = (&str, &str)> {
    self.requested.iter().map(|(slug, phid)| (slug.as_str(), phid.as_str()))
  }

  pub fn project_phids(&self) -> Vec<String> {
    self.requested.iter().map(|(_, phid)| phid.clone()).collect()
  }
}
