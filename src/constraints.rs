// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build the maniphest.search constraint object from date window, project PHIDs and the bugs-only flag
// role: query/constraints
// inputs: Optional DateWindow bounds, requested project PHIDs, bugs-only flag, configured bug subtypes
// outputs: SearchConstraints serialized as the Conduit `constraints` parameter
// invariants:
// - No project PHIDs => the bug-subtype restriction is always applied
// - All project PHIDs share one `projects` constraint, which Maniphest matches with AND semantics
// - createdStart/createdEnd are omitted when unbounded
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::Serialize;

use crate::window::DateWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConstraints {
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub projects: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub subtypes: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_start: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_end: Option<i64>,
}

impl SearchConstraints {
  pub fn restricts_to_bugs(&self) -> bool {
    !self.subtypes.is_empty()
  }
}

pub fn build_constraints(
  window: Option<&DateWindow>,
  project_phids: &[String],
  only_bugs: bool,
  bug_subtypes: &[String],
) -> SearchConstraints {
  // A search with no project filter is too broad without the subtype restriction.
  let restrict = only_bugs || project_phids.is_empty();

  SearchConstraints {
    projects: project_phids.to_vec(),
    subtypes: if restrict { bug_subtypes.to_vec() } else { Vec::new() },
    created_start: window.and_then(|w| w.start),
    created_end: window.and_then(|w| w.end),
  }
}
