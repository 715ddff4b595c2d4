// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Classify each ticket's transaction log and extract the timestamps of watched lifecycle events
// role: core/classification
// inputs: Batches of ticket ids; ConduitApi for transaction logs; WatchSet; ClassifierPolicy
// outputs: Per-ticket EventMap (event key -> unix timestamp)
// invariants:
// - Each matching rule overwrites its key, so the stored value is the last match in traversal order
// - Chronological order sorts the log by ascending timestamp (stable) before classification
// - Malformed values normalize to sets that never match; they never raise
// errors: Collaborator failures propagate; empty batches and empty logs are logged only
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conduit::ConduitApi;
use crate::conduit::methods;
use crate::model::{EventKey, EventMap, TransactionRecord, TxnKind, TxnValue, normalize_status};
use crate::tags::TagMap;

/// Which status transactions count as the ticket being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosureRule {
  /// The new status is any closed status.
  #[default]
  AnyClosed,
  /// The old status was open and the new one is closed.
  OpenToClosed,
}

/// Order in which a ticket's transactions are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionOrder {
  /// Sort by ascending timestamp first; the latest occurrence of an event wins.
  #[default]
  Chronological,
  /// Walk the log exactly as the tracker returned it.
  AsDelivered,
}

/// Status words treated as closed. Anything else, including unknown words, is open.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusVocabulary {
  closed: Vec<String>,
}

impl StatusVocabulary {
  pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
    let mut closed: Vec<String> = Vec::with_capacity(words.len());

    for w in words {
      let n = normalize_status(w.as_ref());
      if !n.is_empty() && !closed.contains(&n) {
        closed.push(n);
      }
    }

    Self { closed }
  }

  pub fn is_closed(&self, status: &str) -> bool {
    let n = normalize_status(status);
    self.closed.iter().any(|c| *c == n)
  }

  pub fn words(&self) -> Vec<String> {
    self.closed.clone()
  }
}

impl Default for StatusVocabulary {
  fn default() -> Self {
    Self::new(&["resolved", "invalid", "duplicate", "wontfix"])
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassifierPolicy {
  pub closure_rule: ClosureRule,
  pub order: TransactionOrder,
  pub closed: StatusVocabulary,
}

impl ClassifierPolicy {
  fn closes(&self, txn: &TransactionRecord) -> bool {
    let new_closed = txn.new_value.as_word().is_some_and(|s| self.closed.is_closed(s));

    match self.closure_rule {
      ClosureRule::AnyClosed => new_closed,
      ClosureRule::OpenToClosed => {
        let old_closed = txn.old_value.as_word().is_some_and(|s| self.closed.is_closed(s));
        !old_closed && new_closed
      }
    }
  }
}

/// The complete set of watched events for one run. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSet {
  qa_verified_phid: String,
  tags: Vec<(String, String)>,
  custom_fields: Vec<String>,
}

impl WatchSet {
  pub fn new(tag_map: &TagMap, custom_fields: &[String]) -> Self {
    Self {
      qa_verified_phid: tag_map.qa_verified_phid().to_string(),
      tags: tag_map
        .requested()
        .map(|(slug, phid)| (slug.to_string(), phid.to_string()))
        .collect(),
      custom_fields: custom_fields.to_vec(),
    }
  }

  pub fn tag_slugs(&self) -> impl Iterator<Item = &str> {
    self.tags.iter().map(|(slug, _)| slug.as_str())
  }

  pub fn custom_fields(&self) -> &[String] {
    &self.custom_fields
  }

  /// Every key this run can record, in report order.
  pub fn keys(&self) -> Vec<EventKey> {
    let mut keys = vec![EventKey::Created, EventKey::Closed, EventKey::QaVerified];
    keys.extend(self.tags.iter().map(|(slug, _)| EventKey::Tagged(slug.clone())));
    keys.extend(self.custom_fields.iter().map(|f| EventKey::CustomField(f.clone())));
    keys
  }
}

/// Flatten a transaction value into the identifiers it carries.
///
/// Lists are used as-is, strings yield the suffix of every embedded `PHID-BUGC-<name>`,
/// and any other scalar becomes a single element that real identifiers never equal.
pub fn normalize_value(value: &TxnValue) -> Vec<String> {
  static RE_PHID: Lazy<Regex> = Lazy::new(|| Regex::new(r"PHID-BUGC-([A-Za-z_-]+)").unwrap());

  match value {
    TxnValue::Absent => Vec::new(),
    TxnValue::List(items) => items.clone(),
    TxnValue::Text(s) => RE_PHID.captures_iter(s).map(|c| c[1].to_string()).collect(),
    TxnValue::Scalar(s) => vec![s.clone()],
  }
}

fn newly_added(item: &str, new_values: &[String], old_values: &[String]) -> bool {
  new_values.iter().any(|v| v == item) && !old_values.iter().any(|v| v == item)
}

fn classify_txn(events: &mut EventMap, txn: &TransactionRecord, watch: &WatchSet, policy: &ClassifierPolicy) {
  let ts = txn.date_created;

  match txn.kind {
    TxnKind::Create => {
      events.insert(EventKey::Created, ts);
    }
    TxnKind::Status => {
      if policy.closes(txn) {
        events.insert(EventKey::Closed, ts);
      }
    }
    TxnKind::CustomField => {
      let new_values = normalize_value(&txn.new_value);
      let old_values = normalize_value(&txn.old_value);

      for field in &watch.custom_fields {
        if newly_added(field, &new_values, &old_values) {
          events.insert(EventKey::CustomField(field.clone()), ts);
        }
      }
    }
    TxnKind::Edge => {
      let new_values = normalize_value(&txn.new_value);
      let old_values = normalize_value(&txn.old_value);

      if newly_added(&watch.qa_verified_phid, &new_values, &old_values) {
        events.insert(EventKey::QaVerified, ts);
      }

      for (slug, phid) in &watch.tags {
        if newly_added(phid, &new_values, &old_values) {
          events.insert(EventKey::Tagged(slug.clone()), ts);
        }
      }
    }
    TxnKind::Other(_) => {}
  }
}

/// Extract watched-event timestamps from one ticket's transaction log.
pub fn classify_log(log: &[TransactionRecord], watch: &WatchSet, policy: &ClassifierPolicy) -> EventMap {
  let mut ordered: Vec<&TransactionRecord> = log.iter().collect();

  if policy.order == TransactionOrder::Chronological {
    ordered.sort_by_key(|t| t.date_created);
  }

  let mut events = EventMap::new();

  for txn in ordered {
    classify_txn(&mut events, txn, watch, policy);
  }

  events
}

/// Fetch the transaction logs for one batch of tickets and classify each of them.
pub fn extract_batch(
  api: &dyn ConduitApi,
  ids: &[u64],
  watch: &WatchSet,
  policy: &ClassifierPolicy,
) -> Result<BTreeMap<u64, EventMap>> {
  if ids.is_empty() {
    info!("No tickets in batch; skipping transaction fetch");
    return Ok(BTreeMap::new());
  }

  info!(count = ids.len(), "Get transaction data from {} tickets", ids.len());
  let logs = methods::task_transactions(api, ids)?;

  if logs.values().all(|log| log.is_empty()) {
    warn!(first_id = ids[0], "No transactions found for batch");
  }

  let mut out = BTreeMap::new();

  for (id, log) in logs {
    let events = classify_log(&log, watch, policy);
    debug!(ticket = id, transactions = log.len(), events = events.len(), "classified");
    out.insert(id, events);
  }

  Ok(out)
}
