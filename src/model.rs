// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the ticket, transaction and watched-event types shared by fetching, classification and reporting
// role: model/types
// outputs: Plain data types; TxnValue/TxnKind decode leniently from Conduit JSON
// invariants: EventMap holds at most one timestamp per key; duration fields use DURATION_SENTINEL when undefined
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::fmt;

/// Value carried by duration fields whose inputs are missing.
pub const DURATION_SENTINEL: i64 = -1;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Status of a ticket as reported by `maniphest.search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
  Open,
  Resolved,
  Invalid,
  Duplicate,
  WontFix,
  Other(String),
}

impl TicketStatus {
  pub fn from_value(raw: &str) -> Self {
    match normalize_status(raw).as_str() {
      "open" => TicketStatus::Open,
      "resolved" => TicketStatus::Resolved,
      "invalid" => TicketStatus::Invalid,
      "duplicate" => TicketStatus::Duplicate,
      "wontfix" => TicketStatus::WontFix,
      _ => TicketStatus::Other(raw.trim().to_string()),
    }
  }
}

impl fmt::Display for TicketStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TicketStatus::Open => f.write_str("OPEN"),
      TicketStatus::Resolved => f.write_str("RESOLVED"),
      TicketStatus::Invalid => f.write_str("INVALID"),
      TicketStatus::Duplicate => f.write_str("DUPLICATE"),
      TicketStatus::WontFix => f.write_str("WONTFIX"),
      TicketStatus::Other(raw) => f.write_str(&raw.to_uppercase()),
    }
  }
}

/// Lower-cases a status word and drops punctuation, so `Won't Fix` and `wontfix` compare equal.
pub fn normalize_status(raw: &str) -> String {
  raw
    .chars()
    .filter(|c| c.is_alphanumeric())
    .flat_map(char::to_lowercase)
    .collect()
}

/// Key of a watched lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKey {
  Created,
  Closed,
  QaVerified,
  Tagged(String),
  CustomField(String),
}

impl EventKey {
  pub fn name(&self) -> String {
    match self {
      EventKey::Created => "created".to_string(),
      EventKey::Closed => "closed".to_string(),
      EventKey::QaVerified => "qa_verified".to_string(),
      EventKey::Tagged(slug) => format!("tagged_{}", slug),
      EventKey::CustomField(name) => name.clone(),
    }
  }
}

impl fmt::Display for EventKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name())
  }
}

pub type EventMap = BTreeMap<EventKey, i64>;

/// One ticket of the run: base attributes from the search plus extracted events and durations.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
  pub id: u64,
  pub phid: String,
  pub title: String,
  pub status: TicketStatus,
  pub priority: i64,
  pub date_created: i64,
  pub date_closed: Option<i64>,
  pub events: EventMap,
  pub days_open_to_closed: i64,
  pub qa_verified_to_closed: i64,
  /// Unix time at which the run fetched this ticket.
  pub extracted_at: i64,
}

impl Ticket {
  pub fn event(&self, key: &EventKey) -> Option<i64> {
    self.events.get(key).copied()
  }
}

/// A record from one `maniphest.search` page, before any events are merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
  pub id: u64,
  pub phid: String,
  pub title: String,
  pub status: TicketStatus,
  pub priority: i64,
  pub date_created: i64,
  pub date_closed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
  pub records: Vec<TicketRecord>,
  pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnKind {
  Create,
  Status,
  Edge,
  CustomField,
  Other(String),
}

impl TxnKind {
  pub fn from_wire(raw: &str) -> Self {
    match raw {
      "core:create" => TxnKind::Create,
      "status" => TxnKind::Status,
      "core:edge" => TxnKind::Edge,
      "core:customfield" => TxnKind::CustomField,
      other => TxnKind::Other(other.to_string()),
    }
  }
}

/// Old or new value of a transaction, kept in the shape the tracker sent it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TxnValue {
  #[default]
  Absent,
  List(Vec<String>),
  Text(String),
  Scalar(String),
}

impl TxnValue {
  pub fn from_json(v: &serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => TxnValue::Absent,
      serde_json::Value::String(s) => TxnValue::Text(s.clone()),
      serde_json::Value::Array(items) => TxnValue::List(
        items
          .iter()
          .map(|item| match item {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
          })
          .collect(),
      ),
      other => TxnValue::Scalar(other.to_string()),
    }
  }

  /// The value as a single word, for status transactions.
  pub fn as_word(&self) -> Option<&str> {
    match self {
      TxnValue::Text(s) | TxnValue::Scalar(s) => Some(s.as_str()),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
  pub ticket_id: u64,
  pub kind: TxnKind,
  pub old_value: TxnValue,
  pub new_value: TxnValue,
  pub date_created: i64,
}
