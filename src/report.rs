// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Assemble per-ticket report rows in a fixed field order and render them as CSV or JSON
// role: rendering/report
// inputs: Ticket set with events and durations; WatchSet (tags, custom fields); date window; generation time
// outputs: Report (fields + rows) and its CSV or JSON text
// invariants:
// - Field order: base fields, then tagged_<slug> per requested tag, then enabled custom fields
// - id renders as T<id>; status is upper-cased; string cells default to "-", numeric cells to 0
// - Rows are ordered by ascending ticket id
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::classify::WatchSet;
use crate::model::{EventKey, Ticket};
use crate::window::DateWindow;

pub const BASE_FIELDS: [&str; 9] = [
  "id",
  "status",
  "priority",
  "created",
  "closed",
  "qa_verified",
  "days_open_to_closed",
  "qa_verified_to_closed",
  "timestamp",
];

const MISSING_TEXT: &str = "-";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
  #[default]
  Csv,
  Json,
}

/// One report column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportField {
  Id,
  Status,
  Priority,
  Event(EventKey),
  DaysOpenToClosed,
  QaVerifiedToClosed,
  Timestamp,
}

impl ReportField {
  pub fn name(&self) -> String {
    match self {
      ReportField::Id => "id".to_string(),
      ReportField::Status => "status".to_string(),
      ReportField::Priority => "priority".to_string(),
      ReportField::Event(key) => key.name(),
      ReportField::DaysOpenToClosed => "days_open_to_closed".to_string(),
      ReportField::QaVerifiedToClosed => "qa_verified_to_closed".to_string(),
      ReportField::Timestamp => "timestamp".to_string(),
    }
  }

  fn cell(&self, ticket: &Ticket) -> Cell {
    match self {
      ReportField::Id => Cell::Text(format!("T{}", ticket.id)),
      ReportField::Status => {
        let status = ticket.status.to_string();
        Cell::Text(if status.is_empty() { MISSING_TEXT.to_string() } else { status })
      }
      ReportField::Priority => Cell::Number(ticket.priority),
      ReportField::Event(key) => Cell::Number(ticket.event(key).unwrap_or(0)),
      ReportField::DaysOpenToClosed => Cell::Number(ticket.days_open_to_closed),
      ReportField::QaVerifiedToClosed => Cell::Number(ticket.qa_verified_to_closed),
      ReportField::Timestamp => Cell::Number(ticket.extracted_at),
    }
  }
}

/// Columns for this run, in output order.
pub fn fields(watch: &WatchSet) -> Vec<ReportField> {
  let mut out = vec![
    ReportField::Id,
    ReportField::Status,
    ReportField::Priority,
    ReportField::Event(EventKey::Created),
    ReportField::Event(EventKey::Closed),
    ReportField::Event(EventKey::QaVerified),
    ReportField::DaysOpenToClosed,
    ReportField::QaVerifiedToClosed,
    ReportField::Timestamp,
  ];

  out.extend(watch.tag_slugs().map(|slug| ReportField::Event(EventKey::Tagged(slug.to_string()))));
  out.extend(
    watch
      .custom_fields()
      .iter()
      .map(|f| ReportField::Event(EventKey::CustomField(f.clone()))),
  );

  out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
  Text(String),
  Number(i64),
}

impl Cell {
  fn to_json(&self) -> Value {
    match self {
      Cell::Text(s) => Value::String(s.clone()),
      Cell::Number(n) => json!(n),
    }
  }

  fn to_csv(&self) -> String {
    match self {
      Cell::Text(s) => csv_escape(s),
      Cell::Number(n) => n.to_string(),
    }
  }
}

fn csv_escape(s: &str) -> String {
  if s.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_string()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
  pub fields: Vec<ReportField>,
  pub rows: Vec<Vec<Cell>>,
  pub window: DateWindow,
  pub generated_at: i64,
}

/// Build one row per ticket, ordered by ticket id.
pub fn assemble(tickets: &BTreeMap<u64, Ticket>, watch: &WatchSet, window: DateWindow, generated_at: i64) -> Report {
  let fields = fields(watch);
  let rows = tickets
    .values()
    .map(|t| fields.iter().map(|f| f.cell(t)).collect())
    .collect();

  Report { fields, rows, window, generated_at }
}

impl Report {
  pub fn header(&self) -> Vec<String> {
    self.fields.iter().map(ReportField::name).collect()
  }

  pub fn render_csv(&self) -> String {
    let mut out = String::new();
    let header: Vec<String> = self.header().iter().map(|h| csv_escape(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in &self.rows {
      let cells: Vec<String> = row.iter().map(Cell::to_csv).collect();
      out.push_str(&cells.join(","));
      out.push('\n');
    }

    out
  }

  pub fn render_json(&self) -> Result<String> {
    let names = self.header();
    let tickets: Vec<Value> = self
      .rows
      .iter()
      .map(|row| {
        let obj: Map<String, Value> = names.iter().cloned().zip(row.iter().map(Cell::to_json)).collect();
        Value::Object(obj)
      })
      .collect();

    let doc = json!({
      "generated_at": self.generated_at,
      "window": { "start": self.window.start, "end": self.window.end },
      "fields": names,
      "tickets": tickets,
    });

    let mut s = serde_json::to_string_pretty(&doc)?;
    s.push('\n');

    Ok(s)
  }

  pub fn render(&self, format: OutputFormat) -> Result<String> {
    match format {
      OutputFormat::Csv => Ok(self.render_csv()),
      OutputFormat::Json => self.render_json(),
    }
  }
}
