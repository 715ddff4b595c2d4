// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed wrappers over ConduitApi: search pages, per-ticket transaction logs, slug -> PHID resolution
// role: conduit/methods
// inputs: &dyn ConduitApi plus method arguments
// outputs: SearchPage, BTreeMap<ticket id, Vec<TransactionRecord>>, BTreeMap<slug, PHID>
// invariants:
// - Integers are read leniently (number or numeric string)
// - PHP-style empty maps (`[]`) decode as empty maps
// - A dateClosed of 0/null means "never closed"; an empty cursor means "last page"
// errors: Missing required task fields or non-object payloads are errors naming the method
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tracing::warn;

use crate::conduit::ConduitApi;
use crate::constraints::SearchConstraints;
use crate::ext::serde_json::JsonFetch;
use crate::model::{SearchPage, TicketRecord, TicketStatus, TransactionRecord, TxnKind, TxnValue};

/// Conduit serializes an empty PHP array as `[]` even where a map is expected.
fn as_object_lenient<'a>(v: Option<&'a Value>, what: &str) -> Result<Option<&'a serde_json::Map<String, Value>>> {
  match v {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Object(map)) => Ok(Some(map)),
    Some(Value::Array(a)) if a.is_empty() => Ok(None),
    Some(other) => bail!("{}: expected an object, got {}", what, other),
  }
}

fn parse_task(item: &Value) -> Result<TicketRecord> {
  let id = item
    .fetch("id")
    .to_i64_lenient()
    .filter(|id| *id > 0)
    .ok_or_else(|| anyhow!("task without a valid id: {}", item))?;

  let date_created = item
    .fetch("fields.dateCreated")
    .to_i64_lenient()
    .ok_or_else(|| anyhow!("task T{} has no dateCreated", id))?;

  let status_raw = item
    .fetch("fields.status.value")
    .to::<String>()
    .or_else(|| item.fetch("fields.status.name").to::<String>())
    .unwrap_or_default();

  Ok(TicketRecord {
    id: id as u64,
    phid: item.fetch("phid").to_or_default::<String>(),
    title: item.fetch("fields.name").to_or_default::<String>(),
    status: TicketStatus::from_value(&status_raw),
    priority: item.fetch("fields.priority.value").to_i64_lenient().unwrap_or(0),
    date_created,
    date_closed: item.fetch("fields.dateClosed").to_i64_lenient().filter(|t| *t > 0),
  })
}

/// One page of `maniphest.search`.
pub fn search_page(
  api: &dyn ConduitApi,
  constraints: &SearchConstraints,
  limit: usize,
  after: Option<&str>,
) -> Result<SearchPage> {
  let v = api.search_tasks_json(constraints, limit, after)?;

  let data = v
    .fetch("data")
    .value()
    .and_then(Value::as_array)
    .ok_or_else(|| anyhow!("maniphest.search: response has no data array"))?;

  let mut records = Vec::with_capacity(data.len());

  for item in data {
    records.push(parse_task(item).context("maniphest.search: malformed task")?);
  }

  let after = v
    .fetch("cursor.after")
    .to_i64_lenient()
    .map(|n| n.to_string())
    .or_else(|| v.fetch("cursor.after").to::<String>())
    .filter(|s| !s.is_empty());

  Ok(SearchPage { records, after })
}

fn parse_txn(ticket_id: u64, item: &Value) -> Option<TransactionRecord> {
  let date_created = item.fetch("dateCreated").to_i64_lenient()?;
  let null = Value::Null;

  Some(TransactionRecord {
    ticket_id,
    kind: TxnKind::from_wire(&item.fetch("transactionType").to_or_default::<String>()),
    old_value: TxnValue::from_json(item.fetch("oldValue").value().unwrap_or(&null)),
    new_value: TxnValue::from_json(item.fetch("newValue").value().unwrap_or(&null)),
    date_created,
  })
}

/// Transaction logs for a batch of tickets, in the order Conduit returned them.
pub fn task_transactions(api: &dyn ConduitApi, ids: &[u64]) -> Result<BTreeMap<u64, Vec<TransactionRecord>>> {
  let v = api.task_transactions_json(ids)?;
  let mut out = BTreeMap::new();

  let Some(map) = as_object_lenient(Some(&v), "maniphest.gettasktransactions")? else {
    return Ok(out);
  };

  for (key, log) in map {
    let ticket_id = key
      .parse::<u64>()
      .with_context(|| format!("maniphest.gettasktransactions: bad task id {:?}", key))?;

    let mut txns = Vec::new();

    for item in log.as_array().map(Vec::as_slice).unwrap_or_default() {
      match parse_txn(ticket_id, item) {
        Some(t) => txns.push(t),
        None => warn!(ticket = ticket_id, "skipping transaction without dateCreated"),
      }
    }

    out.insert(ticket_id, txns);
  }

  Ok(out)
}

/// Resolve project slugs to PHIDs. Unknown slugs are simply absent from the result.
pub fn resolve_project_phids(api: &dyn ConduitApi, slugs: &[String]) -> Result<BTreeMap<String, String>> {
  let mut out = BTreeMap::new();

  if slugs.is_empty() {
    return Ok(out);
  }

  let v = api.project_search_json(slugs)?;

  if let Some(map) = as_object_lenient(v.fetch("maps.slugMap").value(), "project.search slugMap")? {
    for (slug, entry) in map {
      if let Some(phid) = entry.fetch("projectPHID").to::<String>() {
        out.insert(slug.clone(), phid);
      }
    }
  }

  Ok(out)
}
