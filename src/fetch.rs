// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Page through maniphest.search and accumulate the run's ticket set keyed by id
// role: query/fetch
// inputs: ConduitApi, SearchConstraints, page size, extraction timestamp
// outputs: BTreeMap<ticket id, Ticket> with days_open_to_closed already derived
// invariants:
// - Paging starts without a cursor and stops exactly when the returned cursor is empty
// - Every page is merged, including the last one
// - Later pages overwrite earlier records for the same id
// errors: Any collaborator error aborts the fetch; an empty result is only logged
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::conduit::ConduitApi;
use crate::conduit::methods;
use crate::constraints::SearchConstraints;
use crate::metrics::days_between;
use crate::model::{DURATION_SENTINEL, EventMap, Ticket, TicketRecord};

fn ticket_from_record(record: TicketRecord, extracted_at: i64) -> Ticket {
  let days_open_to_closed = record
    .date_closed
    .map(|closed| days_between(record.date_created, closed))
    .unwrap_or(DURATION_SENTINEL);

  Ticket {
    id: record.id,
    phid: record.phid,
    title: record.title,
    status: record.status,
    priority: record.priority,
    date_created: record.date_created,
    date_closed: record.date_closed,
    events: EventMap::new(),
    days_open_to_closed,
    qa_verified_to_closed: DURATION_SENTINEL,
    extracted_at,
  }
}

/// Fetch every ticket matching `constraints`, `page_size` records per request.
pub fn fetch_tickets(
  api: &dyn ConduitApi,
  constraints: &SearchConstraints,
  page_size: usize,
  extracted_at: i64,
) -> Result<BTreeMap<u64, Ticket>> {
  let mut tickets = BTreeMap::new();
  let mut after: Option<String> = None;
  let mut pages = 0usize;

  loop {
    let page = methods::search_page(api, constraints, page_size, after.as_deref())
      .with_context(|| format!("fetching search page {}", pages + 1))?;
    pages += 1;
    debug!(page = pages, records = page.records.len(), "search page");

    for record in page.records {
      tickets.insert(record.id, ticket_from_record(record, extracted_at));
    }

    match page.after {
      Some(next) => after = Some(next),
      None => break,
    }
  }

  if tickets.is_empty() {
    info!("No tickets found");
  } else {
    info!(count = tickets.len(), pages, "Found {} tickets", tickets.len());
  }

  Ok(tickets)
}
