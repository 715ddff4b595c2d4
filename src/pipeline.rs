// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one run: window -> tags -> constraints -> fetch -> batched classification -> metrics -> report
// role: processing/orchestrator
// inputs: EffectiveConfig (CLI), Config (file), ConduitApi, extraction timestamp
// outputs: Report, rendered and written to --out (file or stdout)
// side_effects: Conduit calls through the api; writes the report file or stdout
// invariants:
// - Configuration and tag errors surface before the first ticket fetch
// - The fetch completes before any transaction batch; batches run one at a time in plan order
// - Events for ids outside the fetched set are ignored
// - Nothing is written unless the whole run succeeds
// errors: Propagates collaborator and write errors with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::batch::plan_batches;
use crate::classify::{WatchSet, extract_batch};
use crate::cli::EffectiveConfig;
use crate::conduit::ConduitApi;
use crate::config::Config;
use crate::constraints::build_constraints;
use crate::fetch::fetch_tickets;
use crate::metrics::derive_metrics;
use crate::model::{EventMap, Ticket};
use crate::report::{Report, assemble};
use crate::tags::TagMap;
use crate::util;
use crate::window::resolve_window;

/// Merge one batch of extracted events into the ticket set.
pub fn merge_events(tickets: &mut BTreeMap<u64, Ticket>, batch: BTreeMap<u64, EventMap>) {
  for (id, events) in batch {
    match tickets.get_mut(&id) {
      Some(ticket) => ticket.events.extend(events),
      None => debug!(ticket = id, "ignoring transactions for a ticket outside the result set"),
    }
  }
}

pub fn generate_report(cfg: &EffectiveConfig, config: &Config, api: &dyn ConduitApi, now: i64) -> Result<Report> {
  let window = resolve_window(&cfg.window, &cfg.tz)?;
  let tags = TagMap::resolve(api, &cfg.projects, &config.qa_verified_phid)?;
  let watch = WatchSet::new(&tags, &config.custom_fields);
  let policy = config.classifier_policy();
  debug!(events = ?watch.keys().iter().map(|k| k.name()).collect::<Vec<_>>(), "watch set");

  let constraints = build_constraints(Some(&window), &tags.project_phids(), cfg.only_bugs, &config.bug_subtypes);

  let label = |t: Option<i64>| t.map(|t| util::iso_in_tz(t, &cfg.tz)).unwrap_or_else(|| "unbounded".into());
  info!(start = %label(window.start), end = %label(window.end), "Date range");

  if constraints.restricts_to_bugs() {
    info!(subtypes = ?constraints.subtypes, "Restricting search to bug subtypes");
  }

  let mut tickets = fetch_tickets(api, &constraints, config.fetch_batch_size, now)?;
  let ids: Vec<u64> = tickets.keys().copied().collect();

  for (n, batch) in plan_batches(&ids, config.fetch_batch_size).iter().enumerate() {
    let events = extract_batch(api, batch, &watch, &policy)
      .with_context(|| format!("fetching transactions for batch {} (from T{})", n + 1, batch[0]))?;
    merge_events(&mut tickets, events);
  }

  derive_metrics(&mut tickets);

  Ok(assemble(&tickets, &watch, window, now))
}

/// Render the report and write it to `cfg.out` ("-" is stdout).
pub fn save_report(cfg: &EffectiveConfig, report: &Report) -> Result<()> {
  let text = report.render(cfg.format)?;

  if cfg.out == "-" {
    print!("{}", text);
    return Ok(());
  }

  let out_path = Path::new(&cfg.out);
  util::write_file(out_path, &text)?;
  info!(path = %out_path.display(), rows = report.rows.len(), "Wrote report");

  Ok(())
}

pub fn run(cfg: &EffectiveConfig, config: &Config, api: &dyn ConduitApi, now: i64) -> Result<()> {
  let report = generate_report(cfg, config, api, now)?;
  save_report(cfg, &report)
}
