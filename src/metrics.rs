use std::collections::BTreeMap;

use crate::model::{DURATION_SENTINEL, EventKey, SECONDS_PER_DAY, Ticket};

/// Whole days from `from` to `to`, rounded towards negative infinity.
pub fn days_between(from: i64, to: i64) -> i64 {
  (to - from).div_euclid(SECONDS_PER_DAY)
}

/// QA-verified to closed, in days. Needs both the search record's closure date and the event.
pub fn qa_verified_to_closed(ticket: &Ticket) -> i64 {
  match (ticket.date_closed, ticket.event(&EventKey::QaVerified)) {
    (Some(closed), Some(verified)) if closed != 0 => days_between(verified, closed),
    _ => DURATION_SENTINEL,
  }
}

/// Fill the event-dependent duration fields of every ticket.
pub fn derive_metrics(tickets: &mut BTreeMap<u64, Ticket>) {
  for ticket in tickets.values_mut() {
    ticket.qa_verified_to_closed = qa_verified_to_closed(ticket);
  }
}
