use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Creation-date window selection. Bounds are unix seconds: start inclusive, end inclusive.

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum WindowSpec {
  Cycle { cycle: String },
  Epochs { start: i64, end: i64 },
}

/// Creation-date bounds handed to the search; `None` means unbounded on that side.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct DateWindow {
  pub start: Option<i64>,
  pub end: Option<i64>,
}

pub const FIRST_YEAR: i32 = 2019;
pub const LAST_YEAR: i32 = 2029;

/// Parse a cycle label such as `2021C1` into `(year, cycle)`.
pub fn parse_cycle(raw: &str) -> Result<(i32, u32)> {
  static RE_CYCLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d{4})c(\d)$").unwrap());

  let caps = RE_CYCLE
    .captures(raw.trim())
    .ok_or_else(|| anyhow!("Invalid input to cycle {:?}. Format should be \"YYYYCX\"", raw))?;

  let year: i32 = caps[1].parse().context("parsing year in --cycle")?;
  let cycle: u32 = caps[2].parse().context("parsing cycle in --cycle")?;

  if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
    bail!("Invalid year {} ({}-{})", year, FIRST_YEAR, LAST_YEAR);
  }

  if !(1..=6).contains(&cycle) {
    bail!("Invalid cycle {} (1-6)", cycle);
  }

  Ok((year, cycle))
}

fn month_start_in<Z: TimeZone>(zone: &Z, year: i32, month: u32) -> Result<i64> {
  let (y, m) = if month > 12 { (year + 1, month - 12) } else { (year, month) };

  let naive = NaiveDate::from_ymd_opt(y, m, 1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .ok_or_else(|| anyhow!("invalid month {}-{:02}", y, m))?;

  zone
    .from_local_datetime(&naive)
    .earliest()
    .map(|dt| dt.timestamp())
    .ok_or_else(|| anyhow!("{}-{:02}-01T00:00:00 does not exist in the selected timezone", y, m))
}

fn month_start(tz: &str, year: i32, month: u32) -> Result<i64> {
  if tz.eq_ignore_ascii_case("local") {
    return month_start_in(&Local, year, month);
  }

  if tz.eq_ignore_ascii_case("utc") {
    return month_start_in(&Utc, year, month);
  }

  let zone: chrono_tz::Tz = tz
    .parse()
    .map_err(|_| anyhow!("unknown timezone {:?} (use local, utc or an IANA name)", tz))?;

  month_start_in(&zone, year, month)
}

/// Two-month cycle `cycle` of `year`: from the first second of month `2*cycle-1`
/// up to one second before month `2*cycle+1` begins.
pub fn cycle_bounds(year: i32, cycle: u32, tz: &str) -> Result<DateWindow> {
  let start_month = cycle * 2 - 1;
  let start = month_start(tz, year, start_month)?;
  let end = month_start(tz, year, start_month + 2)? - 1;

  Ok(DateWindow { start: Some(start), end: Some(end) })
}

pub fn resolve_window(spec: &WindowSpec, tz: &str) -> Result<DateWindow> {
  match spec {
    WindowSpec::Cycle { cycle } => {
      let (year, c) = parse_cycle(cycle)?;
      cycle_bounds(year, c, tz)
    }
    WindowSpec::Epochs { start, end } => {
      if start > end {
        bail!("Make sure that start date comes before end date");
      }

      Ok(DateWindow { start: Some(*start), end: Some(*end) })
    }
  }
}

/// Parse a `--now-override` string into unix seconds.
/// Accepts plain epoch seconds or RFC3339 (e.g. 2025-08-15T12:00:00Z).
pub fn parse_now_override(s: Option<&str>) -> Option<i64> {
  s.and_then(|raw| {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
      chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp())
    })
  })
}
