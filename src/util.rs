// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for time formatting, the effective "now", report file writing and man page rendering
// role: utilities/helpers
// inputs: Various primitives; epoch seconds; paths; clap CommandFactory
// outputs: Formatted timestamps, files written, man page text
// side_effects: write_file creates parent directories and writes the file
// invariants:
// - iso_in_tz falls back to UTC for unknown zones and never panics
// - effective_now returns the override verbatim when one is given
// errors: IO errors bubble with the path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use clap::CommandFactory;

/// Formats a Unix epoch timestamp into an RFC3339 string in the specified timezone.
pub fn iso_in_tz(epoch: i64, tz: &str) -> String {
  let Some(dt_utc) = DateTime::<Utc>::from_timestamp(epoch, 0) else {
    return epoch.to_string();
  };

  if tz.eq_ignore_ascii_case("local") {
    return dt_utc.with_timezone(&Local).to_rfc3339_opts(SecondsFormat::Secs, true);
  }

  if tz.eq_ignore_ascii_case("utc") {
    return dt_utc.to_rfc3339_opts(SecondsFormat::Secs, true);
  }

  match tz.parse::<Tz>() {
    Ok(zone) => zone
      .from_utc_datetime(&dt_utc.naive_utc())
      .to_rfc3339_opts(SecondsFormat::Secs, true),
    Err(_) => dt_utc.to_rfc3339_opts(SecondsFormat::Secs, true),
  }
}

/// Returns the effective "now" in epoch seconds given an optional override.
///
/// Centralizes our handling of test determinism without sprinkling
/// `Utc::now()` throughout the code.
pub fn effective_now(override_now: Option<i64>) -> i64 {
  override_now.unwrap_or_else(|| Utc::now().timestamp())
}

/// Write `contents` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent.display()))?;
  }

  std::fs::write(path, contents).with_context(|| format!("writing report to {}", path.display()))
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
