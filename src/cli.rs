use anyhow::{Result, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::report::OutputFormat;
use crate::tags::parse_project_slugs;
use crate::window::WindowSpec;

#[derive(Parser, Debug)]
#[command(
    name = "ticket-lifecycle",
    version,
    about = "Export Maniphest ticket lifecycle timestamps and durations (CSV or JSON)",
    long_about = None
)]
pub struct Cli {
  /// Creation window as a two-month cycle, e.g. 2021C1 (Jan-Feb 2021)
  #[arg(short = 'c', long)]
  pub cycle: Option<String>,

  /// Window start in epoch seconds; must be paired with --end-date
  #[arg(short = 's', long)]
  pub start_date: Option<i64>,

  /// Window end in epoch seconds (inclusive); must be paired with --start-date
  #[arg(short = 'e', long)]
  pub end_date: Option<i64>,

  /// Comma-separated project tags, e.g. "messaging,client_success" (tickets must carry all of them)
  #[arg(short = 'p', long)]
  pub projects: Option<String>,

  /// Restrict the search to bug subtypes even when project tags are given
  #[arg(short = 'b', long)]
  pub only_bugs: bool,

  /// Only log errors
  #[arg(short = 'q', long)]
  pub quiet: bool,

  /// TOML configuration file
  #[arg(long, default_value = "lifecycle.toml")]
  pub config: PathBuf,

  /// Report format
  #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
  pub format: OutputFormat,

  /// Output file path (default stdout "-")
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Timezone for cycle boundaries: local, utc or an IANA name
  #[arg(long, default_value = "local")]
  pub tz: String,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the extraction timestamp (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EffectiveConfig {
  pub window: WindowSpec,
  pub projects: Vec<String>,
  pub only_bugs: bool,
  pub quiet: bool,
  pub config: PathBuf,
  pub format: OutputFormat,
  pub out: String,
  pub tz: String,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let window = match (&cli.cycle, cli.start_date, cli.end_date) {
    (Some(c), None, None) => WindowSpec::Cycle { cycle: c.clone() },
    (None, Some(start), Some(end)) => WindowSpec::Epochs { start, end },
    (None, None, None) => {
      bail!("Provide one of --cycle or (--start-date AND --end-date)")
    }
    (None, Some(_), None) | (None, None, Some(_)) => {
      bail!("--start-date and --end-date must be given together")
    }
    _ => bail!("Ambiguous time selection: choose only one of --cycle | --start-date/--end-date"),
  };

  let projects = match cli.projects.as_deref() {
    Some(raw) => parse_project_slugs(raw)?,
    None => Vec::new(),
  };

  Ok(EffectiveConfig {
    window,
    projects,
    only_bugs: cli.only_bugs,
    quiet: cli.quiet,
    config: cli.config,
    format: cli.format,
    out: cli.out,
    tz: cli.tz,
    now_override: cli.now_override,
  })
}
