use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod batch;
mod classify;
mod cli;
mod conduit;
mod config;
mod constraints;
mod ext;
mod fetch;
mod metrics;
mod model;
mod pipeline;
mod report;
mod tags;
mod util;
mod window;

use crate::cli::{Cli, normalize};
use crate::config::Config;

fn init_tracing(quiet: bool) {
  let default_level = if quiet { "error" } else { "info" };

  // RUST_LOG wins over --quiet when set and valid.
  let _ = tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .with_target(false)
    .try_init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing(cli.quiet);

  // Phase 1: normalize CLI and load configuration (all user errors surface here)
  let cfg = normalize(cli)?;
  let config = Config::load(&cfg.config)?;

  // Phase 2: resolve the extraction instant and the tracker backend
  let now = util::effective_now(crate::window::parse_now_override(cfg.now_override.as_deref()));
  let api = conduit::build_api(&config);

  // Phase 3: fetch, classify, derive and write
  pipeline::run(&cfg, &config, api.as_ref(), now)
}
