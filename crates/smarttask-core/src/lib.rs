pub mod auth;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod filter;
pub mod form;
pub mod notify;
pub mod render;
pub mod stats;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting smarttask"
  );

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(files = ?cfg.loaded_files, "configuration loaded");
  datetime::set_project_timezone(
    cfg.timezone()?
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let slot = datastore::FileSlot::open(
    &data_dir,
    &cfg.slot_name()
  )
  .with_context(|| {
    format!(
      "failed to open task slot in \
       {}",
      data_dir.display()
    )
  })?;
  let store =
    datastore::TaskStore::open(slot);

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut board = board::TaskBoard::new(
    store,
    render::ConsoleNotifier::new(
      renderer.clone()
    )
  )
  .with_due_soon_window(
    cfg.due_soon_window()?
  );

  let command = cli.command.unwrap_or(
    cli::Command::List(
      cli::ListArgs::default()
    )
  );

  commands::dispatch(
    &mut board,
    &cfg,
    &renderer,
    command
  )?;

  info!("done");
  Ok(())
}
