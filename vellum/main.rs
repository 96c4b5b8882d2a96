mod application;
mod cli;
mod config;

use std::path::PathBuf;

use anyhow::{
  Context,
  Result,
  anyhow,
};
use clap::Parser;

use crate::{
  cli::Cli,
  config::Config,
};

fn main() -> Result<()> {
  let cli = Cli::parse();

  setup_logging(cli.verbosity, cli.log_file.clone()).context("failed to initialize logging")?;

  let config_path = cli.config_file.clone().unwrap_or_else(default_config_file);
  let config = Config::load(&config_path).map_err(|err| anyhow!("{err}"))?;

  application::run(cli, config)
}

fn setup_logging(verbosity: u8, log_file: Option<PathBuf>) -> Result<()> {
  let mut base = fern::Dispatch::new();

  base = match verbosity {
    0 => base.level(log::LevelFilter::Warn),
    1 => base.level(log::LevelFilter::Info),
    2 => base.level(log::LevelFilter::Debug),
    _ => base.level(log::LevelFilter::Trace),
  };

  let base = base.format(|out, message, record| {
    out.finish(format_args!(
      "{} {} [{}] {}",
      chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
      record.target(),
      record.level(),
      message
    ))
  });

  match log_file {
    Some(path) => base.chain(fern::log_file(path)?).apply()?,
    None => base.chain(std::io::stderr()).apply()?,
  }

  Ok(())
}

fn default_config_file() -> PathBuf {
  let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
  home.join(".config").join("vellum").join("config.toml")
}
