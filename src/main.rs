mod app;
mod config;
mod term;

use std::{fs::File, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use lavalamp::Palette;
use tracing_subscriber::EnvFilter;

use crate::config::{default_settings_path, load_settings, save_settings_atomic, Cli};

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.headless.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if cli.list_schemes {
        for key in lavalamp::palette::keys() {
            let p = Palette::by_key(key)?;
            println!("{key:<12} {}", p.name);
        }
        return Ok(());
    }

    let path = match &cli.config {
        Some(p) => p.clone(),
        None => default_settings_path()?,
    };
    let mut settings = load_settings(&path);
    settings.apply_cli(&cli);
    settings.validate().context("invalid settings")?;

    if cli.write_config {
        save_settings_atomic(&path, &settings)?;
        tracing::info!(path = %path.display(), "settings written");
    }

    match cli.headless {
        Some(ticks) => app::headless(&settings, ticks),
        None => app::run(&settings),
    }
}
