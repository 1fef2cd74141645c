use anyhow::Context;
use clap::Parser;
use tracing::debug;

use salary_app::cli::{Cli, Command};
use salary_app::config::AppConfig;
use salary_app::{app, logging};

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.as_deref().unwrap_or("info"));

    let mut config = AppConfig::load(cli.config.as_deref()).context("cannot load configuration")?;
    config.apply_overrides(cli.overrides());

    if !logging::env_filter_active() {
        logging::set_log_level(&config.logging.level)?;
    }
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }
    debug!(
        backend = %config.database.backend,
        unit = %config.display.unit,
        "configuration loaded"
    );

    let output = match cli.command {
        Command::Calc { amounts, json } => app::calc(&amounts, json, config.display.unit)?,
        command => {
            let state = app::connect(config).await?;
            app::run(&state, command).await?
        }
    };

    println!("{output}");
    Ok(())
}
