//! ft - freeze-tag game launcher
//!
//! Runs a coordinator, the hiders and the seeker as tasks on one runtime.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use freezetag::cli::{Cli, Command, PlayArgs};
use freezetag::config::Config;
use freezetag::events::spawn_event_logger;
use freezetag::game::Game;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging is not up yet, so nothing here can be traced
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("freezetag")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("freezetag.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level comes from the config file before the full load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Play(args) => cmd_play(config, &args).await,
        Command::Config => cmd_config(&config),
    }
}

/// Play one game and print the report
async fn cmd_play(mut config: Config, args: &PlayArgs) -> Result<()> {
    debug!(?args, "cmd_play: called");
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;
    let setup = args.setup().context("Invalid game setup")?;

    println!(
        "Running {} with {} hider(s), seeker at {}",
        setup.board(),
        setup.hider_count(),
        setup.seeker()
    );

    let game = Game::new(setup, config);
    let events = game.event_bus();
    let logger = match &args.events {
        Some(path) => Some(spawn_event_logger(&events, path).context("Failed to open event log")?),
        None => None,
    };
    drop(events);

    let report = game.run().await?;

    if let Some(logger) = logger
        && let Err(e) = logger.await
    {
        warn!(error = %e, "Event logger task failed");
    }

    println!("{report}");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}
