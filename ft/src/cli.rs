//! CLI command definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::Config;
use crate::game::{GameSetup, SetupError};

/// ft - freeze-tag on a grid: one seeker, N hiders and a coordinator
#[derive(Debug, Parser)]
#[command(name = "ft", about = "Freeze-tag coordination game over an in-process pub/sub bus", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play one game until every hider is tagged
    Play(PlayArgs),

    /// Print the effective configuration as YAML
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct PlayArgs {
    /// Board width
    #[arg(long)]
    pub width: u32,

    /// Board height
    #[arg(long)]
    pub height: u32,

    /// Number of hiders
    #[arg(long = "hiders", alias = "num-not-it")]
    pub hiders: usize,

    /// Start cells as x y pairs; the last pair is the seeker
    #[arg(
        long,
        required = true,
        num_args = 2..,
        value_name = "X Y",
        allow_negative_numbers = true
    )]
    pub positions: Vec<i32>,

    /// RNG seed for a reproducible game
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability of dropping each delivery (exercises recovery)
    #[arg(long)]
    pub drop_rate: Option<f64>,

    /// Do not draw the board
    #[arg(long)]
    pub no_render: bool,

    /// Write game events as JSON lines to this file
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,
}

impl PlayArgs {
    /// Validate board and start cells
    pub fn setup(&self) -> Result<GameSetup, SetupError> {
        debug!(?self, "PlayArgs::setup: called");
        GameSetup::from_pairs(self.width, self.height, self.hiders, &self.positions)
    }

    /// Command-line flags win over the config file
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(drop_rate) = self.drop_rate {
            config.bus.drop_rate = drop_rate;
        }
        if self.no_render {
            config.render.enabled = false;
        }
    }
}
