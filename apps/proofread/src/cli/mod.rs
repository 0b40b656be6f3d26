//! # Proofread CLI Module
//!
//! ## Available Commands
//!
//! - `stats` - Show graph statistics
//! - `inclusions` - Remove enclosed regions and write the contracted graph
//! - `estimate` - Estimate remaining review work with a weight oracle
//! - `qa` - List orphan bodies that should have been attached
//! - `init-state` - Configure a review mode and write its state document

mod commands;

use crate::AppError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use proofread_core::{EdgeRange, ReviewMode};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Proofread - focused proofreading scheduler
///
/// Ranks the edges of a region adjacency graph by how much reviewing them
/// is expected to reduce segmentation uncertainty.
#[derive(Parser, Debug)]
#[command(name = "proofread")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Editor configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show graph statistics
    Stats {
        /// Graph file (JSON or binary snapshot)
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// Merge every enclosed region into its encloser
    Inclusions {
        /// Graph file (JSON or binary snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Output graph file; a `.prag` extension writes a binary snapshot
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Estimate remaining work, merging every edge below a weight
    Estimate {
        /// Graph file (JSON or binary snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Scheduler state document to resume from
        #[arg(short, long)]
        state: Option<PathBuf>,

        #[command(flatten)]
        mode: ModeArgs,

        /// Oracle merges staged edges with weight below this value
        #[arg(long, default_value = "0.5")]
        merge_below: f64,
    },

    /// List orphan bodies that carry synapses or reach the size threshold
    Qa {
        /// Graph file (JSON or binary snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Scheduler state document supplying orphan and synapse bodies
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Size threshold in voxels
        #[arg(short, long)]
        threshold: u64,
    },

    /// Configure a review mode and write the scheduler state document
    InitState {
        /// Graph file (JSON or binary snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        #[command(flatten)]
        mode: ModeArgs,

        /// Output state document (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Review mode as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Body,
    Synapse,
    Orphan,
    Edge,
}

impl From<ModeArg> for ReviewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Body => Self::Body,
            ModeArg::Synapse => Self::Synapse,
            ModeArg::Orphan => Self::Orphan,
            ModeArg::Edge => Self::Edge,
        }
    }
}

/// Mode selection shared by the scheduling commands.
#[derive(Args, Debug, Clone)]
pub struct ModeArgs {
    /// Review mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Ignore size (mode default when omitted)
    #[arg(long)]
    pub ignore_size: Option<f64>,

    /// Affinity search depth for body mode (0 = unbounded)
    #[arg(long, default_value = "0")]
    pub depth: u32,

    /// Lower edge weight bound for edge mode
    #[arg(long, default_value = "0.0")]
    pub range_min: f64,

    /// Upper edge weight bound for edge mode
    #[arg(long, default_value = "1.0")]
    pub range_max: f64,

    /// Start weight for edge mode (defaults to the lower bound)
    #[arg(long)]
    pub start: Option<f64>,
}

impl ModeArgs {
    /// Resolved options, or `None` when no mode was given.
    #[must_use]
    pub fn options(&self) -> Option<ModeOptions> {
        let mode = self.mode?;
        Some(ModeOptions {
            mode: mode.into(),
            ignore_size: self.ignore_size,
            depth: self.depth,
            range: EdgeRange {
                min: self.range_min,
                max: self.range_max,
                start: self.start.unwrap_or(self.range_min),
            },
        })
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Stats { graph } => cmd_stats(&graph, json_mode),
        Commands::Inclusions { graph, output } => cmd_inclusions(&graph, &output, json_mode),
        Commands::Estimate {
            graph,
            state,
            mode,
            merge_below,
        } => cmd_estimate(
            &graph,
            state.as_deref(),
            mode.options(),
            merge_below,
            config,
            json_mode,
        ),
        Commands::Qa {
            graph,
            state,
            threshold,
        } => cmd_qa(&graph, state.as_deref(), threshold, config, json_mode),
        Commands::InitState {
            graph,
            mode,
            output,
        } => {
            let options = mode
                .options()
                .ok_or_else(|| AppError::InvalidInput("--mode is required".to_string()))?;
            cmd_init_state(&graph, options, &output, config, json_mode)
        }
    }
}
