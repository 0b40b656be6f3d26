//! # Proofread - Focused Proofreading Scheduler
//!
//! The main binary for the proofread-core edit scheduler.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │           apps/proofread (THE BINARY)         │
//! │                                               │
//! │   ┌─────────────┐        ┌────────────────┐   │
//! │   │    CLI      │        │   File I/O     │   │
//! │   │   (clap)    │        │ (JSON / TOML / │   │
//! │   │             │        │   snapshots)   │   │
//! │   └──────┬──────┘        └───────┬────────┘   │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │             ┌────────────────┐                │
//! │             │ proofread-core │                │
//! │             │  (THE LOGIC)   │                │
//! │             └────────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! proofread stats -g graph.json
//! proofread inclusions -g graph.json -o cleaned.prag
//! proofread init-state -g cleaned.prag -m body --ignore-size 25000 -o state.json
//! proofread estimate -g cleaned.prag -s state.json --merge-below 0.3
//! proofread qa -g cleaned.prag -s state.json -t 25000
//! ```

use clap::Parser;
use proofread::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // PROOFREAD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PROOFREAD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "proofread=debug,proofread_core=debug"
    } else {
        "proofread=info,proofread_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        "proofread v{} - focused proofreading scheduler",
        env!("CARGO_PKG_VERSION")
    );
}
