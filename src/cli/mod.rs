//! CLI module for Brand Guardian.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Brand Guardian - video compliance auditing
///
/// Indexes a video's speech and on-screen text and checks it against your brand and
/// regulatory guidelines.
#[derive(Parser, Debug)]
#[command(name = "brand-guardian")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit a video for compliance violations
    Audit {
        /// YouTube video URL
        url: String,

        /// Name for the indexing job (default: generated)
        #[arg(long)]
        video_id: Option<String>,

        /// Print the final pipeline state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Index policy PDFs into the knowledge base
    Ingest {
        /// Directory containing PDFs (default: knowledge_base.data_dir)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// List indexed policy documents
    Sources,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
