//! Root CLI structure for jp-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jp-rs")]
#[command(about = "Inspect BSD scene descriptors and TSP level geometry", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// BSD scene descriptor operations
    Bsd {
        #[command(subcommand)]
        command: crate::commands::bsd::BsdCommands,
    },

    /// TSP level geometry operations
    Tsp {
        #[command(subcommand)]
        command: crate::commands::tsp::TspCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
