//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pt - learner progress from the command line
#[derive(Parser)]
#[command(
    name = "pt",
    about = "Record attempts and inspect learner progress against the progress API",
    version
)]
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

    /// Act as this user instead of the configured one
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create progress rows for the user
    Init,

    /// Record a topic attempt
    Record {
        /// Stage (1-6)
        #[arg(short, long)]
        stage: i64,

        /// Exercise within the stage (1-3)
        #[arg(short, long)]
        exercise: i64,

        /// Topic within the exercise (1-100)
        #[arg(short, long)]
        topic: i64,

        /// Score (0-100)
        #[arg(long)]
        score: f64,

        /// Time spent in seconds (1-3600)
        #[arg(long = "time-spent")]
        time_spent: i64,

        /// The learner fell back to Urdu
        #[arg(long)]
        urdu_used: bool,

        /// The topic was completed
        #[arg(long)]
        completed: bool,
    },

    /// Show comprehensive progress
    Progress {
        /// Skip the cache and fetch live
        #[arg(short, long)]
        refresh: bool,
    },

    /// Show where to resume an exercise
    CurrentTopic {
        /// Stage (1-6)
        #[arg(short, long)]
        stage: i64,

        /// Exercise within the stage (1-3)
        #[arg(short, long)]
        exercise: i64,
    },

    /// Check whether a stage or exercise is unlocked
    Unlocked {
        /// Stage (1-6)
        #[arg(short, long)]
        stage: i64,

        /// Exercise within the stage (1-3); omit to ask about the stage
        #[arg(short, long)]
        exercise: Option<i64>,
    },

    /// Ask the backend to evaluate unlock rules
    CheckUnlocks,

    /// Show raw progress rows
    UserProgress,
}

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
