//! pt - progress tracker CLI
//!
//! Exercises every ProgressClient operation against a live progress API.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use progresstracker::auth::StaticAuthProvider;
use progresstracker::cli::{Cli, Command, OutputFormat};
use progresstracker::client::{Envelope, ProgressClient, ProgressError};
use progresstracker::config::Config;
use progresstracker::create_transport;
use progresstracker::domain::{ExerciseStatus, ProgressData, TopicAttempt};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("progresstracker")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
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

    let log_file = fs::File::create(log_dir.join("pt.log")).context("Failed to create log file")?;

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

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(user) = &cli.user {
        debug!(%user, "main: user overridden on command line");
        config.auth.user_id = Some(user.clone());
    }
    config.validate()?;

    info!("pt loaded config: base-url={}", config.api.base_url);

    let transport = create_transport(&config.api).context("Failed to create HTTP transport")?;
    let auth = Arc::new(StaticAuthProvider::from_config(&config.auth));
    let client = ProgressClient::from_config(&config, transport, auth);

    debug!(command = ?cli.command, "main: dispatching command");
    let format = cli.format;
    let ok = match cli.command {
        Command::Init => {
            debug!("main: matched Init command");
            let result = client.initialize_progress().await;
            report(format, result, |_| println!("{} progress initialized", "✓".green()))
        }
        Command::Record {
            stage,
            exercise,
            topic,
            score,
            time_spent,
            urdu_used,
            completed,
        } => {
            debug!(stage, exercise, topic, "main: matched Record command");
            let result = match client.current_user_id().await {
                Some(user_id) => {
                    let attempt = TopicAttempt {
                        user_id,
                        stage_id: stage,
                        exercise_id: exercise,
                        topic_id: topic,
                        score,
                        urdu_used,
                        time_spent_seconds: time_spent,
                        completed,
                    };
                    client.record_topic_attempt(&attempt).await
                }
                None => Err(ProgressError::Unauthenticated),
            };
            report(format, result, |outcome| {
                println!("{} attempt recorded", "✓".green());
                for content in &outcome.unlocked_content {
                    println!("  {} {}", "unlocked".yellow(), content);
                }
            })
        }
        Command::Progress { refresh } => {
            debug!(refresh, "main: matched Progress command");
            let result = if refresh {
                client.force_refresh_progress().await
            } else {
                client.comprehensive_progress().await
            };
            report(format, result, print_progress)
        }
        Command::CurrentTopic { stage, exercise } => {
            debug!(stage, exercise, "main: matched CurrentTopic command");
            let result = client.current_topic_for_exercise(stage, exercise).await;
            report(format, result, |topic| {
                let state = if topic.is_completed {
                    "completed".green()
                } else if topic.is_new_exercise {
                    "new".cyan()
                } else {
                    "in progress".yellow()
                };
                println!("Stage {} exercise {}: topic {} ({})", stage, exercise, topic.current_topic_id, state);
            })
        }
        Command::Unlocked { stage, exercise } => {
            debug!(stage, ?exercise, "main: matched Unlocked command");
            let result = client.is_content_unlocked(stage, exercise).await;
            report(format, result, |unlocked| {
                let what = match exercise {
                    Some(e) => format!("Stage {} exercise {}", stage, e),
                    None => format!("Stage {}", stage),
                };
                if *unlocked {
                    println!("{} is {}", what, "unlocked".green());
                } else {
                    println!("{} is {}", what, "locked".red());
                }
            })
        }
        Command::CheckUnlocks => {
            debug!("main: matched CheckUnlocks command");
            let result = client.check_unlocks().await;
            report(format, result, |unlocked| {
                if unlocked.is_empty() {
                    println!("Nothing new unlocked");
                }
                for content in unlocked {
                    println!("{} {}", "unlocked".yellow(), content);
                }
            })
        }
        Command::UserProgress => {
            debug!("main: matched UserProgress command");
            let result = client.user_progress().await;
            report(format, result, |progress| {
                match serde_json::to_string_pretty(progress) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("Failed to render progress rows: {}", e),
                }
            })
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Print a result in the requested format; returns whether it succeeded
fn report<T, F>(format: OutputFormat, result: Result<T, ProgressError>, render: F) -> bool
where
    T: Serialize,
    F: FnOnce(&T),
{
    let success = result.is_ok();
    match format {
        OutputFormat::Json => {
            let envelope = Envelope::from(result);
            match serde_json::to_string_pretty(&envelope) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Failed to serialize result: {}", e),
            }
        }
        OutputFormat::Text => match &result {
            Ok(data) => render(data),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        },
    }
    success
}

fn print_progress(data: &ProgressData) {
    println!(
        "{} {} - {} ({:.0}%)",
        "Current:".bold(),
        data.current_stage.name,
        data.current_stage.subtitle,
        data.current_stage.progress
    );
    println!(
        "Overall {:.0}%  streak {} days (best {})  {} exercises completed",
        data.overall_progress, data.streak_days, data.longest_streak, data.total_exercises_completed
    );
    println!();

    for stage in &data.stages {
        println!("{} {}", colored_status(stage.status), stage.name.bold());
        for exercise in &stage.exercises {
            println!(
                "    {} {:<28} {:>5.1}%  {}/{} topics  {} attempts",
                colored_status(exercise.status),
                exercise.name,
                exercise.progress,
                exercise.completed_topics,
                exercise.topics,
                exercise.attempts
            );
        }
    }

    if !data.achievements.is_empty() {
        println!();
        println!("{}", "Achievements".bold());
        for achievement in &data.achievements {
            println!("  {} {} ({})", achievement.icon, achievement.name, achievement.date);
        }
    }
}

fn colored_status(status: ExerciseStatus) -> colored::ColoredString {
    match status {
        ExerciseStatus::Completed => "●".green(),
        ExerciseStatus::InProgress => "◐".yellow(),
        ExerciseStatus::Locked => "○".dimmed(),
    }
}
