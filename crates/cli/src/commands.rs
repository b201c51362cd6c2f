// FILE: crates/cli/src/commands.rs

use crate::session::{self, ListenArgs};
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use earmark_config::{Config, ConfigManager};
use earmark_core::{format_hms, ItemId, ProgressRecord, Timestamp, UserId};
use earmark_database::{
    current_version, open, queries::progress, DatabaseConfig, DbPool, SqliteProgressStore,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Writes the default config if missing and creates the progress database
pub async fn init(manager: &ConfigManager, db_path: &Path) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write default config")?;
    if created {
        println!(
            "{} Config written to {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    }

    let pool = open(&DatabaseConfig::new(db_path).creating())
        .await
        .context("Failed to create database")?;
    pool.close().await;

    println!(
        "{} Database ready at {} (schema v{})",
        style("✓").green().bold(),
        db_path.display(),
        current_version()
    );
    Ok(())
}

/// Prints the saved progress of one item
pub async fn show_progress(db_path: &Path, user: UserId, item: ItemId) -> Result<()> {
    let pool = open_db(db_path).await?;
    let record = progress::get_progress(&pool, user, item)
        .await
        .context("Failed to read progress")?;

    match record {
        Some(record) => print_record(&record),
        None => println!("No saved progress for item {}", item),
    }
    Ok(())
}

/// Prints listening statistics for a user
pub async fn show_stats(db_path: &Path, user: UserId) -> Result<()> {
    let pool = open_db(db_path).await?;
    let summary = progress::get_user_summary(&pool, user)
        .await
        .context("Failed to read statistics")?;

    println!("\n{}", style("Listening Statistics").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Started: {}", style(summary.started_items()).bold());
    println!("In Progress: {}", style(summary.in_progress_items()).bold());
    println!("Completed: {}", style(summary.completed_items).bold());
    println!(
        "Time Listened: {}",
        format_minutes(summary.total_minutes_listened)
    );

    let mut records: Vec<&ProgressRecord> = summary.item_progress.values().collect();
    records.sort_by_key(|record| std::cmp::Reverse(record.last_played_at));
    for record in records.into_iter().take(10) {
        println!(
            "  {}  {} listened, at {}{}",
            truncate(&record.item_id.to_string(), 8),
            format_hms(record.total_listen_time_seconds),
            format_hms(record.position_seconds),
            if record.is_completed {
                format!("  {}", style("completed").green())
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

/// Runs a simulated listening session against the database
pub async fn listen(db_path: &Path, config: &Config, args: ListenArgs) -> Result<()> {
    let pool = open_db(db_path).await?;
    let store = Arc::new(SqliteProgressStore::new(pool));
    let engine_config = session::engine_config(&config.player)?;

    if args.user.is_none() {
        println!(
            "{} Nobody signed in, progress will not be saved",
            style("!").yellow().bold()
        );
    }

    let report = session::run_session(store, engine_config, &args, |percent| {
        print!("\r  {:>3}% ", percent);
        let _ = std::io::stdout().flush();
    })
    .await?;
    println!();

    if report.resumed_at > 0.0 {
        println!("Resumed at {}", format_hms(report.resumed_at));
    }
    println!(
        "{} Stopped at {} ({:.1}%, {})",
        style("■").cyan().bold(),
        format_hms(report.position),
        report.percent,
        report.state
    );

    if let Some(status) = &report.writer {
        if let Some(record) = &status.record {
            println!(
                "Saved {} writes, total listened {}",
                status.writes,
                format_hms(record.total_listen_time_seconds)
            );
        }
    }
    for diagnostic in &report.diagnostics {
        println!("{} {}", style("warning:").yellow().bold(), diagnostic.message);
    }
    Ok(())
}

/// The `--user` argument, or the configured user when absent
pub fn resolve_user(matches: &ArgMatches, config: &Config) -> Result<Option<UserId>> {
    let raw = matches
        .get_one::<String>("user")
        .cloned()
        .or_else(|| config.app.user_id.clone());

    raw.map(|id| UserId::from_string(&id).context("Invalid user ID format"))
        .transpose()
}

pub fn parse_item(matches: &ArgMatches) -> Result<ItemId> {
    let raw = matches
        .get_one::<String>("item")
        .ok_or_else(|| anyhow::anyhow!("Item ID is required"))?;
    ItemId::from_string(raw).context("Invalid item ID format")
}

async fn open_db(db_path: &Path) -> Result<DbPool> {
    let config = DatabaseConfig::new(db_path);
    if !config.exists() {
        bail!(
            "Database not found at {}. Run `earmark init` first.",
            db_path.display()
        );
    }

    open(&config).await.context("Failed to open database")
}

fn print_record(record: &ProgressRecord) {
    println!("\n{}", style("Progress").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Item: {}", record.item_id);
    println!("Position: {}", style(format_hms(record.position_seconds)).bold());
    println!("Rate: {}x", record.playback_rate.value());
    println!("Volume: {:.0}%", record.volume.value() * 100.0);
    println!(
        "Listened: {}",
        format_hms(record.total_listen_time_seconds)
    );
    println!(
        "Last Played: {}",
        format_ago(Timestamp::now(), record.last_played_at)
    );
    if record.is_completed {
        print!("{}", style("Completed").green().bold());
        if let Some(at) = record.completed_at {
            print!(" {}", format_ago(Timestamp::now(), at));
        }
        println!();
    }
}

fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn format_ago(now: Timestamp, then: Timestamp) -> String {
    let seconds = (now.as_millis() - then.as_millis()).max(0) / 1000;
    match seconds {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", seconds / 60),
        3600..=86_399 => format!("{}h ago", seconds / 3600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}
