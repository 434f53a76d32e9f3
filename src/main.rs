//! Directory Backup/Restore Tool
//!
//! Provides CLI interface for directory backup and restore operations,
//! locally or through an S3-compatible object store.

// dirbackup/src/main.rs
use anyhow::{Context, Result};
use dirbackup::config::{
    AppConfig, OperationConfig, load_backup_config_from_json, load_restore_config_from_json,
};
use dirbackup::{backup, restore, store, utils};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    if let Err(e) = utils::logger::init("info") {
        eprintln!("Failed to initialize logging: {:?}", e);
    }

    match run_app().await {
        Ok(_) => {
            info!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // BACKUP_CONFIG overrides the default of config.json in the working directory.
    let config_path = env::var("BACKUP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "backup" => {
            info!("🚀 Starting Backup Process...");
            let backup_config = load_backup_config_from_json(&app_config)
                .context("Failed to load backup configuration from JSON")?;
            app_config.operation = Some(OperationConfig::Backup(backup_config));
            backup::run_backup_flow(&app_config).await
                .context("Backup process failed")?;
        }
        "2" | "restore" => {
            info!("🔄 Starting Restore Process...");
            let restore_config = load_restore_config_from_json(&app_config)
                .context("Failed to load restore configuration from JSON")?;
            info!(
                "Restore target: {}, Archive: {:?}",
                restore_config.restore_dir.display(),
                restore_config.archive_source
            );
            app_config.operation = Some(OperationConfig::Restore(restore_config));
            restore::run_restore_flow(&app_config).await
                .context("Restore process failed")?;
        }
        "3" | "list" => {
            app_config.operation = Some(OperationConfig::List);
            list_local_backups(&app_config)?;
        }
        _ => {
            error!("❌ Invalid choice. Please enter '1' (backup), '2' (restore), or '3' (list).");
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

/// Prints the archives in the local backup directory, oldest first.
fn list_local_backups(app_config: &AppConfig) -> Result<()> {
    let backup_dir = app_config.local_backup_dir()?;
    let backups = store::list_backups(&backup_dir)
        .with_context(|| format!("Failed to list backups in {}", backup_dir.display()))?;

    if backups.is_empty() {
        println!("No backups found in {}", backup_dir.display());
        return Ok(());
    }
    println!("Backups in {}:", backup_dir.display());
    for backup in backups {
        println!(
            "  {}  {:<20}  {:>10.2} MB  {}",
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            backup.source_name,
            backup.size_bytes as f64 / (1024.0 * 1024.0),
            backup.path.display()
        );
    }
    Ok(())
}

/// Prompts user to select an operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{stdin, stdout, Write};

    println!("Select an operation:");
    println!("1. Take Backup (or type 'backup')");
    println!("2. Restore Backup (or type 'restore')");
    println!("3. List Local Backups (or type 'list')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
