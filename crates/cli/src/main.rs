//! para-vault: PARA-method vault manager.
//!
//! Command surface over the library crates: vault status and analysis
//! (`vault-notes`), backups, activity history (`activity-log`), and the
//! live tree document (`tree-sync`).

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod backup;
mod config;

use activity_log::{
    ActivityLog, ActivityRecord, AnalyzeResult, BackupResult, OperationSummary, StatusResult,
};
use config::Config;
use tree_sync::{TreeConfig, TreeSyncController};
use vault_notes::ParaFolder;

#[derive(Parser, Debug)]
#[command(name = "para-vault", version)]
#[command(about = "Manage a PARA-method vault of Markdown notes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show vault status: note counts and PARA folder layout
    Status,
    /// Analyze note content: words, tags, links, distribution
    Analyze {
        /// Restrict analysis to one PARA folder
        #[arg(long, value_enum)]
        folder: Option<FolderArg>,
    },
    /// Create a timestamped backup of the vault
    Backup,
    /// Show recent activity records
    Logs {
        /// Number of records to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Export a Markdown management report
    Report {
        /// Output file path (defaults into the log directory)
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },
    /// Regenerate the vault tree document once
    Tree,
    /// Watch the vault and keep the tree document fresh until Ctrl-C
    Watch,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FolderArg {
    Projects,
    Areas,
    Resources,
    Archive,
}

impl From<FolderArg> for ParaFolder {
    fn from(arg: FolderArg) -> Self {
        match arg {
            FolderArg::Projects => ParaFolder::Projects,
            FolderArg::Areas => ParaFolder::Areas,
            FolderArg::Resources => ParaFolder::Resources,
            FolderArg::Archive => ParaFolder::Archive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let log = ActivityLog::open(&config.log_dir)?;

    match cli.command {
        Command::Status => cmd_status(&config, &log),
        Command::Analyze { folder } => cmd_analyze(&config, &log, folder.map(Into::into)),
        Command::Backup => cmd_backup(&config, &log),
        Command::Logs { limit } => cmd_logs(&log, limit),
        Command::Report { output } => cmd_report(&log, output.as_deref()),
        Command::Tree => cmd_tree(&config, &log),
        Command::Watch => cmd_watch(&config, &log).await,
    }
}

/// Append a record, downgrading log failures to a warning - logging must
/// never mask the operation it describes.
fn record_or_warn(log: &ActivityLog, record: ActivityRecord) {
    if let Err(err) = log.record(record) {
        warn!("failed to append activity record: {}", err);
    }
}

fn cmd_status(config: &Config, log: &ActivityLog) -> Result<()> {
    let started = Instant::now();
    let status = match vault_notes::vault_status(&config.vault_path) {
        Ok(status) => status,
        Err(err) => {
            record_or_warn(
                log,
                ActivityRecord::failure(
                    "status",
                    started.elapsed(),
                    OperationSummary::Status(StatusResult::default()),
                    err.to_string(),
                ),
            );
            return Err(err.into());
        }
    };

    println!("Vault: {}", config.vault_path.display());
    println!("Total notes:        {}", status.total_notes);
    println!("PARA folders:       {}/4", status.para_folders_present);
    for (folder, count) in &status.folder_notes {
        println!("  {folder:<12} {count}");
    }
    if let Some(modified) = status.last_modified {
        println!("Last modified:      {}", modified.format("%Y-%m-%d %H:%M:%S"));
    }

    record_or_warn(
        log,
        ActivityRecord::success(
            "status",
            started.elapsed(),
            OperationSummary::Status(StatusResult {
                total_notes: status.total_notes,
                para_folders_present: status.para_folders_present,
                folder_notes: status.folder_notes,
            }),
        ),
    );
    Ok(())
}

fn cmd_analyze(config: &Config, log: &ActivityLog, folder: Option<ParaFolder>) -> Result<()> {
    let started = Instant::now();
    let analysis = match vault_notes::analyze_vault(&config.vault_path, folder) {
        Ok(analysis) => analysis,
        Err(err) => {
            record_or_warn(
                log,
                ActivityRecord::failure(
                    "analyze",
                    started.elapsed(),
                    OperationSummary::Analyze(AnalyzeResult::default()),
                    err.to_string(),
                ),
            );
            return Err(err.into());
        }
    };

    println!("Notes analyzed:     {}", analysis.total_notes);
    println!("Total words:        {}", analysis.total_words);
    println!("Average words/note: {}", analysis.average_word_count);
    println!("With frontmatter:   {}", analysis.notes_with_frontmatter);
    println!("With tags:          {}", analysis.notes_with_tags);
    if analysis.analysis_errors > 0 {
        println!("Unreadable notes:   {}", analysis.analysis_errors);
    }

    let mut tags: Vec<_> = analysis.common_tags.iter().collect();
    tags.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    if !tags.is_empty() {
        println!("Top tags:");
        for (tag, count) in tags.iter().take(10) {
            println!("  #{tag:<16} {count}");
        }
    }
    if !analysis.folder_distribution.is_empty() {
        println!("Notes per folder:");
        for (folder, count) in &analysis.folder_distribution {
            println!("  {folder:<16} {count}");
        }
    }

    record_or_warn(
        log,
        ActivityRecord::success(
            "analyze",
            started.elapsed(),
            OperationSummary::Analyze(AnalyzeResult {
                total_notes: analysis.total_notes,
                total_words: analysis.total_words,
                notes_with_tags: analysis.notes_with_tags,
                analysis_errors: analysis.analysis_errors,
            }),
        ),
    );
    Ok(())
}

fn cmd_backup(config: &Config, log: &ActivityLog) -> Result<()> {
    let started = Instant::now();
    match backup::create_backup(&config.vault_path, &config.backup_dir) {
        Ok(outcome) => {
            println!("Backup created: {}", outcome.backup_path.display());
            println!("Notes copied:   {}", outcome.note_count);
            println!("Size:           {:.2} MiB", outcome.size_bytes as f64 / (1024.0 * 1024.0));
            record_or_warn(
                log,
                ActivityRecord::success(
                    "backup",
                    started.elapsed(),
                    OperationSummary::Backup(BackupResult {
                        backup_path: outcome.backup_path.display().to_string(),
                        note_count: outcome.note_count,
                        size_bytes: outcome.size_bytes,
                    }),
                ),
            );
            Ok(())
        }
        Err(err) => {
            record_or_warn(
                log,
                ActivityRecord::failure(
                    "backup",
                    started.elapsed(),
                    OperationSummary::Backup(BackupResult::default()),
                    err.to_string(),
                ),
            );
            Err(err)
        }
    }
}

fn cmd_logs(log: &ActivityLog, limit: usize) -> Result<()> {
    let stats = log.stats()?;
    println!(
        "Runs: {}  success rate: {:.1}%  avg duration: {:.2}s",
        stats.total_runs,
        stats.success_rate * 100.0,
        stats.avg_duration_secs
    );

    let recent = log.recent(limit)?;
    if recent.is_empty() {
        println!("No recorded activity yet.");
        return Ok(());
    }
    for record in recent {
        let marker = if record.success { "ok    " } else { "FAILED" };
        println!(
            "{} {} {:<16} {:.2}s",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            marker,
            record.command,
            record.duration_secs
        );
        if let Some(error) = record.error {
            println!("    error: {error}");
        }
    }
    println!("Full history: {}", log.history_path().display());
    Ok(())
}

fn cmd_report(log: &ActivityLog, output: Option<&std::path::Path>) -> Result<()> {
    let path = log.export_report(output)?;
    println!("Report written: {}", path.display());
    Ok(())
}

fn cmd_tree(config: &Config, log: &ActivityLog) -> Result<()> {
    let controller = controller(config, log);
    let summary = controller.regenerate_now()?;
    println!("Tree document updated: {}", config.tree_path.display());
    println!(
        "{} folders, {} files ({} markdown), {} lines",
        summary.total_folders, summary.total_files, summary.md_files, summary.tree_lines
    );
    for note in &summary.error_notes {
        warn!("skipped unreadable subtree: {}", note);
    }
    Ok(())
}

async fn cmd_watch(config: &Config, log: &ActivityLog) -> Result<()> {
    let controller = controller(config, log);
    controller.start()?;

    let status = controller.status();
    println!("Watching {} (quiet window {:?})", config.vault_path.display(), status.window);
    println!("Tree document: {}", status.output_path.display());
    println!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    controller.stop();

    if let Some(last) = controller.status().last_run {
        println!(
            "Stopped. Last regeneration {} ({} folders, {} files)",
            last.at.format("%Y-%m-%d %H:%M:%S"),
            last.summary.total_folders,
            last.summary.total_files
        );
    } else {
        println!("Stopped.");
    }
    Ok(())
}

fn controller(config: &Config, log: &ActivityLog) -> TreeSyncController {
    let tree_config = TreeConfig::new(&config.vault_path)
        .with_output(&config.tree_path)
        .with_window(config.debounce);
    TreeSyncController::new(tree_config, log.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    /// Config pointing at a vault that no longer exists - the case where
    /// the directory vanished after configuration was loaded.
    fn config_with_missing_vault(dir: &Path) -> Config {
        let vault_path = dir.join("gone");
        Config {
            tree_path: vault_path.join("vault-tree.md"),
            log_dir: dir.join("logs"),
            backup_dir: dir.join("backups"),
            debounce: Duration::from_secs(2),
            vault_path,
        }
    }

    #[test]
    fn failed_status_still_appends_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_missing_vault(dir.path());
        let log = ActivityLog::open(&config.log_dir).unwrap();

        assert!(cmd_status(&config, &log).is_err());

        let recent = log.recent(1).unwrap();
        assert_eq!(recent[0].command, "status");
        assert!(!recent[0].success);
        assert!(recent[0].error.is_some());
    }

    #[test]
    fn failed_analyze_still_appends_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_missing_vault(dir.path());
        let log = ActivityLog::open(&config.log_dir).unwrap();

        assert!(cmd_analyze(&config, &log, None).is_err());

        let recent = log.recent(1).unwrap();
        assert_eq!(recent[0].command, "analyze");
        assert!(!recent[0].success);
        assert!(recent[0].error.is_some());
    }
}
