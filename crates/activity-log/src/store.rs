//! Dual-view persistence for activity records.
//!
//! The JSON list (`activities.json`) is the source of truth, bounded to
//! the most recent [`MAX_RECORDS`] entries. The Markdown history
//! (`history.md`) is re-rendered from it on every append, so the two
//! views cannot drift. Both are written with an atomic temp-file +
//! rename so readers never observe a partial document.

use crate::record::ActivityRecord;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Maximum entries retained in the structured store.
pub const MAX_RECORDS: usize = 100;

const JSON_FILE: &str = "activities.json";
const HISTORY_FILE: &str = "history.md";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Aggregate statistics folded over the stored records.
///
/// An empty history is zeroes across the board, not a failure.
#[derive(Debug, Clone, Default)]
pub struct LogStats {
    pub total_runs: usize,
    /// Fraction of successful runs in `0.0..=1.0`; `0.0` when empty
    pub success_rate: f64,
    pub avg_duration_secs: f64,
    pub last_run: Option<DateTime<Local>>,
    /// Runs per command name
    pub command_counts: BTreeMap<String, usize>,
}

impl LogStats {
    fn from_records(records: &[ActivityRecord]) -> Self {
        let mut stats = LogStats {
            total_runs: records.len(),
            last_run: records.last().map(|r| r.timestamp),
            ..LogStats::default()
        };
        if records.is_empty() {
            return stats;
        }

        let successes = records.iter().filter(|r| r.success).count();
        stats.success_rate = successes as f64 / records.len() as f64;
        stats.avg_duration_secs =
            records.iter().map(|r| r.duration_secs).sum::<f64>() / records.len() as f64;
        for record in records {
            *stats.command_counts.entry(record.command.clone()).or_default() += 1;
        }
        stats
    }
}

/// Handle to the on-disk activity log directory.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    dir: PathBuf,
    /// Serializes the read-modify-write append across clones
    append_lock: Arc<Mutex<()>>,
}

impl ActivityLog {
    /// Open (creating if needed) the log directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    fn json_path(&self) -> PathBuf {
        self.dir.join(JSON_FILE)
    }

    /// Append a record to both views in one logical step.
    ///
    /// Clones share an append lock, so concurrent appends within one
    /// process never lose records. The store itself is last-writer-wins:
    /// an append racing a writer in another process may be overwritten.
    pub fn record(&self, record: ActivityRecord) -> Result<(), LogError> {
        let _guard = self.append_lock.lock().expect("append lock poisoned");
        let mut records = self.load_all()?;
        records.push(record);
        if records.len() > MAX_RECORDS {
            records.drain(..records.len() - MAX_RECORDS);
        }

        write_atomic(&self.json_path(), &serde_json::to_string_pretty(&records)?)?;
        write_atomic(&self.history_path(), &render_history(&records))?;
        Ok(())
    }

    /// The most recent records, most-recent-first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityRecord>, LogError> {
        let records = self.load_all()?;
        Ok(records.into_iter().rev().take(limit).collect())
    }

    /// Fold the stored records into summary statistics.
    pub fn stats(&self) -> Result<LogStats, LogError> {
        Ok(LogStats::from_records(&self.load_all()?))
    }

    /// Export a standalone Markdown report. With no explicit path, writes
    /// a timestamped file into the log directory.
    pub fn export_report(&self, output: Option<&Path>) -> Result<PathBuf, LogError> {
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => self.dir.join(format!(
                "report_{}.md",
                Local::now().format("%Y%m%d_%H%M%S")
            )),
        };
        let records = self.load_all()?;
        write_atomic(&path, &render_report(&records))?;
        Ok(path)
    }

    /// Read the full structured store. A missing file is an empty
    /// history; a corrupt file is logged and treated as empty rather
    /// than wedging every future command.
    fn load_all(&self) -> Result<Vec<ActivityRecord>, LogError> {
        let path = self.json_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!("activity store {} is corrupt ({}); starting fresh", path.display(), err);
                Ok(Vec::new())
            }
        }
    }
}

/// Replace `path` atomically via a same-directory temp file.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}

fn render_stats_block(stats: &LogStats) -> String {
    let mut out = String::from("## Summary Statistics\n\n");
    let _ = writeln!(out, "- **Total runs**: {}", stats.total_runs);
    let _ = writeln!(
        out,
        "- **Last run**: {}",
        stats
            .last_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(out, "- **Success rate**: {:.1}%", stats.success_rate * 100.0);
    let _ = writeln!(out, "- **Average duration**: {:.2}s", stats.avg_duration_secs);
    if !stats.command_counts.is_empty() {
        out.push_str("\n**Runs per command**:\n");
        for (command, count) in &stats.command_counts {
            let _ = writeln!(out, "- **{command}**: {count}");
        }
    }
    out
}

fn render_entry(record: &ActivityRecord) -> String {
    let marker = if record.success { "OK" } else { "FAILED" };
    let mut out = format!(
        "### {} `{}` - {}\n\n",
        marker,
        record.command,
        record.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "**Duration**: {:.2}s", record.duration_secs);
    out.push('\n');
    for (label, value) in record.summary.fields() {
        let _ = writeln!(out, "- **{label}**: {value}");
    }
    if let Some(error) = &record.error {
        let _ = writeln!(out, "\n**Error**: `{error}`");
    }
    out.push('\n');
    out
}

/// Render the full history document: header, statistics, then entries in
/// reverse chronological order.
fn render_history(records: &[ActivityRecord]) -> String {
    let stats = LogStats::from_records(records);
    let mut out = String::from(
        "# Vault Management History\n\n\
         > Auto-generated activity history. Do not edit manually.\n\n",
    );
    out.push_str(&render_stats_block(&stats));
    out.push_str("\n---\n\n## Detailed History\n\n");
    for record in records.iter().rev() {
        out.push_str(&render_entry(record));
        out.push_str("---\n\n");
    }
    out
}

fn render_report(records: &[ActivityRecord]) -> String {
    let stats = LogStats::from_records(records);
    let mut out = format!(
        "# Vault Management Report\n\nGenerated: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str(&render_stats_block(&stats));

    if stats.total_runs > 0 {
        out.push_str("\n## Command Usage\n\n");
        for (command, count) in &stats.command_counts {
            let share = *count as f64 / stats.total_runs as f64 * 100.0;
            let _ = writeln!(out, "- **{command}**: {count} ({share:.1}%)");
        }
    }

    let recent: Vec<_> = records.iter().rev().take(20).collect();
    let _ = write!(out, "\n## Recent Activity ({})\n\n", recent.len());
    for record in recent {
        let marker = if record.success { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "- [{}] **{}** - {}",
            marker,
            record.command,
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    out
}
