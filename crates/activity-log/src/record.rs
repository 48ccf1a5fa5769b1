//! Record types for logged operations.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One logged operation outcome. Append-only; never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// When the operation finished
    pub timestamp: DateTime<Local>,
    /// Command name, e.g. `status`, `generate_tree`, `start_watching`
    pub command: String,
    pub success: bool,
    pub duration_secs: f64,
    /// Typed result summary for the operation kind
    pub summary: OperationSummary,
    /// Error message for failed operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityRecord {
    pub fn success(command: &str, duration: Duration, summary: OperationSummary) -> Self {
        Self {
            timestamp: Local::now(),
            command: command.to_string(),
            success: true,
            duration_secs: duration.as_secs_f64(),
            summary,
            error: None,
        }
    }

    pub fn failure(
        command: &str,
        duration: Duration,
        summary: OperationSummary,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            command: command.to_string(),
            success: false,
            duration_secs: duration.as_secs_f64(),
            summary,
            error: Some(error.into()),
        }
    }
}

/// Typed result summary, one variant per operation kind.
///
/// Replaces the free-form key/value bags such logs tend to accumulate:
/// every operation declares its result shape, and rendering to log fields
/// goes through [`OperationSummary::fields`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationSummary {
    Status(StatusResult),
    Analyze(AnalyzeResult),
    Tree(TreeResult),
    Watch(WatchResult),
    Backup(BackupResult),
}

impl OperationSummary {
    /// Render the summary as ordered `(label, value)` pairs for the
    /// Markdown history document.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            OperationSummary::Status(s) => {
                let mut fields = vec![
                    ("total_notes", s.total_notes.to_string()),
                    ("para_folders", s.para_folders_present.to_string()),
                ];
                for (folder, count) in &s.folder_notes {
                    fields.push(("folder", format!("{folder}={count}")));
                }
                fields
            }
            OperationSummary::Analyze(a) => vec![
                ("total_notes", a.total_notes.to_string()),
                ("total_words", a.total_words.to_string()),
                ("notes_with_tags", a.notes_with_tags.to_string()),
                ("analysis_errors", a.analysis_errors.to_string()),
            ],
            OperationSummary::Tree(t) => vec![
                ("total_folders", t.total_folders.to_string()),
                ("total_files", t.total_files.to_string()),
                ("md_files", t.md_files.to_string()),
                ("tree_lines", t.tree_lines.to_string()),
                ("output", t.output_path.clone()),
            ],
            OperationSummary::Watch(w) => vec![
                ("output", w.output_path.clone()),
                ("active", w.active.to_string()),
            ],
            OperationSummary::Backup(b) => vec![
                ("backup_path", b.backup_path.clone()),
                ("note_count", b.note_count.to_string()),
                ("size_bytes", b.size_bytes.to_string()),
            ],
        }
    }
}

/// Result of a vault status check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResult {
    pub total_notes: usize,
    pub para_folders_present: usize,
    pub folder_notes: BTreeMap<String, usize>,
}

/// Result of a content analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResult {
    pub total_notes: usize,
    pub total_words: usize,
    pub notes_with_tags: usize,
    pub analysis_errors: usize,
}

/// Result of one tree regeneration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeResult {
    pub total_folders: usize,
    pub total_files: usize,
    pub md_files: usize,
    pub tree_lines: usize,
    pub output_path: String,
}

/// Result of a watch start/stop transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchResult {
    pub output_path: String,
    /// Whether a watch is active after the transition
    pub active: bool,
}

/// Result of a vault backup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupResult {
    pub backup_path: String,
    pub note_count: usize,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_round_trips_through_json() {
        let record = ActivityRecord::success(
            "generate_tree",
            Duration::from_millis(42),
            OperationSummary::Tree(TreeResult {
                total_folders: 2,
                total_files: 1,
                md_files: 1,
                tree_lines: 3,
                output_path: "vault-tree.md".into(),
            }),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"tree""#));
        let back: ActivityRecord = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert!(matches!(back.summary, OperationSummary::Tree(ref t) if t.md_files == 1));
    }

    #[test]
    fn fields_render_in_declaration_order() {
        let summary = OperationSummary::Backup(BackupResult {
            backup_path: "/backups/x".into(),
            note_count: 7,
            size_bytes: 1024,
        });
        let fields = summary.fields();
        assert_eq!(fields[0], ("backup_path", "/backups/x".to_string()));
        assert_eq!(fields[1].1, "7");
    }
}
