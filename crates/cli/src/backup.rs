//! Timestamped vault backups.
//!
//! Copies the whole vault into a dated directory under the backup root,
//! skipping ignored directories and `*.tmp` scratch files, and drops a
//! `backup_info.json` manifest next to the copied notes.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use vault_notes::{is_ignored_component, is_note};
use walkdir::WalkDir;

/// Result of one backup run.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub backup_path: PathBuf,
    pub note_count: usize,
    pub size_bytes: u64,
}

#[derive(Serialize)]
struct BackupManifest<'a> {
    timestamp: String,
    vault_path: &'a str,
    note_count: usize,
    size_bytes: u64,
}

/// Copy the vault into `<backup_dir>/para_backup_<timestamp>/`.
pub fn create_backup(vault: &Path, backup_dir: &Path) -> Result<BackupOutcome> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = backup_dir.join(format!("para_backup_{timestamp}"));
    std::fs::create_dir_all(&backup_path)
        .with_context(|| format!("creating backup directory {}", backup_path.display()))?;

    let mut note_count = 0;
    let mut size_bytes = 0u64;

    let backup_root = backup_dir.to_path_buf();
    let walker = WalkDir::new(vault).into_iter().filter_entry(move |entry| {
        // Never descend into ignored directories, nor into the backup
        // destination if it happens to live inside the vault
        if entry.path().starts_with(&backup_root) {
            return false;
        }
        entry.depth() == 0
            || entry
                .file_name()
                .to_str()
                .map(|name| !is_ignored_component(name))
                .unwrap_or(true)
    });

    for entry in walker {
        let entry = entry.context("walking vault")?;
        let rel = entry
            .path()
            .strip_prefix(vault)
            .expect("walker yields paths under the vault");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = backup_path.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)
                .with_context(|| format!("creating {}", dest.display()))?;
            continue;
        }
        if entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "tmp")
        {
            continue;
        }

        std::fs::copy(entry.path(), &dest)
            .with_context(|| format!("copying {}", entry.path().display()))?;
        size_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        if is_note(entry.path()) {
            note_count += 1;
        }
    }

    let vault_display = vault.display().to_string();
    let manifest = BackupManifest {
        timestamp,
        vault_path: &vault_display,
        note_count,
        size_bytes,
    };
    let manifest_path = backup_path.join("backup_info.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    Ok(BackupOutcome {
        backup_path,
        note_count,
        size_bytes,
    })
}
