//! Note-domain utilities for a PARA-organized Markdown vault.
//!
//! Pure building blocks shared by the CLI and the tree-sync core: PARA
//! folder layout, note discovery, YAML frontmatter parsing, and content
//! analysis (tags, wiki-links, headings, word counts). No watching and no
//! async here - actual long-running behavior lives in `tree-sync`.

mod analysis;
mod frontmatter;

pub use analysis::{
    analyze_note, analyze_vault, extract_headings, extract_inline_tags, extract_wiki_links,
    NoteAnalysis, VaultAnalysis,
};
pub use frontmatter::{parse_note, split_frontmatter, ParsedNote};

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File extensions treated as notes.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// Directory names excluded from every scan, backup, and rendered tree.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".obsidian",
    ".git",
    ".DS_Store",
    "node_modules",
    ".vscode",
    ".idea",
];

/// The four top-level folders of the PARA method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParaFolder {
    Projects,
    Areas,
    Resources,
    Archive,
}

impl ParaFolder {
    pub const ALL: [ParaFolder; 4] = [
        ParaFolder::Projects,
        ParaFolder::Areas,
        ParaFolder::Resources,
        ParaFolder::Archive,
    ];

    /// Directory name inside the vault, e.g. `10-Projects`.
    pub fn dir_name(self) -> &'static str {
        match self {
            ParaFolder::Projects => "10-Projects",
            ParaFolder::Areas => "20-Areas",
            ParaFolder::Resources => "30-Resources",
            ParaFolder::Archive => "40-Archive",
        }
    }

    /// Short lowercase key used in reports and logs.
    pub fn key(self) -> &'static str {
        match self {
            ParaFolder::Projects => "projects",
            ParaFolder::Areas => "areas",
            ParaFolder::Resources => "resources",
            ParaFolder::Archive => "archive",
        }
    }
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("vault root not found: {0}")]
    VaultNotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a directory component should be excluded from scans.
///
/// Any leading-dot component is ignored in addition to the fixed set, so
/// sync-client scratch directories like `.stfolder` stay invisible.
pub fn is_ignored_component(name: &str) -> bool {
    name.starts_with('.') || DEFAULT_IGNORED_DIRS.contains(&name)
}

/// Whether a path looks like a note file (by extension).
pub fn is_note(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// List all note files under the vault (or one PARA folder), sorted by path.
///
/// A missing PARA subfolder yields an empty list rather than an error - a
/// fresh vault may not have all four folders yet.
pub fn list_notes(vault: &Path, folder: Option<ParaFolder>) -> Result<Vec<PathBuf>, NoteError> {
    if !vault.is_dir() {
        return Err(NoteError::VaultNotFound(vault.to_path_buf()));
    }

    let root = match folder {
        Some(f) => vault.join(f.dir_name()),
        None => vault.to_path_buf(),
    };
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut notes: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .map(|n| !is_ignored_component(n))
                    .unwrap_or(true)
        })
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() && is_note(e.path()) => Some(e.into_path()),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {}", err);
                None
            }
        })
        .collect();
    notes.sort();
    Ok(notes)
}

/// Vault-level status snapshot: note counts and PARA folder presence.
#[derive(Debug, Clone, Serialize)]
pub struct VaultStatus {
    /// Total note files anywhere in the vault
    pub total_notes: usize,
    /// How many of the four PARA folders exist
    pub para_folders_present: usize,
    /// Note count per PARA folder key (only folders that exist)
    pub folder_notes: BTreeMap<String, usize>,
    /// Modification time of the vault root directory
    pub last_modified: Option<DateTime<Local>>,
}

/// Compute a status snapshot for the vault.
pub fn vault_status(vault: &Path) -> Result<VaultStatus, NoteError> {
    let total_notes = list_notes(vault, None)?.len();

    let mut para_folders_present = 0;
    let mut folder_notes = BTreeMap::new();
    for folder in ParaFolder::ALL {
        if vault.join(folder.dir_name()).is_dir() {
            para_folders_present += 1;
            folder_notes.insert(folder.key().to_string(), list_notes(vault, Some(folder))?.len());
        }
    }

    let last_modified = std::fs::metadata(vault)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from);

    Ok(VaultStatus {
        total_notes,
        para_folders_present,
        folder_notes,
        last_modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("10-Projects")).unwrap();
        fs::create_dir(dir.path().join("20-Areas")).unwrap();
        fs::create_dir(dir.path().join(".obsidian")).unwrap();
        fs::write(dir.path().join("10-Projects/a.md"), "# A").unwrap();
        fs::write(dir.path().join("10-Projects/b.txt"), "b").unwrap();
        fs::write(dir.path().join("10-Projects/skip.png"), []).unwrap();
        fs::write(dir.path().join(".obsidian/workspace.md"), "internal").unwrap();
        fs::write(dir.path().join("inbox.md"), "later").unwrap();
        dir
    }

    #[test]
    fn lists_notes_sorted_and_filtered() {
        let dir = scaffold();
        let notes = list_notes(dir.path(), None).unwrap();
        let names: Vec<_> = notes
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["10-Projects/a.md", "10-Projects/b.txt", "inbox.md"]
        );
    }

    #[test]
    fn lists_single_para_folder() {
        let dir = scaffold();
        let notes = list_notes(dir.path(), Some(ParaFolder::Projects)).unwrap();
        assert_eq!(notes.len(), 2);
        let empty = list_notes(dir.path(), Some(ParaFolder::Archive)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn status_counts_para_folders() {
        let dir = scaffold();
        let status = vault_status(dir.path()).unwrap();
        assert_eq!(status.total_notes, 3);
        assert_eq!(status.para_folders_present, 2);
        assert_eq!(status.folder_notes["projects"], 2);
        assert_eq!(status.folder_notes["areas"], 0);
        assert!(!status.folder_notes.contains_key("archive"));
    }

    #[test]
    fn missing_vault_is_an_error() {
        let err = list_notes(Path::new("/definitely/not/here"), None).unwrap_err();
        assert!(matches!(err, NoteError::VaultNotFound(_)));
    }
}
