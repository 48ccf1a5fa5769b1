//! Vault scanning into an ordered node tree.
//!
//! The tree is rebuilt from scratch on every scan - never patched
//! incrementally - so a render can't go stale from a partial update.

use crate::{Result, TreeSyncError};
use std::path::Path;
use vault_notes::{is_ignored_component, is_note};

/// What kind of filesystem entry a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    Markdown,
    Other,
}

/// One entry in the scanned vault tree.
///
/// Children are ordered: folders first, then files, each group sorted
/// lexicographically. Two scans of an unchanged vault produce identical
/// trees.
#[derive(Debug, Clone)]
pub struct VaultNode {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<VaultNode>,
}

impl VaultNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Result of scanning a vault root.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub root: VaultNode,
    /// Folders anywhere under the root (root itself not counted)
    pub total_folders: usize,
    /// All files under the root, notes or not
    pub total_files: usize,
    pub md_files: usize,
    /// Supported note files that are not Markdown (e.g. `.txt`)
    pub other_files: usize,
    /// Unreadable subtrees, recorded instead of aborting the scan
    pub error_notes: Vec<String>,
}

/// Scan the vault into a [`ScanOutcome`].
///
/// Ignored directories are excluded from both the tree and the counts.
/// Only supported note extensions appear as tree children, but every
/// file participates in `total_files`. A missing root is an error;
/// unreadable subtrees degrade to `error_notes`.
pub fn scan_vault(root: &Path) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(TreeSyncError::NotFound(root.to_path_buf()));
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut outcome = ScanOutcome {
        root: VaultNode {
            name,
            kind: NodeKind::Folder,
            children: Vec::new(),
        },
        total_folders: 0,
        total_files: 0,
        md_files: 0,
        other_files: 0,
        error_notes: Vec::new(),
    };
    let children = scan_dir(root, root, &mut outcome);
    outcome.root.children = children;
    Ok(outcome)
}

fn scan_dir(dir: &Path, root: &Path, outcome: &mut ScanOutcome) -> Vec<VaultNode> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            let rel = dir.strip_prefix(root).unwrap_or(dir);
            outcome.error_notes.push(format!("{}: {}", rel.display(), err));
            return Vec::new();
        }
    };

    let mut folders: Vec<(String, std::path::PathBuf)> = Vec::new();
    let mut files: Vec<VaultNode> = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let rel = dir.strip_prefix(root).unwrap_or(dir);
                outcome.error_notes.push(format!("{}: {}", rel.display(), err));
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_ignored_component(&name) {
            continue;
        }
        let path = entry.path();
        // Symlinks are treated as leaves: following them could loop
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                let rel = path.strip_prefix(root).unwrap_or(&path);
                outcome.error_notes.push(format!("{}: {}", rel.display(), err));
                continue;
            }
        };
        if file_type.is_dir() {
            outcome.total_folders += 1;
            folders.push((name, path));
        } else {
            outcome.total_files += 1;
            let kind = if path.extension().is_some_and(|e| e == "md") {
                outcome.md_files += 1;
                NodeKind::Markdown
            } else if is_note(&path) {
                outcome.other_files += 1;
                NodeKind::Other
            } else {
                // Counted but not rendered
                continue;
            };
            files.push(VaultNode {
                name,
                kind,
                children: Vec::new(),
            });
        }
    }

    folders.sort_by(|a, b| a.0.cmp(&b.0));
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut children: Vec<VaultNode> = folders
        .into_iter()
        .map(|(name, path)| VaultNode {
            name,
            kind: NodeKind::Folder,
            children: scan_dir(&path, root, outcome),
        })
        .collect();
    children.extend(files);
    children
}
