//! Pure tree-document rendering.
//!
//! Produces the full text of the vault-tree document plus a structural
//! summary for logging. Writing the document is the controller's job.

use crate::node::{scan_vault, VaultNode};
use crate::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Counts for one render, embedded into activity records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSummary {
    pub total_folders: usize,
    pub total_files: usize,
    pub md_files: usize,
    pub other_files: usize,
    /// Lines in the rendered tree body (root line not counted)
    pub tree_lines: usize,
    /// Subtrees skipped because they could not be read
    pub error_notes: Vec<String>,
}

/// A rendered tree document and its summary.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    pub document: String,
    pub summary: TreeSummary,
}

/// Render the vault into a complete tree document.
///
/// Apart from the generation timestamp in the header, rendering an
/// unchanged vault twice produces byte-identical documents.
pub fn render_tree(vault: &Path) -> Result<RenderedTree> {
    let scan = scan_vault(vault)?;

    let mut body = Vec::new();
    render_children(&scan.root.children, "", &mut body);

    let summary = TreeSummary {
        total_folders: scan.total_folders,
        total_files: scan.total_files,
        md_files: scan.md_files,
        other_files: scan.other_files,
        tree_lines: body.len(),
        error_notes: scan.error_notes,
    };

    let mut doc = String::from("# Vault Tree\n\n");
    doc.push_str("> Auto-generated vault tree. Do not edit manually.\n\n");
    let _ = writeln!(doc, "Vault: `{}`", vault.display());
    let _ = writeln!(doc, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    doc.push_str("\n| Item | Count |\n|------|-------|\n");
    let _ = writeln!(doc, "| Folders | {} |", summary.total_folders);
    let _ = writeln!(doc, "| Files | {} |", summary.total_files);
    let _ = writeln!(doc, "| Markdown files | {} |", summary.md_files);
    let _ = writeln!(doc, "| Other note files | {} |", summary.other_files);

    doc.push_str("\n```\n");
    let _ = writeln!(doc, "{}/", scan.root.name);
    for line in &body {
        doc.push_str(line);
        doc.push('\n');
    }
    doc.push_str("```\n");

    if !summary.error_notes.is_empty() {
        doc.push_str("\n## Skipped (unreadable)\n\n");
        for note in &summary.error_notes {
            let _ = writeln!(doc, "- {note}");
        }
    }

    Ok(RenderedTree { document: doc, summary })
}

/// Append one line per node, depth-first, with conventional connector
/// glyphs (`├──` for siblings, `└──` for the last child).
fn render_children(children: &[VaultNode], prefix: &str, out: &mut Vec<String>) {
    for (i, child) in children.iter().enumerate() {
        let last = i == children.len() - 1;
        let connector = if last { "└── " } else { "├── " };
        let name = if child.is_folder() {
            format!("{}/", child.name)
        } else {
            child.name.clone()
        };
        out.push(format!("{prefix}{connector}{name}"));

        if child.is_folder() {
            let child_prefix = if last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            render_children(&child.children, &child_prefix, out);
        }
    }
}
