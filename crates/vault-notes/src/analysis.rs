//! Content analysis for individual notes and whole vaults.
//!
//! Extracts titles, tags, wiki-links and headings, counts words, and
//! aggregates the results per PARA folder. Per-note failures are counted,
//! not propagated - one unreadable note must not sink an analysis run.

use crate::frontmatter::parse_note;
use crate::{list_notes, NoteError, ParaFolder};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]\|#]+)(?:[#\|][^\]]*)?\]\]").unwrap());
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap());
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([A-Za-z][\w/-]*)").unwrap());

/// Extract wiki-link targets (`[[Note]]`, `[[Note|alias]]`, `[[Note#h]]`).
pub fn extract_wiki_links(content: &str) -> Vec<String> {
    WIKI_LINK
        .captures_iter(content)
        .map(|c| c[1].trim().to_string())
        .collect()
}

/// Extract inline `#tag` markers from the body (headings don't match:
/// a heading's `#` is followed by whitespace).
pub fn extract_inline_tags(content: &str) -> Vec<String> {
    INLINE_TAG
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Extract heading texts, any level.
pub fn extract_headings(content: &str) -> Vec<String> {
    HEADING
        .captures_iter(content)
        .map(|c| c[1].trim().to_string())
        .collect()
}

/// Analysis of a single note.
#[derive(Debug, Clone, Serialize)]
pub struct NoteAnalysis {
    pub path: PathBuf,
    /// Frontmatter `title:` or the file stem
    pub title: String,
    /// Frontmatter tags plus inline `#tags`, deduplicated
    pub tags: Vec<String>,
    pub word_count: usize,
    pub char_count: usize,
    pub has_frontmatter: bool,
    /// Wiki-link and Markdown-link targets
    pub links: Vec<String>,
    pub headings: Vec<String>,
}

/// Analyze one note file.
pub fn analyze_note(path: &Path) -> Result<NoteAnalysis, NoteError> {
    let raw = std::fs::read_to_string(path)?;
    let note = parse_note(&raw);

    let title = note
        .title()
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let mut tags = note.tags();
    for tag in extract_inline_tags(note.body) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let mut links = extract_wiki_links(note.body);
    links.extend(MD_LINK.captures_iter(note.body).map(|c| c[1].to_string()));

    Ok(NoteAnalysis {
        path: path.to_path_buf(),
        title,
        tags,
        word_count: note.body.split_whitespace().count(),
        char_count: note.body.chars().count(),
        has_frontmatter: note.has_frontmatter(),
        links,
        headings: extract_headings(note.body),
    })
}

/// Aggregate analysis over a vault (or one PARA folder).
#[derive(Debug, Clone, Default, Serialize)]
pub struct VaultAnalysis {
    pub total_notes: usize,
    pub total_words: usize,
    pub total_chars: usize,
    pub notes_with_tags: usize,
    pub notes_with_frontmatter: usize,
    pub average_word_count: usize,
    /// Tag -> occurrence count across notes
    pub common_tags: BTreeMap<String, usize>,
    /// Top-level vault folder -> note count
    pub folder_distribution: BTreeMap<String, usize>,
    /// Notes that could not be read or analyzed
    pub analysis_errors: usize,
}

/// Analyze every note under the vault, degrading per-note failures to a
/// counter.
pub fn analyze_vault(vault: &Path, folder: Option<ParaFolder>) -> Result<VaultAnalysis, NoteError> {
    let notes = list_notes(vault, folder)?;
    let mut out = VaultAnalysis {
        total_notes: notes.len(),
        ..VaultAnalysis::default()
    };

    for path in &notes {
        let analysis = match analyze_note(path) {
            Ok(a) => a,
            Err(err) => {
                tracing::warn!("failed to analyze {}: {}", path.display(), err);
                out.analysis_errors += 1;
                continue;
            }
        };

        out.total_words += analysis.word_count;
        out.total_chars += analysis.char_count;
        if !analysis.tags.is_empty() {
            out.notes_with_tags += 1;
        }
        if analysis.has_frontmatter {
            out.notes_with_frontmatter += 1;
        }
        for tag in analysis.tags {
            *out.common_tags.entry(tag).or_default() += 1;
        }

        let top_level = path
            .strip_prefix(vault)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_else(|| "(root)".to_string());
        let key = if vault.join(&top_level).is_dir() {
            top_level
        } else {
            "(root)".to_string()
        };
        *out.folder_distribution.entry(key).or_default() += 1;
    }

    let analyzed = out.total_notes.saturating_sub(out.analysis_errors);
    if analyzed > 0 {
        out.average_word_count = out.total_words / analyzed;
    }
    Ok(out)
}
