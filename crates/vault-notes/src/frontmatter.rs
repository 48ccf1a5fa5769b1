//! YAML frontmatter handling for notes.
//!
//! A frontmatter block is a `---` fence on the very first line, YAML until
//! a closing `---` on its own line, then the note body. Notes without a
//! valid block are treated as all-body.

use serde_yaml::Value;

/// A note split into parsed frontmatter and body.
///
/// `body` borrows from the raw input; no allocation happens unless the
/// YAML block parses.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote<'a> {
    /// Parsed frontmatter mapping, if a valid block was present
    pub meta: Option<serde_yaml::Mapping>,
    /// Note content after the frontmatter block
    pub body: &'a str,
}

impl ParsedNote<'_> {
    pub fn has_frontmatter(&self) -> bool {
        self.meta.is_some()
    }

    /// `title:` field, if present and a string.
    pub fn title(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.get("title"))
            .and_then(Value::as_str)
    }

    /// `tags:` field, accepting both a YAML list and a single string.
    pub fn tags(&self) -> Vec<String> {
        let Some(value) = self.meta.as_ref().and_then(|m| m.get("tags")) else {
            return Vec::new();
        };
        match value {
            Value::String(s) => vec![s.clone()],
            Value::Sequence(seq) => seq
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Split raw note text into `(yaml, body)` without parsing the YAML.
///
/// Returns `(None, raw)` when no complete frontmatter block exists, e.g.
/// when the opening fence is missing, not on the first line, or never
/// closed.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw.strip_prefix("---") else {
        return (None, raw);
    };
    let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        // Text like `---foo` is a horizontal rule or plain content
        return (None, raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, raw)
}

/// Parse a note into frontmatter mapping and body.
///
/// Malformed YAML (or a non-mapping document) degrades to "no
/// frontmatter" rather than an error: vaults accumulate hand-edited
/// notes, and one bad header must not fail a whole analysis run.
pub fn parse_note(raw: &str) -> ParsedNote<'_> {
    let (yaml, body) = split_frontmatter(raw);
    let meta = yaml.and_then(|y| match serde_yaml::from_str::<Value>(y) {
        Ok(Value::Mapping(map)) => Some(map),
        _ => None,
    });
    ParsedNote { meta, body }
}
