//! Turns raw log lines into [`TaggedLine`]s.
//!
//! Input lines look like `[<id>] [<tag>]* <content>`. Terminal colour codes
//! are removed first; lines without a leading bracketed identifier are
//! rejected, which is how partial output from before the stream attached is
//! dropped.

use crate::patterns;

mod entities;

pub use entities::{Entry, TaggedLine};

/// Parses one raw line. Returns `None` when the line carries no correlation identifier.
pub fn parse_line(raw: &str) -> Option<TaggedLine> {
    let cleaned = patterns::strip_ansi(raw.trim_end_matches(['\r', '\n']));
    let (id, rest) = patterns::split_correlation_id(cleaned.trim_start())?;
    let (tags, content) = patterns::split_secondary_tags(rest);

    Some(TaggedLine {
        id: id.to_string(),
        tags,
        content: content.trim().to_string(),
    })
}

/// Normalizes content for classification: indentation markers are stripped,
/// whitespace collapsed and the result trimmed.
pub fn normalize_content(content: &str) -> String {
    let stripped = content.trim_start_matches(|c: char| c.is_whitespace() || c == '↳');
    patterns::collapse_whitespace(stripped)
}
