use serde::Serialize;

/// One input line after presentation cleanup, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    /// Correlation identifier from the leading `[...]` group
    pub id: String,
    /// Secondary bracketed tags that followed the identifier (client address, custom tags)
    pub tags: Vec<String>,
    /// Everything after the tags, trimmed
    pub content: String,
}

/// A single accumulated line in one of a record's buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Entry {
    pub fn new(text: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            text: text.into(),
            tags,
        }
    }
}
