//! Content classification for lines that are not structural markers.

mod data_access;

pub use data_access::{DataAccessKind, classify_data_access};

use crate::patterns;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulation bucket of a [`RequestRecord`](crate::correlator::RequestRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Application source references (`app/models/user.rb:12`)
    Rb,
    /// Template renders
    Html,
    /// Exceptions and framework error phrases
    Error,
    /// Data-access operations
    Sql,
    /// Lines carrying the debug sentinel
    Log,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Rb => write!(f, "rb"),
            Bucket::Html => write!(f, "html"),
            Bucket::Error => write!(f, "error"),
            Bucket::Sql => write!(f, "sql"),
            Bucket::Log => write!(f, "log"),
        }
    }
}

/// Decides which bucket a cleaned content line belongs to.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    debug_marker: String,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new("LOG:")
    }
}

impl LineClassifier {
    pub fn new(debug_marker: impl Into<String>) -> Self {
        Self {
            debug_marker: debug_marker.into(),
        }
    }

    /// Classifies `line`, first match wins. Source references yield only the
    /// extracted path fragment; every other bucket keeps the whole line.
    pub fn classify(&self, line: &str) -> Option<(Bucket, String)> {
        if let Some(fragment) = patterns::source_reference(line) {
            return Some((Bucket::Rb, fragment.to_string()));
        }
        if patterns::is_render(line) {
            return Some((Bucket::Html, line.to_string()));
        }
        if patterns::is_error(line) {
            return Some((Bucket::Error, line.to_string()));
        }
        if patterns::is_data_access(line) {
            return Some((Bucket::Sql, line.to_string()));
        }
        if !self.debug_marker.is_empty() && line.contains(&self.debug_marker) {
            return Some((Bucket::Log, line.to_string()));
        }
        None
    }
}
