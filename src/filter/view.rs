use crate::classify::DataAccessKind;
use crate::parser::Entry;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// The filtered projection of a completed record handed to a renderer.
///
/// Hidden entries and switched-off sections are already removed; entry tags
/// only carry custom tags, system tags are lifted into `system_tags`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub status: Option<u16>,
    pub duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_ms: Option<f64>,
    pub kept: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_tags: Vec<String>,
    /// Raw parameter payload; parsing happens in the renderer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_params: Option<String>,
    pub rb: Vec<Entry>,
    pub html: Vec<Entry>,
    pub sql: Vec<SqlEntry>,
    pub log: Vec<Entry>,
    pub error: Vec<Entry>,
}

impl RecordView {
    /// `Controller#action` when both halves are known.
    pub fn endpoint(&self) -> Option<String> {
        match (&self.controller, &self.action) {
            (Some(controller), Some(action)) => Some(format!("{controller}#{action}")),
            _ => None,
        }
    }

    /// Number of visible sql entries of each kind, unclassified last.
    pub fn sql_breakdown(&self) -> Vec<(Option<DataAccessKind>, usize)> {
        let order = [
            Some(DataAccessKind::Read),
            Some(DataAccessKind::Create),
            Some(DataAccessKind::Update),
            Some(DataAccessKind::Delete),
            Some(DataAccessKind::Transaction),
            None,
        ];
        order
            .into_iter()
            .map(|kind| (kind, self.sql.iter().filter(|e| e.kind == kind).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// A sql entry together with its data-access classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub kind: Option<DataAccessKind>,
}
