use crate::classify::Bucket;
use crate::parser::Entry;
use crate::patterns::{CompletionMarker, ProcessingMarker, StartMarker};
use chrono::{DateTime, FixedOffset};

/// Share of a record's lines a tag must appear on to count as a system tag.
const SYSTEM_TAG_PERCENT: usize = 90;

/// Accumulated state for one correlation identifier.
#[derive(Debug, Clone, Default)]
pub struct RequestRecord {
    pub id: String,
    pub method: Option<String>,
    pub path: Option<String>,
    pub remote_ip: Option<String>,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub controller: Option<String>,
    pub action: Option<String>,
    pub format: Option<String>,
    /// Unparsed parameter payload
    pub raw_params: Option<String>,
    pub sql: Vec<Entry>,
    pub html: Vec<Entry>,
    pub rb: Vec<Entry>,
    pub log: Vec<Entry>,
    pub error: Vec<Entry>,
    pub completed: bool,
    pub status: Option<u16>,
    pub duration_ms: Option<f64>,
    pub views_ms: Option<f64>,
    pub db_ms: Option<f64>,
    /// Completed with an error status and retained for trailing diagnostics
    pub kept: bool,
    /// A trailing stack frame has already been captured
    pub source_captured: bool,
    /// The filter suppressed this record when it completed
    pub suppressed: bool,
    lines_seen: usize,
    tag_counts: Vec<(String, usize)>,
}

impl RequestRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Applies a start marker. The first start marker wins.
    pub fn apply_start(&mut self, start: StartMarker) {
        if self.method.is_some() {
            return;
        }
        self.method = Some(start.method);
        self.path = Some(start.path);
        self.remote_ip = start.remote_ip;
        self.started_at = start.started_at;
    }

    pub fn apply_processing(&mut self, processing: ProcessingMarker) {
        if self.controller.is_some() {
            return;
        }
        self.controller = Some(processing.controller);
        self.action = Some(processing.action);
        self.format = processing.format;
    }

    pub fn apply_params(&mut self, raw: String) {
        self.raw_params = Some(raw);
    }

    pub fn apply_completion(&mut self, completion: &CompletionMarker) {
        self.completed = true;
        self.status = Some(completion.status);
        self.duration_ms = Some(completion.duration_ms);
        self.views_ms = completion.views_ms;
        self.db_ms = completion.db_ms;
    }

    pub fn push(&mut self, bucket: Bucket, entry: Entry) {
        self.bucket_mut(bucket).push(entry);
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Entry] {
        match bucket {
            Bucket::Rb => &self.rb,
            Bucket::Html => &self.html,
            Bucket::Error => &self.error,
            Bucket::Sql => &self.sql,
            Bucket::Log => &self.log,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Entry> {
        match bucket {
            Bucket::Rb => &mut self.rb,
            Bucket::Html => &mut self.html,
            Bucket::Error => &mut self.error,
            Bucket::Sql => &mut self.sql,
            Bucket::Log => &mut self.log,
        }
    }

    /// Counts the secondary tags seen on one more line of this record.
    pub fn observe_tags(&mut self, tags: &[String]) {
        self.lines_seen += 1;
        for tag in tags {
            match self.tag_counts.iter_mut().find(|(seen, _)| seen == tag) {
                Some((_, count)) => *count += 1,
                None => self.tag_counts.push((tag.clone(), 1)),
            }
        }
    }

    /// Tags present on nearly every line, in first-seen order.
    pub fn system_tags(&self) -> Vec<&str> {
        if self.lines_seen == 0 {
            return Vec::new();
        }
        self.tag_counts
            .iter()
            .filter(|(_, count)| count * 100 >= self.lines_seen * SYSTEM_TAG_PERCENT)
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    /// Whether the completion status falls at or above `threshold`.
    pub fn status_at_least(&self, threshold: u16) -> bool {
        self.status.is_some_and(|status| status >= threshold)
    }
}
