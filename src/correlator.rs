//! Per-request correlation over an interleaved line stream.
//!
//! Every line is routed by its correlation identifier to a
//! [`RequestRecord`] in the [`CorrelationBuffer`]. Records move through
//! three states:
//!
//! ```text
//! Open ──Completed <400──▶ removed
//!   │
//!   └──Completed >=400──▶ Kept ──next Started (other id) / buffer pressure──▶ removed
//! ```
//!
//! While a record is kept, its lines are treated as trailing diagnostics:
//! error lines are emitted as they arrive and at most one source frame is
//! captured.

mod buffer;
mod record;

pub use buffer::{CorrelationBuffer, DEFAULT_CAPACITY};
pub use record::RequestRecord;

use crate::classify::{Bucket, LineClassifier};
use crate::config::{EngineConfig, LensConfig};
use crate::filter::{RecordFilter, RecordView, SuppressReason, Verdict};
use crate::parser::{Entry, TaggedLine, normalize_content, parse_line};
use crate::patterns::{self, Marker};
use serde::Serialize;
use tracing::debug;

/// Output of the engine for one input line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Emission {
    /// A completed record that passed the filter
    Record(RecordView),
    /// A trailing line captured after an error completion
    Diagnostic(Diagnostic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Frame,
}

impl DiagnosticKind {
    pub fn bucket(self) -> Bucket {
        match self {
            DiagnosticKind::Error => Bucket::Error,
            DiagnosticKind::Frame => Bucket::Rb,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub kind: DiagnosticKind,
    pub entry: Entry,
}

/// Counters describing what the engine did with its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrelatorStats {
    pub lines_read: usize,
    /// Lines without a correlation identifier
    pub lines_dropped: usize,
    pub records_emitted: usize,
    pub records_suppressed: usize,
    /// Completed records that never saw a start marker
    pub orphans_discarded: usize,
    pub records_evicted: usize,
    pub stale_records_cleaned: usize,
    pub diagnostics_emitted: usize,
}

pub struct RequestCorrelator {
    buffer: CorrelationBuffer,
    keep_status_threshold: u16,
    classifier: LineClassifier,
    filter: RecordFilter,
    stats: CorrelatorStats,
}

impl Default for RequestCorrelator {
    fn default() -> Self {
        Self::new(&EngineConfig::default(), RecordFilter::default())
    }
}

impl RequestCorrelator {
    pub fn new(engine: &EngineConfig, filter: RecordFilter) -> Self {
        Self {
            buffer: CorrelationBuffer::new(engine.capacity),
            keep_status_threshold: engine.keep_status_threshold,
            classifier: LineClassifier::new(engine.debug_marker.clone()),
            filter,
            stats: CorrelatorStats::default(),
        }
    }

    pub fn from_config(config: &LensConfig) -> Self {
        Self::new(
            &config.engine,
            RecordFilter::new(&config.filters, &config.display),
        )
    }

    pub fn buffer(&self) -> &CorrelationBuffer {
        &self.buffer
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }

    /// Records still waiting for a completion marker or kept for diagnostics.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one raw input line through the engine.
    pub fn process_line(&mut self, raw: &str) -> Option<Emission> {
        self.stats.lines_read += 1;
        match parse_line(raw) {
            Some(line) => self.process(line),
            None => {
                self.stats.lines_dropped += 1;
                None
            }
        }
    }

    pub fn process_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Vec<Emission> {
        lines
            .into_iter()
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    /// Advances the state machine with an already parsed line.
    pub fn process(&mut self, line: TaggedLine) -> Option<Emission> {
        if let Some(evicted) = self.buffer.enforce_capacity() {
            self.stats.records_evicted += 1;
            debug!(
                id = %evicted.id,
                completed = evicted.completed,
                "evicted oldest record under buffer pressure"
            );
        }

        let marker = Marker::parse(&line.content);
        if marker.as_ref().is_some_and(Marker::is_start) {
            let stale = self.buffer.remove_kept_except(&line.id);
            if !stale.is_empty() {
                self.stats.stale_records_cleaned += stale.len();
                debug!(count = stale.len(), "closed diagnostic window of kept records");
            }
        }

        let record = self.buffer.get_or_insert(&line.id);
        record.observe_tags(&line.tags);
        if record.kept {
            return self.capture_diagnostic(line);
        }

        match marker {
            Some(Marker::Start(start)) => record.apply_start(start),
            Some(Marker::Processing(processing)) => record.apply_processing(processing),
            Some(Marker::Parameters(raw)) => record.apply_params(raw),
            Some(Marker::Completion(completion)) => {
                record.apply_completion(&completion);
                return self.flush(&line.id);
            }
            None => {
                let text = normalize_content(&line.content);
                if let Some((bucket, text)) = self.classifier.classify(&text) {
                    record.push(bucket, Entry::new(text, line.tags));
                }
            }
        }

        None
    }

    /// Runs the filter on a just-completed record, then keeps or removes it.
    fn flush(&mut self, id: &str) -> Option<Emission> {
        let keep_threshold = self.keep_status_threshold;
        let record = self.buffer.get_mut(id)?;
        let keep = record.status_at_least(keep_threshold);
        record.kept = keep;

        let emission = match self.filter.evaluate(record) {
            Verdict::Emit => {
                self.stats.records_emitted += 1;
                Some(Emission::Record(self.filter.project(record)))
            }
            Verdict::Suppress(SuppressReason::Orphan) => {
                record.suppressed = true;
                self.stats.orphans_discarded += 1;
                debug!(id, "discarded completed record without start marker");
                None
            }
            Verdict::Suppress(reason) => {
                record.suppressed = true;
                self.stats.records_suppressed += 1;
                debug!(id, %reason, "suppressed completed record");
                None
            }
        };

        if !keep {
            self.buffer.remove(id);
        }
        emission
    }

    fn capture_diagnostic(&mut self, line: TaggedLine) -> Option<Emission> {
        let text = normalize_content(&line.content);
        let record = self.buffer.get_mut(&line.id)?;

        let (kind, mut entry) = if patterns::is_error(&text) {
            let entry = Entry::new(text, line.tags);
            record.error.push(entry.clone());
            (DiagnosticKind::Error, entry)
        } else {
            let frame = patterns::source_reference(&text)?;
            if record.source_captured || self.filter.hides(Bucket::Rb, frame) {
                return None;
            }
            record.source_captured = true;
            (DiagnosticKind::Frame, Entry::new(frame, line.tags))
        };

        if record.suppressed || !self.filter.shows_bucket(kind.bucket()) {
            return None;
        }

        let system_tags = record.system_tags();
        entry.tags.retain(|tag| !system_tags.contains(&tag.as_str()));
        self.stats.diagnostics_emitted += 1;
        Some(Emission::Diagnostic(Diagnostic {
            id: record.id.clone(),
            path: record.path.clone(),
            kind,
            entry,
        }))
    }
}
