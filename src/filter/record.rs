use super::rule::{FilterRule, rule_matches};
use super::view::{RecordView, SqlEntry};
use crate::classify::{Bucket, DataAccessKind, classify_data_access};
use crate::config::{Category, DisplayConfig, FilterConfig};
use crate::correlator::RequestRecord;
use crate::parser::Entry;
use std::fmt;

/// Why a completed record was not emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// The record never saw a start marker
    Orphan,
    /// An exclusion rule matched
    Excluded(String),
    /// The path inclusion rule did not match
    NotIncluded,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::Orphan => write!(f, "no start marker"),
            SuppressReason::Excluded(rule) => write!(f, "excluded by {rule}"),
            SuppressReason::NotIncluded => write!(f, "path not included"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Emit,
    Suppress(SuppressReason),
}

/// Which sections of an emitted record are visible.
///
/// With nothing selected every section shows; otherwise only the selected
/// ones. Selecting a single data-access kind implies the sql section.
#[derive(Debug, Clone, Default)]
pub struct DisplayFlags {
    selected: Vec<Category>,
}

impl DisplayFlags {
    pub fn new(selected: &[Category]) -> Self {
        Self {
            selected: selected.to_vec(),
        }
    }

    pub fn shows(&self, category: Category) -> bool {
        self.selected.is_empty() || self.selected.contains(&category)
    }

    pub fn shows_sql_kind(&self, kind: Option<DataAccessKind>) -> bool {
        if self.shows(Category::Sql) {
            return true;
        }
        kind.is_some_and(|kind| self.selected.contains(&kind_category(kind)))
    }
}

fn kind_category(kind: DataAccessKind) -> Category {
    match kind {
        DataAccessKind::Read => Category::Read,
        DataAccessKind::Create => Category::Create,
        DataAccessKind::Update => Category::Update,
        DataAccessKind::Delete => Category::Delete,
        DataAccessKind::Transaction => Category::Transaction,
    }
}

fn bucket_category(bucket: Bucket) -> Category {
    match bucket {
        Bucket::Rb => Category::Rb,
        Bucket::Html => Category::Html,
        Bucket::Error => Category::Error,
        Bucket::Sql => Category::Sql,
        Bucket::Log => Category::Log,
    }
}

/// Record-level exclusion and entry-level hiding, applied at flush time.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    exclude: Option<FilterRule>,
    include_path: Option<FilterRule>,
    exclude_path: Option<FilterRule>,
    exclude_controller: Option<FilterRule>,
    exclude_action: Option<FilterRule>,
    exclude_controller_action: Option<FilterRule>,
    exclude_params: Option<FilterRule>,
    exclude_status: Option<FilterRule>,
    exclude_sql: Option<FilterRule>,
    exclude_log: Option<FilterRule>,
    exclude_error: Option<FilterRule>,
    hide_rb: Option<FilterRule>,
    hide_html: Option<FilterRule>,
    hide_log: Option<FilterRule>,
    hide_sql: Option<FilterRule>,
    display: DisplayFlags,
}

impl RecordFilter {
    pub fn new(filters: &FilterConfig, display: &DisplayConfig) -> Self {
        Self {
            exclude: FilterRule::optional("exclude", filters.exclude.as_ref()),
            include_path: FilterRule::optional("include_path", filters.include_path.as_ref()),
            exclude_path: FilterRule::optional("exclude_path", filters.exclude_path.as_ref()),
            exclude_controller: FilterRule::optional(
                "exclude_controller",
                filters.exclude_controller.as_ref(),
            ),
            exclude_action: FilterRule::optional("exclude_action", filters.exclude_action.as_ref()),
            exclude_controller_action: FilterRule::optional(
                "exclude_controller_action",
                filters.exclude_controller_action.as_ref(),
            ),
            exclude_params: FilterRule::optional("exclude_params", filters.exclude_params.as_ref()),
            exclude_status: FilterRule::optional("exclude_status", filters.exclude_status.as_ref()),
            exclude_sql: FilterRule::optional("exclude_sql", filters.exclude_sql.as_ref()),
            exclude_log: FilterRule::optional("exclude_log", filters.exclude_log.as_ref()),
            exclude_error: FilterRule::optional("exclude_error", filters.exclude_error.as_ref()),
            hide_rb: FilterRule::optional("hide_rb", filters.hide_rb.as_ref()),
            hide_html: FilterRule::optional("hide_html", filters.hide_html.as_ref()),
            hide_log: FilterRule::optional("hide_log", filters.hide_log.as_ref()),
            hide_sql: FilterRule::optional("hide_sql", filters.hide_sql.as_ref()),
            display: DisplayFlags::new(&display.show),
        }
    }

    /// Every configured rule, valid or not.
    pub fn rules(&self) -> impl Iterator<Item = &FilterRule> {
        [
            &self.exclude,
            &self.include_path,
            &self.exclude_path,
            &self.exclude_controller,
            &self.exclude_action,
            &self.exclude_controller_action,
            &self.exclude_params,
            &self.exclude_status,
            &self.exclude_sql,
            &self.exclude_log,
            &self.exclude_error,
            &self.hide_rb,
            &self.hide_html,
            &self.hide_log,
            &self.hide_sql,
        ]
        .into_iter()
        .flatten()
    }

    pub fn display(&self) -> &DisplayFlags {
        &self.display
    }

    /// Decides whether a completed record is emitted.
    pub fn evaluate(&self, record: &RequestRecord) -> Verdict {
        if record.method.is_none() {
            return Verdict::Suppress(SuppressReason::Orphan);
        }

        let status = record.status.map(|status| status.to_string());
        let endpoint = match (&record.controller, &record.action) {
            (Some(controller), Some(action)) => Some(format!("{controller}#{action}")),
            _ => None,
        };

        let fields = [
            (&self.exclude, record.path.as_deref()),
            (&self.exclude_path, record.path.as_deref()),
            (&self.exclude_controller, record.controller.as_deref()),
            (&self.exclude_action, record.action.as_deref()),
            (&self.exclude_controller_action, endpoint.as_deref()),
            (&self.exclude_params, record.raw_params.as_deref()),
            (&self.exclude_status, status.as_deref()),
        ];
        for (rule, value) in fields {
            if let (Some(rule), Some(value)) = (rule, value) {
                if rule.is_match(value) {
                    return Verdict::Suppress(SuppressReason::Excluded(rule.name().to_string()));
                }
            }
        }

        let entry_rules = [
            (&self.exclude_sql, &record.sql),
            (&self.exclude_log, &record.log),
            (&self.exclude_error, &record.error),
        ];
        for (rule, entries) in entry_rules {
            if let Some(rule) = rule {
                if entries.iter().any(|entry| rule.is_match(&entry.text)) {
                    return Verdict::Suppress(SuppressReason::Excluded(rule.name().to_string()));
                }
            }
        }

        // An invalid inclusion pattern is ignored rather than hiding everything.
        if let Some(include) = self.include_path.as_ref().filter(|rule| rule.is_valid()) {
            let path = record.path.as_deref().unwrap_or_default();
            if !include.is_match(path) {
                return Verdict::Suppress(SuppressReason::NotIncluded);
            }
        }

        Verdict::Emit
    }

    /// Whether the hide rule of `bucket` drops an entry with this text.
    pub fn hides(&self, bucket: Bucket, text: &str) -> bool {
        match bucket {
            Bucket::Rb => rule_matches(&self.hide_rb, text),
            Bucket::Html => rule_matches(&self.hide_html, text),
            Bucket::Log => rule_matches(&self.hide_log, text),
            Bucket::Sql => rule_matches(&self.hide_sql, text),
            Bucket::Error => false,
        }
    }

    pub fn shows_bucket(&self, bucket: Bucket) -> bool {
        self.display.shows(bucket_category(bucket))
    }

    /// Builds the rendered view of a record, dropping hidden entries and
    /// switched-off sections.
    pub fn project(&self, record: &RequestRecord) -> RecordView {
        let system_tags: Vec<String> = record
            .system_tags()
            .into_iter()
            .map(str::to_string)
            .collect();

        let visible = |bucket: Bucket| -> Vec<Entry> {
            if !self.shows_bucket(bucket) {
                return Vec::new();
            }
            record
                .bucket(bucket)
                .iter()
                .filter(|entry| !self.hides(bucket, &entry.text))
                .map(|entry| without_system_tags(entry, &system_tags))
                .collect()
        };

        let sql = record
            .sql
            .iter()
            .filter(|entry| !self.hides(Bucket::Sql, &entry.text))
            .map(|entry| SqlEntry {
                entry: without_system_tags(entry, &system_tags),
                kind: classify_data_access(&entry.text),
            })
            .filter(|entry| self.display.shows_sql_kind(entry.kind))
            .collect();

        RecordView {
            id: record.id.clone(),
            method: record.method.clone().unwrap_or_default(),
            path: record.path.clone().unwrap_or_default(),
            remote_ip: record.remote_ip.clone(),
            started_at: record.started_at,
            controller: record.controller.clone(),
            action: record.action.clone(),
            format: record.format.clone(),
            status: record.status,
            duration_ms: record.duration_ms,
            views_ms: record.views_ms,
            db_ms: record.db_ms,
            kept: record.kept,
            raw_params: record
                .raw_params
                .clone()
                .filter(|_| self.display.shows(Category::Params)),
            rb: visible(Bucket::Rb),
            html: visible(Bucket::Html),
            sql,
            log: visible(Bucket::Log),
            error: visible(Bucket::Error),
            system_tags,
        }
    }
}

fn without_system_tags(entry: &Entry, system_tags: &[String]) -> Entry {
    Entry {
        text: entry.text.clone(),
        tags: entry
            .tags
            .iter()
            .filter(|tag| !system_tags.contains(tag))
            .cloned()
            .collect(),
    }
}
