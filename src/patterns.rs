//! The fixed pattern set shared by every stage of the engine.
//!
//! Two families live here: structural markers, which identify request
//! lifecycle events (`Started`, `Processing by`, `Parameters:`,
//! `Completed`), and content patterns, which decide which bucket an ordinary
//! line belongs to. All patterns are compiled once and never change at
//! runtime.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::sync::LazyLock;

static ANSI_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ansi escape regex"));
static CORRELATION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]\s]+)\]\s*(.*)$").expect("valid correlation regex"));
static SECONDARY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]]*)\]\s*").expect("valid tag regex"));
static MULTISPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid multispace regex"));

static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Started ([A-Z]+) "([^"]*)"(?: for (\S+))?(?: at (.+))?$"#)
        .expect("valid start marker regex")
});
static PROCESSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Processing by ([A-Za-z0-9_:]+)#(\w+)(?: as (\S+))?")
        .expect("valid processing marker regex")
});
static PARAMETERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Parameters: (\{.*\})$").expect("valid parameters regex"));
static COMPLETED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Completed (\d{3})\b.*? in (\d+(?:\.\d+)?)ms").expect("valid completion regex")
});
static VIEWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Views: (\d+(?:\.\d+)?)ms").expect("valid views regex"));
static DB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ActiveRecord: (\d+(?:\.\d+)?)ms").expect("valid db regex"));

static SOURCE_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s'"(`])((?:app|lib|config|db|engines|components)/[\w./-]+\.rb:\d+)"#)
        .expect("valid source reference regex")
});
static RENDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Rendered \S").expect("valid render regex"));
static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b[A-Z][A-Za-z0-9]*(?:::[A-Z][A-Za-z0-9]*)*(?:Error|Exception)\b",
        r"|\bFATAL\b",
        r"|\bundefined (?:method|local variable or method)\b",
        r"|\bstack level too deep\b",
        r"|\bCouldn't find\b",
        r"|\bNo route matches\b",
    ))
    .expect("valid error regex")
});
static DATA_ACCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b[A-Z][A-Za-z0-9]*(?:::[A-Za-z0-9]+)* ",
        r"(?:Load|Create|Insert|Update|Destroy|Delete|Count|Exists\??|Pluck|Sum|Average|Minimum|Maximum|Upsert) ",
        r"\(\d+(?:\.\d+)?ms\)",
        r"|\b[A-Z][A-Za-z0-9]*(?:::[A-Za-z0-9]+)*(?: [A-Z][A-Za-z0-9]*\??)+ ",
        r"\(\d+(?:\.\d+)?ms\) (?:SELECT|INSERT|UPDATE|DELETE|WITH)\b",
        r"|^(?:CACHE )?\(\d+(?:\.\d+)?ms\) (?:SELECT|INSERT|UPDATE|DELETE|WITH)\b",
        r"|\b(?:BEGIN|COMMIT|ROLLBACK|TRANSACTION)\b",
    ))
    .expect("valid data access regex")
});

/// A request lifecycle event recognised from a line's content.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Start(StartMarker),
    Processing(ProcessingMarker),
    Parameters(String),
    Completion(CompletionMarker),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartMarker {
    pub method: String,
    pub path: String,
    pub remote_ip: Option<String>,
    pub started_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingMarker {
    pub controller: String,
    pub action: String,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMarker {
    pub status: u16,
    pub duration_ms: f64,
    pub views_ms: Option<f64>,
    pub db_ms: Option<f64>,
}

impl Marker {
    /// Matches `content` (tags already stripped) against the structural patterns.
    pub fn parse(content: &str) -> Option<Self> {
        if let Some(caps) = START_RE.captures(content) {
            let started_at = caps.get(4).and_then(|at| {
                DateTime::parse_from_str(at.as_str().trim(), "%Y-%m-%d %H:%M:%S %z").ok()
            });
            return Some(Marker::Start(StartMarker {
                method: caps[1].to_string(),
                path: caps[2].to_string(),
                remote_ip: caps.get(3).map(|ip| ip.as_str().to_string()),
                started_at,
            }));
        }

        if let Some(caps) = PROCESSING_RE.captures(content) {
            return Some(Marker::Processing(ProcessingMarker {
                controller: caps[1].to_string(),
                action: caps[2].to_string(),
                format: caps.get(3).map(|f| f.as_str().to_string()),
            }));
        }

        if let Some(caps) = PARAMETERS_RE.captures(content) {
            return Some(Marker::Parameters(caps[1].to_string()));
        }

        let caps = COMPLETED_RE.captures(content)?;
        let status = caps[1].parse().ok()?;
        let duration_ms = caps[2].parse().ok()?;
        Some(Marker::Completion(CompletionMarker {
            status,
            duration_ms,
            views_ms: capture_ms(&VIEWS_RE, content),
            db_ms: capture_ms(&DB_RE, content),
        }))
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Marker::Start(_))
    }
}

fn capture_ms(re: &Regex, content: &str) -> Option<f64> {
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Removes terminal colour escapes from a raw line.
pub fn strip_ansi(raw: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE_RE.replace_all(raw, "")
}

/// Splits `[<id>] <rest>` into the identifier and the remainder.
pub fn split_correlation_id(line: &str) -> Option<(&str, &str)> {
    let caps = CORRELATION_ID_RE.captures(line)?;
    let id = caps.get(1)?.as_str();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((id, rest))
}

/// Consumes leading `[tag]` groups, returning them and the remaining content.
pub fn split_secondary_tags(mut rest: &str) -> (Vec<String>, &str) {
    let mut tags = Vec::new();
    while let Some(caps) = SECONDARY_TAG_RE.captures(rest) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        if whole == 0 {
            break;
        }
        tags.push(caps[1].to_string());
        rest = &rest[whole..];
    }
    (tags, rest)
}

/// Collapses runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    MULTISPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Returns the `dir/file.rb:NN` fragment of a source reference.
pub fn source_reference(line: &str) -> Option<&str> {
    SOURCE_REFERENCE_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_render(line: &str) -> bool {
    RENDER_RE.is_match(line)
}

pub fn is_error(line: &str) -> bool {
    ERROR_RE.is_match(line)
}

pub fn is_data_access(line: &str) -> bool {
    DATA_ACCESS_RE.is_match(line)
}
