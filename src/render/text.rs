use crate::classify::Bucket;
use crate::correlator::{Diagnostic, DiagnosticKind};
use crate::filter::{RecordView, SqlEntry};
use crate::params::parse_params;
use crate::parser::Entry;
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;

const INDENT: &str = "    ";

/// Presentation tag of a classified entry, resolved to terminal colours here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Source,
    Template,
    Query,
    Debug,
    Failure,
}

impl From<Bucket> for Style {
    fn from(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Rb => Style::Source,
            Bucket::Html => Style::Template,
            Bucket::Sql => Style::Query,
            Bucket::Log => Style::Debug,
            Bucket::Error => Style::Failure,
        }
    }
}

impl Style {
    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Style::Source => text.blue(),
            Style::Template => text.green(),
            Style::Query => text.normal(),
            Style::Debug => text.yellow(),
            Style::Failure => text.red(),
        }
    }
}

fn status_colored(status: Option<u16>) -> ColoredString {
    match status {
        Some(code @ 200..=299) => code.to_string().green().bold(),
        Some(code @ 300..=399) => code.to_string().cyan().bold(),
        Some(code @ 400..=499) => code.to_string().yellow().bold(),
        Some(code) => code.to_string().red().bold(),
        None => "???".bright_black(),
    }
}

fn tag_prefix(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("[{tag}] "))
        .collect::<String>()
}

fn write_section(out: &mut String, bucket: Bucket, entries: &[Entry]) {
    if entries.is_empty() {
        return;
    }
    let style = Style::from(bucket);
    let _ = writeln!(out, "  {}", bucket.to_string().bold());
    for entry in entries {
        let _ = writeln!(
            out,
            "{INDENT}{}{}",
            tag_prefix(&entry.tags).bright_black(),
            style.paint(&entry.text)
        );
    }
}

fn write_sql_section(out: &mut String, entries: &[SqlEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}", "sql".bold());
    for sql in entries {
        let label = match sql.kind {
            Some(kind) => format!("{:<11}", kind.to_string()),
            None => format!("{:<11}", "-"),
        };
        let _ = writeln!(
            out,
            "{INDENT}{}{} {}",
            tag_prefix(&sql.entry.tags).bright_black(),
            label.magenta(),
            Style::Query.paint(&sql.entry.text)
        );
    }
}

fn write_params(out: &mut String, raw: &str) {
    let _ = writeln!(out, "  {}", "params".bold());
    let pretty = parse_params(raw)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    match pretty {
        Some(pretty) => {
            for line in pretty.lines() {
                let _ = writeln!(out, "{INDENT}{line}");
            }
        }
        None => {
            let _ = writeln!(out, "{INDENT}{raw}");
        }
    }
}

/// Source references in first-seen order with repeats dropped.
fn unique_entries(entries: &[Entry]) -> Vec<Entry> {
    let mut unique: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !unique.iter().any(|seen| seen.text == entry.text) {
            unique.push(entry.clone());
        }
    }
    unique
}

/// Formats a completed record as a multi-line text block.
pub fn format_record_text(view: &RecordView) -> String {
    let mut out = String::new();

    let mut header = format!(
        "{} {} {}",
        view.method.bold(),
        view.path.bold(),
        status_colored(view.status)
    );
    if let Some(duration) = view.duration_ms {
        let _ = write!(header, " {}", format!("{duration}ms").bright_white());
    }
    if let Some(endpoint) = view.endpoint() {
        let _ = write!(header, " {}", endpoint.cyan());
    }
    if let Some(format) = &view.format {
        let _ = write!(header, " {}", format!("as {format}").bright_black());
    }
    let _ = writeln!(out, "{header}");

    let mut details = Vec::new();
    if let Some(started_at) = view.started_at {
        details.push(started_at.format("%Y-%m-%d %H:%M:%S %z").to_string());
    }
    if let Some(ip) = &view.remote_ip {
        details.push(format!("from {ip}"));
    }
    if let Some(views) = view.views_ms {
        details.push(format!("views {views}ms"));
    }
    if let Some(db) = view.db_ms {
        details.push(format!("db {db}ms"));
    }
    if !view.system_tags.is_empty() {
        details.push(tag_prefix(&view.system_tags).trim_end().to_string());
    }
    details.push(format!("id {}", view.id));
    let _ = writeln!(out, "  {}", details.join(" | ").bright_black());

    if let Some(raw) = &view.raw_params {
        write_params(&mut out, raw);
    }
    write_section(&mut out, Bucket::Rb, &unique_entries(&view.rb));
    write_section(&mut out, Bucket::Html, &view.html);
    write_sql_section(&mut out, &view.sql);
    write_section(&mut out, Bucket::Log, &view.log);
    write_section(&mut out, Bucket::Error, &view.error);

    let breakdown = view.sql_breakdown();
    if !breakdown.is_empty() {
        let summary: Vec<String> = breakdown
            .iter()
            .map(|(kind, count)| match kind {
                Some(kind) => format!("{kind} {count}"),
                None => format!("other {count}"),
            })
            .collect();
        let _ = writeln!(out, "  {}", summary.join(", ").bright_black());
    }

    out
}

/// Formats a trailing diagnostic line of a kept record.
pub fn format_diagnostic_text(diagnostic: &Diagnostic) -> String {
    let style = Style::from(diagnostic.kind.bucket());
    let kind = match diagnostic.kind {
        DiagnosticKind::Error => "error",
        DiagnosticKind::Frame => "frame",
    };
    let origin = match &diagnostic.path {
        Some(path) => format!("{} {path}", diagnostic.id),
        None => diagnostic.id.clone(),
    };
    format!(
        "  {} {} {}{}\n",
        format!("↳ [{origin}]").bright_black(),
        style.paint(kind).bold(),
        tag_prefix(&diagnostic.entry.tags).bright_black(),
        style.paint(&diagnostic.entry.text)
    )
}
