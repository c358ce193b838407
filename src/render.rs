//! Output formatting for emitted records and diagnostics.
//!
//! Text output is meant for a terminal and uses `colored`; JSON output is one
//! object per line so it can be piped into `jq` or another consumer.

mod json;
mod stats;
mod text;

pub use json::{emission_to_json, format_emission_json};
pub use stats::{create_styled_table, format_stats_table};
pub use text::{Style, format_diagnostic_text, format_record_text};

use crate::cli::OutputFormat;
use crate::correlator::Emission;

/// Renders one emission in the requested format. JSON output carries no
/// trailing newline; text output always ends with one.
pub fn render_emission(emission: &Emission, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => format_emission_json(emission),
        OutputFormat::Text => Ok(match emission {
            Emission::Record(view) => format_record_text(view),
            Emission::Diagnostic(diagnostic) => format_diagnostic_text(diagnostic),
        }),
    }
}
