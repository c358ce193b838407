//! Record filtering
//!
//! Filters are regular expressions taken from configuration. They act at two
//! levels:
//!
//! - **exclusion** rules suppress a whole completed record (path, controller,
//!   action, `Controller#action`, params, status, or any sql/log/error entry)
//! - **hide** rules drop single rb/html/log/sql entries from the rendered
//!   view without affecting whether the record is emitted
//!
//! Every match is fail-open: a pattern that does not compile never matches.
//!
//! # Examples
//!
//! ```text
//! exclude = "^/(assets|health)"                # skip asset and health checks
//! exclude_controller_action = "^Users#show$"   # skip one endpoint
//! hide_sql = "SCHEMA"                          # drop schema queries from output
//! ```

pub mod error;
pub mod record;
pub mod rule;
pub mod view;

pub use error::FilterRuleError;
pub use record::{DisplayFlags, RecordFilter, SuppressReason, Verdict};
pub use rule::FilterRule;
pub use view::{RecordView, SqlEntry};

/// Logs a warning for every configured pattern that failed to compile.
///
/// Returns the number of invalid rules so callers can report it.
pub fn warn_invalid_rules(filter: &RecordFilter) -> usize {
    let mut invalid = 0;
    for rule in filter.rules() {
        if let Some(error) = rule.error() {
            invalid += 1;
            tracing::warn!(
                rule = rule.name(),
                pattern = rule.pattern(),
                "{error}; the rule will never match"
            );
        }
    }
    invalid
}
