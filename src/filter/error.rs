use thiserror::Error;

/// Problems found while compiling configured filter patterns
#[derive(Debug, Clone, Error)]
pub enum FilterRuleError {
    #[error("Invalid pattern for '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}
