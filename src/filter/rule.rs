use super::error::FilterRuleError;
use regex::Regex;

/// A named regular expression from configuration.
///
/// Compilation failures are kept rather than raised: an invalid rule never
/// matches anything, so a typo in a pattern can never take the stream down.
#[derive(Debug, Clone)]
pub struct FilterRule {
    name: String,
    pattern: String,
    compiled: Result<Regex, FilterRuleError>,
}

impl FilterRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        let name = name.into();
        let pattern = pattern.into();
        let compiled = Regex::new(&pattern).map_err(|source| FilterRuleError::InvalidPattern {
            rule: name.clone(),
            source,
        });
        Self {
            name,
            pattern,
            compiled,
        }
    }

    /// Builds a rule only when a pattern is configured.
    pub fn optional(name: &str, pattern: Option<&String>) -> Option<Self> {
        pattern.map(|pattern| Self::new(name, pattern.as_str()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn error(&self) -> Option<&FilterRuleError> {
        self.compiled.as_ref().err()
    }

    /// Fail-open match: invalid patterns report no match.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.compiled {
            Ok(regex) => regex.is_match(text),
            Err(_) => false,
        }
    }
}

/// Tests an optional rule; an absent rule never matches.
pub fn rule_matches(rule: &Option<FilterRule>, text: &str) -> bool {
    rule.as_ref().is_some_and(|rule| rule.is_match(text))
}
