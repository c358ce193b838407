use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static TRANSACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:BEGIN|COMMIT|ROLLBACK|TRANSACTION)\b").expect("valid transaction regex")
});
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]\w*\??) \(\d+(?:\.\d+)?ms\)\s*(.*)$").expect("valid sql header regex")
});
static BODY_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(\d+(?:\.\d+)?ms\)\s*)?(INSERT|UPDATE|DELETE)\b").expect("valid body regex")
});

/// Kind of a data-access operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataAccessKind {
    Create,
    Read,
    Update,
    Delete,
    Transaction,
}

impl fmt::Display for DataAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAccessKind::Create => write!(f, "create"),
            DataAccessKind::Read => write!(f, "read"),
            DataAccessKind::Update => write!(f, "update"),
            DataAccessKind::Delete => write!(f, "delete"),
            DataAccessKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Classifies one accumulated sql entry.
///
/// Transaction keywords win outright. A `<Name> (<d>ms)` header is classified
/// by its verb; unknown verbs fall back to the statement after the header and
/// return `None` when that is not an INSERT, UPDATE or DELETE. Headerless
/// lines use the statement heuristic and default to [`DataAccessKind::Read`].
pub fn classify_data_access(line: &str) -> Option<DataAccessKind> {
    if TRANSACTION_RE.is_match(line) {
        return Some(DataAccessKind::Transaction);
    }

    let Some(caps) = HEADER_RE.captures(line) else {
        return Some(body_verb(line).unwrap_or(DataAccessKind::Read));
    };

    match &caps[1] {
        "Create" | "Insert" => Some(DataAccessKind::Create),
        "Update" => Some(DataAccessKind::Update),
        "Destroy" | "Delete" => Some(DataAccessKind::Delete),
        "Load" | "Count" | "Exists" | "Exists?" => Some(DataAccessKind::Read),
        _ => body_verb(caps.get(2).map(|m| m.as_str()).unwrap_or("")),
    }
}

fn body_verb(body: &str) -> Option<DataAccessKind> {
    let caps = BODY_VERB_RE.captures(body)?;
    match &caps[1] {
        "INSERT" => Some(DataAccessKind::Create),
        "UPDATE" => Some(DataAccessKind::Update),
        "DELETE" => Some(DataAccessKind::Delete),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_verbs() {
        assert_eq!(
            classify_data_access(r#"User Load (0.1ms) SELECT "users".* FROM "users""#),
            Some(DataAccessKind::Read)
        );
        assert_eq!(
            classify_data_access(r#"User Update (0.0ms) UPDATE "users" SET "name" = ?"#),
            Some(DataAccessKind::Update)
        );
        assert_eq!(
            classify_data_access(r#"Post Destroy (0.9ms) DELETE FROM "posts""#),
            Some(DataAccessKind::Delete)
        );
        assert_eq!(
            classify_data_access(r#"Order Create (1.2ms) INSERT INTO "orders""#),
            Some(DataAccessKind::Create)
        );
    }

    #[test]
    fn test_transaction_keywords_win() {
        assert_eq!(
            classify_data_access("TRANSACTION (0.1ms) BEGIN"),
            Some(DataAccessKind::Transaction)
        );
        assert_eq!(
            classify_data_access("(0.2ms) COMMIT"),
            Some(DataAccessKind::Transaction)
        );
    }

    #[test]
    fn test_unknown_verb_uses_statement() {
        assert_eq!(
            classify_data_access(r#"User Upsert (0.4ms) INSERT INTO "users" ON CONFLICT"#),
            Some(DataAccessKind::Create)
        );
        assert_eq!(
            classify_data_access(r#"User Pluck (0.2ms) SELECT "users"."id" FROM "users""#),
            None
        );
    }

    #[test]
    fn test_headerless_defaults_to_read() {
        assert_eq!(
            classify_data_access(r#"INSERT INTO "events" ("name") VALUES (?)"#),
            Some(DataAccessKind::Create)
        );
        assert_eq!(
            classify_data_access(r#"(0.3ms) DELETE FROM "sessions""#),
            Some(DataAccessKind::Delete)
        );
        assert_eq!(
            classify_data_access(r#"SELECT COUNT(*) FROM "users""#),
            Some(DataAccessKind::Read)
        );
    }
}
