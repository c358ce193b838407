use request_lens::classify::{Bucket, DataAccessKind, LineClassifier, classify_data_access};
use request_lens::parser::{normalize_content, parse_line};

fn classify(raw: &str) -> Option<(Bucket, String)> {
    let line = parse_line(raw)?;
    LineClassifier::default().classify(&normalize_content(&line.content))
}

#[test]
fn test_real_rails_lines() {
    let cases = [
        (
            r#"[8c1e] [127.0.0.1]   User Load (0.5ms)  SELECT "users".* FROM "users" WHERE "users"."id" = $1 LIMIT $2"#,
            Some(Bucket::Sql),
        ),
        (
            "[8c1e]   ↳ app/controllers/application_controller.rb:21:in `current_user'",
            Some(Bucket::Rb),
        ),
        (
            "[8c1e]   Rendered layouts/_flash.html.erb (Duration: 0.2ms | Allocations: 41)",
            Some(Bucket::Html),
        ),
        (
            "[8c1e] ActionController::RoutingError (No route matches [GET] \"/nope\"):",
            Some(Bucket::Error),
        ),
        ("[8c1e] LOG: cart=3 items", Some(Bucket::Log)),
        ("[8c1e] Redirected to http://localhost/login", None),
    ];

    for (raw, expected) in cases {
        assert_eq!(classify(raw).map(|(b, _)| b), expected, "line: {raw}");
    }
}

#[test]
fn test_source_reference_is_reduced_to_fragment() {
    let (bucket, text) =
        classify("[x]   ↳ app/models/order.rb:88:in `block in total'").expect("classified");
    assert_eq!(bucket, Bucket::Rb);
    assert_eq!(text, "app/models/order.rb:88");
}

#[test]
fn test_whitespace_is_collapsed() {
    let (_, text) = classify("[x]   Post Load   (1.1ms)    SELECT 1").expect("classified");
    assert_eq!(text, "Post Load (1.1ms) SELECT 1");
}

#[test]
fn test_data_access_kinds_on_rails_lines() {
    let cases = [
        (r#"Comment Destroy (0.4ms) DELETE FROM "comments" WHERE "comments"."id" = ?"#, Some(DataAccessKind::Delete)),
        (r#"Comment Create (0.9ms) INSERT INTO "comments" ("body") VALUES (?)"#, Some(DataAccessKind::Create)),
        (r#"Comment Update All (0.9ms) UPDATE "comments" SET "seen" = ?"#, Some(DataAccessKind::Update)),
        (r#"Comment Count (0.3ms) SELECT COUNT(*) FROM "comments""#, Some(DataAccessKind::Read)),
        ("TRANSACTION (0.2ms) ROLLBACK", Some(DataAccessKind::Transaction)),
    ];
    for (line, expected) in cases {
        assert_eq!(classify_data_access(line), expected, "line: {line}");
    }
}
