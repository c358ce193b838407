use request_lens::classify::DataAccessKind;
use request_lens::config::{EngineConfig, FilterConfig, LensConfig};
use request_lens::correlator::{DiagnosticKind, Emission, RequestCorrelator};
use request_lens::filter::{RecordFilter, RecordView};

fn records(emissions: &[Emission]) -> Vec<&RecordView> {
    emissions
        .iter()
        .filter_map(|emission| match emission {
            Emission::Record(view) => Some(view),
            Emission::Diagnostic(_) => None,
        })
        .collect()
}

#[test]
fn test_single_request_end_to_end() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[r] Started GET "/x" for 1.2.3.4 at 2024-03-01 10:00:00 +0000"#,
        "[r] Processing by C#a as HTML",
        "[r] Completed 200 OK in 5ms (Views: 1.2ms | ActiveRecord: 0.8ms)",
    ]);

    let records = records(&emissions);
    assert_eq!(records.len(), 1);
    let view = records[0];
    assert_eq!(view.method, "GET");
    assert_eq!(view.path, "/x");
    assert_eq!(view.remote_ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(view.controller.as_deref(), Some("C"));
    assert_eq!(view.action.as_deref(), Some("a"));
    assert_eq!(view.format.as_deref(), Some("HTML"));
    assert_eq!(view.status, Some(200));
    assert_eq!(view.duration_ms, Some(5.0));
    assert_eq!(view.views_ms, Some(1.2));
    assert_eq!(view.db_ms, Some(0.8));
    assert!(view.started_at.is_some());
    assert!(!view.kept);
    assert!(correlator.buffer().is_empty());
}

#[test]
fn test_interleaved_requests_are_separated() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[a] Started GET "/users" for 127.0.0.1"#,
        r#"[b] Started POST "/orders" for 127.0.0.1"#,
        r#"[a] User Load (0.3ms) SELECT "users".* FROM "users""#,
        r#"[b] TRANSACTION (0.1ms) BEGIN"#,
        r#"[b] Order Create (0.4ms) INSERT INTO "orders" DEFAULT VALUES"#,
        "[a] Rendered users/index.html.erb within layouts/application (Duration: 2.0ms)",
        "[b] LOG: order placed",
        "[b] Completed 201 Created in 9ms",
        "[a] Completed 200 OK in 12ms",
    ]);

    let records = records(&emissions);
    assert_eq!(records.len(), 2);

    let orders = records[0];
    assert_eq!(orders.path, "/orders");
    assert_eq!(orders.sql.len(), 2);
    assert_eq!(orders.log.len(), 1);
    assert!(orders.html.is_empty());

    let users = records[1];
    assert_eq!(users.path, "/users");
    assert_eq!(users.sql.len(), 1);
    assert_eq!(users.html.len(), 1);
    assert!(users.log.is_empty());
}

#[test]
fn test_buffer_stays_bounded() {
    let mut correlator = RequestCorrelator::default();
    for i in 0..60 {
        correlator.process_line(&format!(r#"[id{i}] Started GET "/p/{i}" for 127.0.0.1"#));
    }

    let buffer = correlator.buffer();
    assert_eq!(buffer.len(), 51);
    assert!(!buffer.contains("id0"));
    assert!(!buffer.contains("id8"));
    assert!(buffer.contains("id9"));
    assert!(buffer.contains("id59"));
    assert_eq!(correlator.stats().records_evicted, 9);
}

#[test]
fn test_capacity_comes_from_config() {
    let engine = EngineConfig {
        capacity: 3,
        ..EngineConfig::default()
    };
    let mut correlator = RequestCorrelator::new(&engine, RecordFilter::default());
    for i in 0..10 {
        correlator.process_line(&format!(r#"[id{i}] Started GET "/""#));
    }
    assert_eq!(correlator.pending(), 4);
}

#[test]
fn test_error_diagnostics_follow_kept_record() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[a] Started GET "/boom" for 127.0.0.1"#,
        "[a] Processing by BoomController#show as HTML",
        "[a] Completed 500 Internal Server Error in 3ms",
        "[a] NoMethodError (undefined method `name' for nil):",
        "[a] app/controllers/boom_controller.rb:4:in `show'",
        "[a] app/models/widget.rb:9:in `name'",
        "[a] actionpack (7.1.0) lib/action_controller/metal.rb:1",
    ]);

    assert_eq!(emissions.len(), 3);
    let Emission::Record(view) = &emissions[0] else {
        panic!("expected record first");
    };
    assert!(view.kept);
    assert_eq!(view.status, Some(500));

    let Emission::Diagnostic(error) = &emissions[1] else {
        panic!("expected error diagnostic");
    };
    assert_eq!(error.kind, DiagnosticKind::Error);
    assert_eq!(error.path.as_deref(), Some("/boom"));

    let Emission::Diagnostic(frame) = &emissions[2] else {
        panic!("expected frame diagnostic");
    };
    assert_eq!(frame.kind, DiagnosticKind::Frame);
    assert_eq!(frame.entry.text, "app/controllers/boom_controller.rb:4");

    let record = correlator.buffer().get("a").expect("kept record");
    assert!(record.source_captured);
    assert_eq!(record.error.len(), 1);
    assert_eq!(correlator.stats().diagnostics_emitted, 2);
}

#[test]
fn test_next_start_closes_diagnostic_window() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[a] Started GET "/a" for 127.0.0.1"#,
        "[a] Completed 404 Not Found in 1ms",
        r#"[b] Started GET "/b" for 127.0.0.1"#,
        "[a] RuntimeError (late)",
        "[b] Completed 200 OK in 2ms",
    ]);

    let records = records(&emissions);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].path, "/a");
    assert_eq!(records[1].path, "/b");
    assert_eq!(correlator.stats().stale_records_cleaned, 1);
    // The late line re-opened an orphan record for `a`.
    assert!(correlator.buffer().get("a").is_some_and(|r| r.method.is_none()));
    assert!(!correlator.buffer().contains("b"));
}

#[test]
fn test_restarting_same_id_keeps_record() {
    let mut correlator = RequestCorrelator::default();
    correlator.process_lines([
        r#"[a] Started GET "/a""#,
        "[a] Completed 500 Internal Server Error in 1ms",
        r#"[a] Started GET "/a-again""#,
    ]);
    let record = correlator.buffer().get("a").expect("record");
    assert!(record.kept);
    assert_eq!(record.path.as_deref(), Some("/a"));
}

#[test]
fn test_orphan_completion_is_discarded() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        "[z] User Load (0.2ms) SELECT 1",
        "[z] Completed 200 OK in 1ms",
    ]);
    assert!(emissions.is_empty());
    assert_eq!(correlator.stats().orphans_discarded, 1);
    assert!(correlator.buffer().is_empty());
}

#[test]
fn test_suppressed_record_diagnostics_are_consumed() {
    let config = LensConfig {
        filters: FilterConfig {
            exclude_path: Some("^/boom".to_string()),
            ..FilterConfig::default()
        },
        ..LensConfig::default()
    };
    let mut correlator = RequestCorrelator::from_config(&config);
    let emissions = correlator.process_lines([
        r#"[a] Started GET "/boom""#,
        "[a] Completed 500 Internal Server Error in 1ms",
        "[a] RuntimeError (boom)",
    ]);
    assert!(emissions.is_empty());
    assert_eq!(correlator.stats().records_suppressed, 1);
    assert_eq!(correlator.buffer().get("a").map(|r| r.error.len()), Some(1));
}

#[test]
fn test_hidden_frame_leaves_room_for_next_one() {
    let config = LensConfig {
        filters: FilterConfig {
            hide_rb: Some("concerns".to_string()),
            ..FilterConfig::default()
        },
        ..LensConfig::default()
    };
    let mut correlator = RequestCorrelator::from_config(&config);
    let emissions = correlator.process_lines([
        r#"[a] Started GET "/""#,
        "[a] Completed 500 Internal Server Error in 1ms",
        "[a] app/models/concerns/auditable.rb:3:in `audit'",
        "[a] app/models/user.rb:7:in `save'",
    ]);

    let frames: Vec<_> = emissions
        .iter()
        .filter_map(|emission| match emission {
            Emission::Diagnostic(d) if d.kind == DiagnosticKind::Frame => Some(&d.entry.text),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec!["app/models/user.rb:7"]);
}

#[test]
fn test_tags_split_into_system_and_custom() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[a] [web-1] Started GET "/""#,
        "[a] [web-1] [job:7] LOG: enqueued",
        "[a] [web-1] LOG: done",
        "[a] [web-1] Completed 200 OK in 1ms",
    ]);

    let records = records(&emissions);
    let view = records[0];
    assert_eq!(view.system_tags, vec!["web-1"]);
    assert_eq!(view.log[0].tags, vec!["job:7"]);
    assert!(view.log[1].tags.is_empty());
}

#[test]
fn test_lines_before_start_are_kept() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        "[a] LOG: early bird",
        r#"[a] Started GET "/late""#,
        "[a] Completed 200 OK in 1ms",
    ]);
    let records = records(&emissions);
    assert_eq!(records[0].log.len(), 1);
}

#[test]
fn test_multi_word_query_headers_land_in_sql() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[q] Started PATCH "/comments/seen" for 127.0.0.1"#,
        r#"[q]   Comment Update All (0.9ms)  UPDATE "comments" SET "seen" = ?"#,
        r#"[q]   Comment Delete All (0.4ms)  DELETE FROM "comments" WHERE "spam" = ?"#,
        r#"[q]   User Ids (0.2ms)  SELECT "users"."id" FROM "users""#,
        "[q] Completed 204 No Content in 3ms",
    ]);

    let records = records(&emissions);
    assert_eq!(records.len(), 1);
    let view = records[0];
    assert_eq!(view.sql.len(), 3);
    assert!(view.log.is_empty());
    let kinds: Vec<_> = view.sql.iter().map(|sql| sql.kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(DataAccessKind::Update),
            Some(DataAccessKind::Delete),
            None
        ]
    );
}

#[test]
fn test_error_text_on_a_frame_line_is_an_error_diagnostic() {
    let mut correlator = RequestCorrelator::default();
    let emissions = correlator.process_lines([
        r#"[e] Started GET "/boom" for 127.0.0.1"#,
        "[e] Completed 500 Internal Server Error in 2ms",
        "[e] app/models/user.rb:14:in `save!': undefined method `x' for nil",
        "[e] app/models/user.rb:20:in `touch'",
    ]);

    assert_eq!(emissions.len(), 3);
    let Emission::Diagnostic(error) = &emissions[1] else {
        panic!("expected error diagnostic");
    };
    assert_eq!(error.kind, DiagnosticKind::Error);
    assert!(error.entry.text.contains("undefined method"));

    let Emission::Diagnostic(frame) = &emissions[2] else {
        panic!("expected frame diagnostic");
    };
    assert_eq!(frame.kind, DiagnosticKind::Frame);
    assert_eq!(frame.entry.text, "app/models/user.rb:20");
}
