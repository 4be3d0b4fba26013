//! Contract Test: Layout Documents Drive Reconciliation
//!
//! Constraints verified:
//! - A layout document loads into the same zones as the hand-built fixture
//! - Names are normalized, with or without a trailing separator
//! - Loading then reconciling the reference document yields the reference actions
//! - Malformed documents are rejected before any provider is contacted

mod common;

use common::*;
use dnser_core::{DnsRecord, EngineConfig, Error, Reconciler, ZoneLayout, compute_actions};
use std::io::Write;

#[test]
fn reference_document_matches_fixture() {
    let layout = ZoneLayout::from_str(REFERENCE_LAYOUT).unwrap();
    assert_eq!(layout.api_version, 1);
    assert_eq!(layout.zones, vec![reference_zone()]);
}

#[test]
fn trailing_separators_do_not_change_the_zone() {
    let mixed = r#"apiVersion: 1
config:
- ip: " 127.0.0.1 "
  domain: example.org.
  aliases:
  - foo.example.org.:
    - bar.example.org
    - baz.example.org.
  - foobar.example.org
"#;
    let layout = ZoneLayout::from_str(mixed).unwrap();
    assert_eq!(layout.zones, vec![reference_zone()]);
}

#[test]
fn loaded_layout_yields_reference_actions() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(REFERENCE_LAYOUT.as_bytes()).unwrap();

    let layout = ZoneLayout::from_path(file.path()).unwrap();
    let actions = compute_actions(&layout.zones, &reference_observed()).unwrap();

    assert_eq!(
        actions.puts,
        vec![
            DnsRecord::alias("bar.example.org", "foo.example.org"),
            DnsRecord::alias("baz.example.org", "foo.example.org"),
            DnsRecord::alias("foobar.example.org", "example.org"),
        ]
    );
    assert_eq!(actions.deletes, vec![domain("bar.foo.example.org")]);
}

#[test]
fn malformed_documents_are_rejected() {
    let cases = [
        ("apiVersion: 2\nconfig: []\n", "version"),
        ("apiVersion: 1\nconfig:\n- ip: not-an-ip\n  domain: example.org\n", "ip"),
        (
            "apiVersion: 1\nconfig:\n- ip: 127.0.0.1\n  domain: example.org\n  aliases:\n  - a.example.org: x\n    b.example.org: y\n",
            "two-key mapping",
        ),
        (
            "apiVersion: 1\nconfig:\n- ip: 127.0.0.1\n  domain: example.org\n  aliases:\n  - 42\n",
            "number entry",
        ),
        (
            "apiVersion: 1\nconfig:\n- ip: 127.0.0.1\n  domain: bad..example.org\n",
            "empty label",
        ),
        ("config: [", "broken yaml"),
    ];

    for (document, what) in cases {
        let result = ZoneLayout::from_str(document);
        assert!(
            matches!(result, Err(Error::ConfigParse(_))),
            "{what}: expected ConfigParse, got {result:?}"
        );
    }
}

#[test]
fn duplicate_alias_names_are_rejected() {
    // bar sits under foo and again under foobar
    let document = r#"apiVersion: 1
config:
- ip: 127.0.0.1
  domain: example.org
  aliases:
  - foo.example.org:
    - bar.example.org
  - foobar.example.org:
    - bar.example.org
"#;
    let result = ZoneLayout::from_str(document);
    assert!(
        matches!(result, Err(Error::ConfigParse(ref msg)) if msg.contains("bar.example.org.")),
        "got {result:?}"
    );

    // Same name twice at the top level
    let document = "apiVersion: 1\nconfig:\n- ip: 127.0.0.1\n  domain: example.org\n  aliases:\n  - foo.example.org\n  - foo.example.org.\n";
    assert!(matches!(
        ZoneLayout::from_str(document),
        Err(Error::ConfigParse(_))
    ));
}

#[test]
fn apex_cannot_be_its_own_alias() {
    let document = r#"apiVersion: 1
config:
- ip: 127.0.0.1
  domain: example.org
  aliases:
  - foo.example.org:
    - example.org
"#;
    let result = ZoneLayout::from_str(document);
    assert!(
        matches!(result, Err(Error::ConfigParse(ref msg)) if msg.contains("apex")),
        "got {result:?}"
    );
}

#[test]
fn missing_layout_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ZoneLayout::from_path(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn layout_round_trips_through_the_reconciler() {
    let layout = ZoneLayout::from_str(REFERENCE_LAYOUT).unwrap();
    let provider = RecordingProvider::new(reference_observed());
    let (reconciler, _rx) = Reconciler::new(
        Box::new(RecordingProvider::sharing_counters_with(&provider)),
        layout.zones,
        EngineConfig::default(),
    )
    .unwrap();

    reconciler.run_once().await.unwrap();
    let records = provider.records().await;

    for expected in [
        DnsRecord::address("example.org", LOCALHOST),
        DnsRecord::alias("foo.example.org", "example.org"),
        DnsRecord::alias("bar.example.org", "foo.example.org"),
        DnsRecord::alias("baz.example.org", "foo.example.org"),
        DnsRecord::alias("foobar.example.org", "example.org"),
    ] {
        assert!(records.contains(&expected), "missing {expected}");
    }
    assert!(!records.iter().any(|r| r.name == domain("bar.foo.example.org")));
}
