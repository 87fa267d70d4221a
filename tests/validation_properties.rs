//! Structural validation against the bundled schemas.

use gateway_config_engine::report::ErrorKind;
use gateway_config_engine::schema::bundled;
use gateway_config_engine::{validate, ValidationError};

mod common;

fn paths_and_kinds(errors: &[ValidationError]) -> Vec<(String, ErrorKind)> {
    errors.iter().map(|e| (e.path(), e.kind())).collect()
}

#[test]
fn test_fixture_documents_are_valid() {
    let config = bundled::config_schema().unwrap();
    let pipeline = bundled::pipeline_schema().unwrap();
    assert_eq!(validate(&common::tree(common::GLOBAL_CONFIG), &config), vec![]);
    assert_eq!(validate(&common::tree(common::PIPELINE_MAIN), &pipeline), vec![]);
}

#[test]
fn test_every_error_reported_in_one_pass() {
    let schema = bundled::config_schema().unwrap();
    let doc = common::tree(
        r#"
        [proxy]
        log_level = "loud"

        [network.default.http]
        bind_address = "0.0.0.0"
        bind_port = 70000

        [storage]
        backend = "s3"

        [authentications.broken]
        method = "jwt"
        scopes = ["read", 7]
        "#,
    );

    let errors = validate(&doc, &schema);
    assert_eq!(
        paths_and_kinds(&errors),
        vec![
            ("proxy.id".to_string(), ErrorKind::MissingField),
            ("proxy.log_level".to_string(), ErrorKind::EnumViolation),
            ("network.default.http.bind_port".to_string(), ErrorKind::RangeViolation),
            ("storage.bucket".to_string(), ErrorKind::MissingField),
            ("authentications.broken.jwks_uri".to_string(), ErrorKind::MissingField),
            ("authentications.broken.scopes[1]".to_string(), ErrorKind::ArrayItemTypeViolation),
        ]
    );
}

#[test]
fn test_bad_instance_name_is_one_error() {
    let schema = bundled::config_schema().unwrap();
    let doc = common::tree(
        r#"
        [proxy]
        id = "gw"

        [network."VPN!"]
        enable_wireguard = "yes"

        [network.default]
        enable_wireguard = true
        "#,
    );

    let errors = validate(&doc, &schema);
    assert_eq!(
        paths_and_kinds(&errors),
        vec![
            ("network.VPN!".to_string(), ErrorKind::PatternMismatch),
            ("network.default.interface".to_string(), ErrorKind::MissingField),
        ]
    );
}

#[test]
fn test_bad_instance_name_hides_nested_tables() {
    let schema = bundled::config_schema().unwrap();
    let doc = common::tree(
        r#"
        [proxy]
        id = "gw"

        [network."VPN!"]
        [network."VPN!".http]
        bind_port = "not a port"

        [peers."bad peer!".connection]
        host = 5
        "#,
    );

    let errors = validate(&doc, &schema);
    assert_eq!(
        paths_and_kinds(&errors),
        vec![
            ("network.VPN!".to_string(), ErrorKind::PatternMismatch),
            ("peers.bad peer!".to_string(), ErrorKind::PatternMismatch),
        ]
    );
}

#[test]
fn test_conditional_requirement_follows_sibling() {
    let schema = bundled::config_schema().unwrap();

    let errors = validate(&common::tree("[proxy]\nid = 'gw'\n[management]\nenabled = true"), &schema);
    assert_eq!(
        errors,
        vec![ValidationError::MissingField {
            table: "management".into(),
            field: "network".into(),
            condition: Some("enabled == true".into()),
        }]
    );

    let errors = validate(&common::tree("[proxy]\nid = 'gw'\n[management]\nenabled = false"), &schema);
    assert!(errors.is_empty());

    // Absent sibling: the condition is false.
    let errors = validate(&common::tree("[proxy]\nid = 'gw'\n[management]\nbase_path = 'ops'"), &schema);
    assert!(errors.is_empty());
}

#[test]
fn test_wrong_type_reports_only_the_mismatch() {
    let schema = bundled::pipeline_schema().unwrap();
    let doc = common::tree(
        r#"
        [pipelines.main]
        networks = "default"
        endpoints = ["a"]
        backends = []

        [backends.b]
        service = "http"
        timeout_secs = 0
        "#,
    );

    let errors = validate(&doc, &schema);
    assert_eq!(
        paths_and_kinds(&errors),
        vec![
            ("pipelines.main.networks".to_string(), ErrorKind::TypeMismatch),
            ("pipelines.main.backends".to_string(), ErrorKind::ArrayLengthViolation),
            ("backends.b.timeout_secs".to_string(), ErrorKind::RangeViolation),
        ]
    );
}

#[test]
fn test_reports_are_deterministic() {
    let engine = common::engine();
    let sources = common::sources(
        "[proxy]\nlog_level = 1\n[storage]\nbackend = 'tape'",
        &[("main.toml", "[backends.b]\nservice = 1")],
    );

    let first = engine.evaluate(&sources).report;
    let second = engine.evaluate(&sources).report;
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.to_string(), second.to_string());
    assert!(first.error_count() >= 4);
}
