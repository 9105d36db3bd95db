use std::io::Write;

use cspnet::config::{ConfigError, ServerConfig};
use cspnet::csp::CspError;
use cspnet::nonce::Nonce;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn policy_table_keeps_file_order() {
    let file = write_config(
        r#"
        port = 9000

        [csp.directives]
        scriptSrc = ["'self'", "'nonce-{nonce}'"]
        defaultSrc = ["'none'"]
        upgradeInsecureRequests = true
        "#,
    );
    let cfg = ServerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.port, 9000);

    let header = cfg.csp.header_value(&Nonce::from_token("42"), false).unwrap();
    assert_eq!(
        header,
        "script-src 'self' 'nonce-42'; default-src 'none'; upgrade-insecure-requests"
    );
}

#[test]
fn development_tokens_only_in_development() {
    let file = write_config(
        r#"
        development = true

        [csp.directives]
        connectSrc = ["'self'"]

        [csp.development]
        connectSrc = ["ws:"]
        "#,
    );
    let cfg = ServerConfig::load(file.path()).unwrap();
    assert!(cfg.development);

    let nonce = Nonce::from_token("n");
    assert_eq!(cfg.csp.header_value(&nonce, true).unwrap(), "connect-src 'self' ws:");
    assert_eq!(cfg.csp.header_value(&nonce, false).unwrap(), "connect-src 'self'");
}

#[test]
fn duplicate_in_file_fails_validation() {
    let file = write_config(
        r#"
        [csp.directives]
        scriptSrc = ["'self'"]
        script-src = ["'none'"]
        "#,
    );
    let cfg = ServerConfig::load(file.path()).unwrap();
    assert!(matches!(
        cfg.csp.validate(false),
        Err(CspError::DuplicateDirective { .. })
    ));
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let file = write_config("port = \"not a number\"");
    assert!(matches!(
        ServerConfig::load(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = ServerConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/cspnet.toml")).unwrap();
    let header = cfg.csp.validate(true).unwrap();
    assert!(header.starts_with("base-uri 'self'; object-src 'none'; connect-src 'self' ws:;"));
}
