// invoice-stamp-config/tests/config_loading.rs
// ============================================================================
// Module: Configuration Loading Tests
// Description: Parsing, defaults, and fail-closed validation bounds.
// ============================================================================
//! ## Overview
//! Validates TOML parsing, default application, and that out-of-bounds or
//! unsupported values fail closed.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use invoice_stamp_config::ConfigError;
use invoice_stamp_config::InvoiceStampConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes config content to a temp file and returns its path.
fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("invoice-stamp.toml");
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// SECTION: Parsing and Defaults
// ============================================================================

/// Tests a minimal config applies signing defaults.
#[test]
fn test_minimal_config_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[keys]
key_dir = "/var/lib/invoice-stamp/keys"
active_key_id = "key-001"
"#,
    );

    let config = InvoiceStampConfig::load(Some(&path)).unwrap();
    assert_eq!(config.signing.algorithm, "RSA-PSS-SHA256");
    assert_eq!(config.signing.version, "2.0");
    assert!(config.signing.enable_caching);
    assert_eq!(config.signing.cache_size, 1024);
    assert_eq!(config.signing.cache_ttl_secs, 3600);
    assert!(config.signing.parallel_processing);
    assert_eq!(config.signing.max_workers, 4);
}

/// Tests a full config parses and converts to runtime settings.
#[test]
fn test_full_config_converts_to_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[signing]
algorithm = "RSA-PSS-SHA256"
version = "2.0"
enable_caching = false
cache_size = 64
cache_ttl_secs = 120
parallel_processing = false
max_workers = 2

[keys]
key_dir = "keys"
active_key_id = "key-001"
"#,
    );

    let config = InvoiceStampConfig::load(Some(&path)).unwrap();
    let settings = config.signing.to_settings();
    assert!(!settings.enable_caching);
    assert_eq!(settings.cache_size, 64);
    assert_eq!(settings.cache_ttl, Duration::from_secs(120));
    assert!(!settings.parallel_processing);
    assert_eq!(settings.max_workers, 2);
}

/// Tests a missing keys section is a parse error.
#[test]
fn test_missing_keys_section_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[signing]\n");
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

/// Tests a missing file is an io error.
#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = InvoiceStampConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

// ============================================================================
// SECTION: Validation Bounds
// ============================================================================

/// Tests an unsupported algorithm fails closed.
#[test]
fn test_unsupported_algorithm_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[signing]
algorithm = "RSA-PKCS1-SHA256"

[keys]
key_dir = "keys"
active_key_id = "key-001"
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

/// Tests zero workers are rejected.
#[test]
fn test_zero_workers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[signing]
max_workers = 0

[keys]
key_dir = "keys"
active_key_id = "key-001"
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

/// Tests an oversized cache is rejected.
#[test]
fn test_oversized_cache_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[signing]
cache_size = 10000000

[keys]
key_dir = "keys"
active_key_id = "key-001"
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

/// Tests a zero TTL is rejected.
#[test]
fn test_zero_ttl_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[signing]
cache_ttl_secs = 0

[keys]
key_dir = "keys"
active_key_id = "key-001"
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

/// Tests parent traversal in the key directory is rejected.
#[test]
fn test_key_dir_traversal_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[keys]
key_dir = "../outside"
active_key_id = "key-001"
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

/// Tests an empty active key id is rejected.
#[test]
fn test_empty_active_key_id_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[keys]
key_dir = "keys"
active_key_id = ""
"#,
    );
    let result = InvoiceStampConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
