// invoice-stamp-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and invoice read limits.
// Purpose: Ensure bounded reads fail closed and arguments parse as expected.
// Dependencies: invoice-stamp-cli main helpers
// ============================================================================

//! ## Overview
//! Validates CLI argument parsing and `read_invoice` size enforcement.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::CommandFactory;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::read_invoice;

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn sign_arguments_parse() {
    let cli = Cli::parse_from([
        "invoice-stamp",
        "sign",
        "--invoice",
        "invoice.json",
        "--config",
        "invoice-stamp.toml",
    ]);
    match cli.command {
        Commands::Sign(args) => {
            assert_eq!(args.invoice.to_string_lossy(), "invoice.json");
            assert!(args.output.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn batch_sign_requires_invoices() {
    let result = Cli::try_parse_from(["invoice-stamp", "batch-sign"]);
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Invoice Reading
// ============================================================================

#[test]
fn read_invoice_rejects_non_object_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.json");
    fs::write(&path, b"[1, 2, 3]").unwrap();
    assert!(read_invoice(&path).is_err());
}

#[test]
fn read_invoice_parses_object_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoice.json");
    fs::write(&path, br#"{"invoice_number": "INV001", "amount": 100}"#).unwrap();
    let invoice = read_invoice(&path).unwrap();
    assert_eq!(invoice.get("invoice_number").and_then(|v| v.as_str()), Some("INV001"));
}
