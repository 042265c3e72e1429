// invoice-stamp-cli/src/main.rs
// ============================================================================
// Module: Invoice Stamp CLI Entry Point
// Description: Command dispatcher for signing and verification workflows.
// Purpose: Provide a local host surface over the Invoice Stamp core service.
// Dependencies: clap, invoice-stamp-core, invoice-stamp-config, invoice-stamp-keys
// ============================================================================

//! ## Overview
//! The Invoice Stamp CLI signs and verifies invoice documents on disk using
//! a [`SigningService`] built from TOML configuration and a file-backed key
//! provider. It stands in for the out-of-scope REST layer during local and
//! operational workflows. Inputs are untrusted and size-capped before
//! parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use invoice_stamp_config::InvoiceStampConfig;
use invoice_stamp_core::CacheMetrics;
use invoice_stamp_core::InvoiceDocument;
use invoice_stamp_core::MetricsSnapshot;
use invoice_stamp_core::SigningService;
use invoice_stamp_core::VerificationReport;
use invoice_stamp_keys::FileKeyProvider;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum invoice file size in bytes.
const MAX_INVOICE_FILE_SIZE: usize = 10 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Invoice Stamp command-line interface.
#[derive(Debug, Parser)]
#[command(name = "invoice-stamp", about = "Sign and verify invoice documents", version)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Signs an invoice and attaches the stamp.
    Sign(SignArgs),
    /// Verifies the stamp carried by an invoice.
    Verify(VerifyArgs),
    /// Signs a batch of invoices and reports metrics.
    BatchSign(BatchSignArgs),
}

/// Arguments for the `sign` command.
#[derive(Debug, clap::Args)]
struct SignArgs {
    /// Path to the invoice JSON document.
    #[arg(long)]
    invoice: PathBuf,
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output path for the stamped document; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Arguments for the `verify` command.
#[derive(Debug, clap::Args)]
struct VerifyArgs {
    /// Path to the invoice JSON document.
    #[arg(long)]
    invoice: PathBuf,
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Explicit CSID to verify instead of the one carried by the invoice.
    #[arg(long)]
    csid: Option<String>,
}

/// Arguments for the `batch-sign` command.
#[derive(Debug, clap::Args)]
struct BatchSignArgs {
    /// Paths to invoice JSON documents.
    #[arg(long, required = true, num_args = 1..)]
    invoices: Vec<PathBuf>,
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving stamped documents; stdout summary only when omitted.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the tracing subscriber from the environment filter.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sign(args) => command_sign(&args),
        Commands::Verify(args) => command_verify(&args),
        Commands::BatchSign(args) => command_batch_sign(&args),
    }
}

// ============================================================================
// SECTION: Sign Command
// ============================================================================

/// Signs one invoice and writes the stamped document.
fn command_sign(args: &SignArgs) -> CliResult<ExitCode> {
    let service = build_service(args.config.as_deref())?;
    let mut invoice = read_invoice(&args.invoice)?;
    service
        .sign_and_attach(&mut invoice)
        .map_err(|err| CliError::new(format!("signing failed: {err}")))?;
    write_document(&invoice, args.output.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Verifies one invoice and prints the report.
fn command_verify(args: &VerifyArgs) -> CliResult<ExitCode> {
    let service = build_service(args.config.as_deref())?;
    let invoice = read_invoice(&args.invoice)?;
    let report = match &args.csid {
        Some(csid) => {
            let mut unstamped = invoice;
            unstamped.insert("csid", serde_json::Value::String(csid.clone()));
            verify_via_service(&service, &unstamped)?
        }
        None => verify_via_service(&service, &invoice)?,
    };
    write_json_line(&report)?;
    if report.is_valid() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Runs document verification through the service.
fn verify_via_service(
    service: &SigningService,
    invoice: &InvoiceDocument,
) -> CliResult<VerificationReport> {
    service
        .verify_invoice(invoice)
        .map_err(|err| CliError::new(format!("verification key unavailable: {err}")))
}

// ============================================================================
// SECTION: Batch Sign Command
// ============================================================================

/// Per-item batch result line.
#[derive(Debug, Serialize)]
struct BatchItemReport {
    /// Input path for the item.
    path: String,
    /// Whether the item was signed.
    signed: bool,
    /// Error message for failed items.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Batch summary printed after signing.
#[derive(Debug, Serialize)]
struct BatchSummary {
    /// Per-item outcomes in input order.
    items: Vec<BatchItemReport>,
    /// Signing metrics snapshot after the batch.
    metrics: MetricsSnapshot,
    /// Cache counters after the batch.
    cache: CacheMetrics,
}

/// Signs a batch of invoices and prints a summary.
fn command_batch_sign(args: &BatchSignArgs) -> CliResult<ExitCode> {
    let service = build_service(args.config.as_deref())?;
    let mut documents = Vec::with_capacity(args.invoices.len());
    for path in &args.invoices {
        documents.push(read_invoice(path)?);
    }
    let results = service
        .sign_batch(&documents)
        .map_err(|err| CliError::new(format!("batch signing failed: {err}")))?;

    let mut items = Vec::with_capacity(results.len());
    let mut failures = 0_usize;
    for ((path, mut document), result) in
        args.invoices.iter().zip(documents).zip(results.into_iter())
    {
        match result {
            Ok(stamp) => {
                document
                    .attach_stamp(&stamp)
                    .map_err(|err| CliError::new(format!("stamp attachment failed: {err}")))?;
                if let Some(output_dir) = &args.output_dir {
                    write_batch_output(output_dir, path, &document)?;
                }
                items.push(BatchItemReport {
                    path: path.to_string_lossy().into_owned(),
                    signed: true,
                    error: None,
                });
            }
            Err(err) => {
                failures += 1;
                items.push(BatchItemReport {
                    path: path.to_string_lossy().into_owned(),
                    signed: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    let summary = BatchSummary {
        items,
        metrics: service.metrics_snapshot(),
        cache: service.cache_metrics(),
    };
    write_json_line(&summary)?;
    if failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Writes one stamped batch document into the output directory.
fn write_batch_output(
    output_dir: &Path,
    input_path: &Path,
    document: &InvoiceDocument,
) -> CliResult<()> {
    fs::create_dir_all(output_dir)
        .map_err(|err| CliError::new(format!("output directory unavailable: {err}")))?;
    let file_name = input_path
        .file_name()
        .ok_or_else(|| CliError::new("input path has no file name".to_string()))?;
    write_document(document, Some(&output_dir.join(file_name)))
}

// ============================================================================
// SECTION: Document I/O
// ============================================================================

/// Reads and parses an invoice document with a size cap.
fn read_invoice(path: &Path) -> CliResult<InvoiceDocument> {
    let bytes =
        fs::read(path).map_err(|err| CliError::new(format!("unable to read invoice: {err}")))?;
    if bytes.len() > MAX_INVOICE_FILE_SIZE {
        return Err(CliError::new("invoice file exceeds size limit".to_string()));
    }
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid invoice json: {err}")))?;
    InvoiceDocument::from_value(value)
        .map_err(|err| CliError::new(format!("invalid invoice document: {err}")))
}

/// Writes a document to a path or stdout.
fn write_document(document: &InvoiceDocument, output: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|err| CliError::new(format!("document serialization failed: {err}")))?;
    match output {
        Some(path) => fs::write(path, json.as_bytes())
            .map_err(|err| CliError::new(format!("unable to write output: {err}"))),
        None => write_stdout_line(&json)
            .map_err(|err| CliError::new(format!("stdout write failed: {err}"))),
    }
}

/// Serializes a value as a single JSON line on stdout.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("serialization failed: {err}")))?;
    write_stdout_line(&json).map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

// ============================================================================
// SECTION: Service Construction
// ============================================================================

/// Builds a signing service from configuration and the file key provider.
fn build_service(config_path: Option<&Path>) -> CliResult<SigningService> {
    let config = InvoiceStampConfig::load(config_path)
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    let provider = FileKeyProvider::new(&config.keys.key_dir, &config.keys.active_key_id)
        .map_err(|err| CliError::new(format!("key provider error: {err}")))?;
    SigningService::new(config.signing.to_settings(), Arc::new(provider))
        .map_err(|err| CliError::new(format!("service construction failed: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Reports an error on stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
