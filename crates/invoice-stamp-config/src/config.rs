// invoice-stamp-config/src/config.rs
// ============================================================================
// Module: Invoice Stamp Configuration
// Description: Configuration loading and validation for Invoice Stamp hosts.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: invoice-stamp-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file resolved from an explicit path or
//! the `INVOICE_STAMP_CONFIG` environment variable. Parsing is size-capped and
//! UTF-8 checked; every section validates against explicit bounds before a
//! service is built from it. Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use invoice_stamp_core::ALGORITHM_RSA_PSS_SHA256;
use invoice_stamp_core::STAMP_VERSION;
use invoice_stamp_core::SigningSettings;
use invoice_stamp_core::runtime::DEFAULT_CACHE_SIZE;
use invoice_stamp_core::runtime::DEFAULT_CACHE_TTL_SECS;
use invoice_stamp_core::runtime::DEFAULT_MAX_WORKERS;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "invoice-stamp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "INVOICE_STAMP_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a configured path string.
pub(crate) const MAX_PATH_LENGTH: usize = 4096;
/// Maximum length of a key identifier.
pub(crate) const MAX_KEY_ID_LENGTH: usize = 128;
/// Minimum signature cache capacity.
pub(crate) const MIN_CACHE_SIZE: usize = 1;
/// Maximum signature cache capacity.
pub(crate) const MAX_CACHE_SIZE: usize = 1_000_000;
/// Minimum signature cache TTL in seconds.
pub(crate) const MIN_CACHE_TTL_SECS: u64 = 1;
/// Maximum signature cache TTL in seconds (seven days).
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;
/// Minimum batch worker count.
pub(crate) const MIN_MAX_WORKERS: usize = 1;
/// Maximum batch worker count.
pub(crate) const MAX_MAX_WORKERS: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Invoice Stamp host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceStampConfig {
    /// Signing engine configuration.
    #[serde(default)]
    pub signing: SigningSection,
    /// Key material configuration.
    pub keys: KeySection,
}

impl InvoiceStampConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signing.validate()?;
        self.keys.validate()?;
        Ok(())
    }
}

/// Signing engine configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSection {
    /// Signature algorithm identifier.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Stamp format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Whether the signature cache is enabled.
    #[serde(default = "default_enable_caching")]
    pub enable_caching: bool,
    /// Signature cache capacity in entries.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Signature cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Whether batch signing fans out across workers.
    #[serde(default = "default_parallel_processing")]
    pub parallel_processing: bool,
    /// Upper bound on concurrent signing workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            version: default_version(),
            enable_caching: default_enable_caching(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            parallel_processing: default_parallel_processing(),
            max_workers: default_max_workers(),
        }
    }
}

impl SigningSection {
    /// Validates the signing section against hard limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithm != ALGORITHM_RSA_PSS_SHA256 {
            return Err(ConfigError::Invalid(format!(
                "unsupported signing algorithm: {}",
                self.algorithm
            )));
        }
        if self.version.is_empty() {
            return Err(ConfigError::Invalid("stamp version must not be empty".to_string()));
        }
        validate_range("signing.cache_size", self.cache_size, MIN_CACHE_SIZE, MAX_CACHE_SIZE)?;
        validate_range_u64(
            "signing.cache_ttl_secs",
            self.cache_ttl_secs,
            MIN_CACHE_TTL_SECS,
            MAX_CACHE_TTL_SECS,
        )?;
        validate_range("signing.max_workers", self.max_workers, MIN_MAX_WORKERS, MAX_MAX_WORKERS)?;
        Ok(())
    }

    /// Converts the section into runtime signing settings.
    #[must_use]
    pub fn to_settings(&self) -> SigningSettings {
        SigningSettings {
            algorithm: self.algorithm.clone(),
            version: self.version.clone(),
            enable_caching: self.enable_caching,
            cache_size: self.cache_size,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            parallel_processing: self.parallel_processing,
            max_workers: self.max_workers,
        }
    }
}

/// Key material configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySection {
    /// Directory containing PEM key files.
    pub key_dir: String,
    /// Identifier of the active signing key.
    pub active_key_id: String,
}

impl KeySection {
    /// Validates the key section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("keys.key_dir", &self.key_dir)?;
        if self.active_key_id.is_empty() || self.active_key_id.len() > MAX_KEY_ID_LENGTH {
            return Err(ConfigError::Invalid("keys.active_key_id length invalid".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default signing algorithm identifier.
fn default_algorithm() -> String {
    ALGORITHM_RSA_PSS_SHA256.to_string()
}

/// Default stamp format version.
fn default_version() -> String {
    STAMP_VERSION.to_string()
}

/// Default cache enablement.
const fn default_enable_caching() -> bool {
    true
}

/// Default cache capacity.
const fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

/// Default cache TTL in seconds.
const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Default parallelism enablement.
const fn default_parallel_processing() -> bool {
    true
}

/// Default worker count.
const fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Resolves the config path from an explicit path or the environment.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR)
        && !env_path.is_empty()
    {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Validates an inclusive numeric range.
fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min} and {max} (got {value})"
        )));
    }
    Ok(())
}

/// Validates an inclusive numeric range for 64-bit fields.
fn validate_range_u64(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min} and {max} (got {value})"
        )));
    }
    Ok(())
}

/// Validates a configured path string.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} length invalid")));
    }
    if value.contains('\0') {
        return Err(ConfigError::Invalid(format!("{field} contains a nul byte")));
    }
    if Path::new(value).components().any(|component| {
        matches!(component, std::path::Component::ParentDir)
    }) {
        return Err(ConfigError::Invalid(format!("{field} must not contain parent traversal")));
    }
    Ok(())
}
