// invoice-stamp-keys/src/file.rs
// ============================================================================
// Module: File Key Provider
// Description: Directory-backed PEM key loading with in-memory handles.
// Purpose: Supply signing keys from disk without per-call I/O.
// Dependencies: invoice-stamp-core, rsa
// ============================================================================

//! ## Overview
//! Keys live as PKCS#8 PEM files in a single directory; the file stem is the
//! key identifier. The directory is scanned once at construction and again on
//! rotation, and parsed handles are cached in memory. Rotation promotes the
//! lexicographically greatest key identifier in the directory, so operators
//! roll keys by dropping a new PEM named with a later identifier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use invoice_stamp_core::KeyHandle;
use invoice_stamp_core::KeyLoadError;
use invoice_stamp_core::KeyProvider;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File extension recognized as key material.
const KEY_FILE_EXTENSION: &str = "pem";

/// Maximum size of a single key file in bytes.
const MAX_KEY_FILE_SIZE: u64 = 64 * 1024;

// ============================================================================
// SECTION: File Key Provider
// ============================================================================

/// Key provider backed by a directory of PEM files.
///
/// # Invariants
/// - Every loaded handle stays cached until the provider is dropped; disk is
///   only re-read on rotation.
#[derive(Debug)]
pub struct FileKeyProvider {
    /// Directory containing the PEM key files.
    key_dir: PathBuf,
    /// Loaded handles keyed by key identifier.
    handles: RwLock<BTreeMap<String, Arc<KeyHandle>>>,
    /// Identifier of the active signing key.
    active: RwLock<String>,
}

impl FileKeyProvider {
    /// Loads all keys from a directory and activates the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError`] when the directory cannot be read, a key file
    /// is unusable, or the active identifier is not present.
    pub fn new(key_dir: impl Into<PathBuf>, active_key_id: &str) -> Result<Self, KeyLoadError> {
        let key_dir = key_dir.into();
        let handles = load_key_dir(&key_dir)?;
        if !handles.contains_key(active_key_id) {
            return Err(KeyLoadError::UnknownKeyId(active_key_id.to_string()));
        }
        Ok(Self {
            key_dir,
            handles: RwLock::new(handles),
            active: RwLock::new(active_key_id.to_string()),
        })
    }

    /// Returns the identifiers of all loaded keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError::Io`] when the handle lock is poisoned.
    pub fn key_ids(&self) -> Result<Vec<String>, KeyLoadError> {
        let guard = self
            .handles
            .read()
            .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}

impl KeyProvider for FileKeyProvider {
    fn get_current_key(&self) -> Result<Arc<KeyHandle>, KeyLoadError> {
        let active = self
            .active
            .read()
            .map_err(|_| KeyLoadError::Io("active key lock poisoned".to_string()))?
            .clone();
        let guard = self
            .handles
            .read()
            .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
        guard.get(&active).cloned().ok_or(KeyLoadError::UnknownKeyId(active))
    }

    fn get_verification_key(&self, key_id: &str) -> Result<RsaPublicKey, KeyLoadError> {
        let guard = self
            .handles
            .read()
            .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
        guard
            .get(key_id)
            .map(|handle| handle.public().clone())
            .ok_or_else(|| KeyLoadError::UnknownKeyId(key_id.to_string()))
    }

    fn rotate_key(&self) -> Result<String, KeyLoadError> {
        let reloaded = load_key_dir(&self.key_dir)?;
        let successor = reloaded
            .keys()
            .next_back()
            .cloned()
            .ok_or_else(|| KeyLoadError::Io("key directory is empty".to_string()))?;
        {
            let mut guard = self
                .handles
                .write()
                .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
            *guard = reloaded;
        }
        let mut active = self
            .active
            .write()
            .map_err(|_| KeyLoadError::Io("active key lock poisoned".to_string()))?;
        active.clone_from(&successor);
        drop(active);
        debug!(key_id = %successor, "file key provider rotated");
        Ok(successor)
    }
}

// ============================================================================
// SECTION: Directory Loading
// ============================================================================

/// Loads every PEM key file from a directory.
fn load_key_dir(key_dir: &Path) -> Result<BTreeMap<String, Arc<KeyHandle>>, KeyLoadError> {
    let entries = fs::read_dir(key_dir).map_err(|err| KeyLoadError::Io(err.to_string()))?;
    let mut handles = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|err| KeyLoadError::Io(err.to_string()))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(KEY_FILE_EXTENSION) {
            continue;
        }
        let Some(key_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let handle = load_key_file(&path, key_id)?;
        handles.insert(key_id.to_string(), Arc::new(handle));
    }
    if handles.is_empty() {
        return Err(KeyLoadError::Io(format!(
            "no key files found in {}",
            key_dir.to_string_lossy()
        )));
    }
    Ok(handles)
}

/// Loads and parses a single PEM key file.
fn load_key_file(path: &Path, key_id: &str) -> Result<KeyHandle, KeyLoadError> {
    let metadata = fs::metadata(path).map_err(|err| KeyLoadError::Io(err.to_string()))?;
    if metadata.len() > MAX_KEY_FILE_SIZE {
        return Err(KeyLoadError::Invalid(format!("key file too large: {key_id}")));
    }
    let pem = fs::read_to_string(path).map_err(|err| KeyLoadError::Io(err.to_string()))?;
    let private = parse_private_key(&pem)
        .map_err(|reason| KeyLoadError::Invalid(format!("{key_id}: {reason}")))?;
    Ok(KeyHandle::new(key_id, private))
}

/// Parses a PKCS#8 or PKCS#1 PEM private key.
fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, String> {
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs1_pem(pem).map_err(|err| err.to_string())
}
