// invoice-stamp-core/src/core/invoice.rs
// ============================================================================
// Module: Invoice Document Model
// Description: JSON object wrapper for invoice payloads entering the core.
// Purpose: Provide field access, stamp attachment, and CSID lookup.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The core treats invoices as opaque JSON objects apart from the signing
//! artifact fields it must strip and re-attach. [`InvoiceDocument`] wraps a
//! `serde_json` object map so hosts can hand over payloads from any API
//! surface without conversion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::canonical::EncodingError;
use crate::core::stamp::CryptographicStamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Top-level fields stripped before canonicalization.
///
/// These represent prior signing artifacts and must never be part of what
/// gets re-signed or re-verified.
pub const STRIPPED_FIELDS: [&str; 3] = ["signature", "csid", "cryptographic_stamp"];

/// Field name under which a stamp is attached to a document.
const STAMP_FIELD: &str = "cryptographic_stamp";

/// Field name for a bare top-level CSID value.
const CSID_FIELD: &str = "csid";

// ============================================================================
// SECTION: Invoice Document
// ============================================================================

/// Invoice payload as a JSON object.
///
/// # Invariants
/// - The wrapped value is always a JSON object; array or scalar payloads are
///   rejected at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct InvoiceDocument {
    /// Invoice fields keyed by name.
    fields: Map<String, Value>,
}

impl InvoiceDocument {
    /// Creates a document from an object map.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
        }
    }

    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::NotAnObject`] when the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, EncodingError> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
            }),
            _ => Err(EncodingError::NotAnObject),
        }
    }

    /// Returns a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Inserts a field value, returning any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Removes a field value by name.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the underlying field map.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the document and returns the field map.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Returns the CSID carried by the document, if any.
    ///
    /// A bare top-level `csid` field takes precedence; otherwise the `csid`
    /// inside an attached `cryptographic_stamp` object is used.
    #[must_use]
    pub fn csid(&self) -> Option<&str> {
        if let Some(Value::String(csid)) = self.fields.get(CSID_FIELD) {
            return Some(csid.as_str());
        }
        if let Some(Value::Object(stamp)) = self.fields.get(STAMP_FIELD)
            && let Some(Value::String(csid)) = stamp.get(CSID_FIELD)
        {
            return Some(csid.as_str());
        }
        None
    }

    /// Attaches a stamp to the document, replacing any prior stamp.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::Canonicalization`] when the stamp cannot be
    /// serialized to a JSON object.
    pub fn attach_stamp(&mut self, stamp: &CryptographicStamp) -> Result<(), EncodingError> {
        let value = serde_json::to_value(stamp)
            .map_err(|err| EncodingError::Canonicalization(err.to_string()))?;
        self.fields.insert(STAMP_FIELD.to_string(), value);
        Ok(())
    }

    /// Returns a copy of the fields with prior signing artifacts removed.
    #[must_use]
    pub fn stripped_fields(&self) -> Map<String, Value> {
        let mut stripped = self.fields.clone();
        for field in STRIPPED_FIELDS {
            stripped.remove(field);
        }
        stripped
    }
}

impl From<Map<String, Value>> for InvoiceDocument {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
