//! Identifier capability: documents references to managed data-store records
//! as plain identifier strings.

use super::types::ExternalType;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// What the capability knows about a managed record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecord {
    /// Name of the primary-key field on record instances
    pub primary_key: String,
    /// Value of the `format` keyword in the document schema (e.g. `uuid`)
    pub format: String,
}

/// Pluggable lookup that recognizes managed record types.
///
/// Without one, external types are opaque to the rewriter.
pub trait IdentifierCapability: Send + Sync {
    fn managed_record(&self, ty: &ExternalType) -> Option<ManagedRecord>;
}

/// Capability backed by a fixed set of record names with UUID primary keys
#[derive(Debug, Clone, Default)]
pub struct UuidRecords {
    records: HashMap<String, String>,
}

impl UuidRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a managed record by name with its primary-key field
    pub fn with_record(mut self, name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        self.register(name, primary_key);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, primary_key: impl Into<String>) {
        self.records.insert(name.into(), primary_key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IdentifierCapability for UuidRecords {
    fn managed_record(&self, ty: &ExternalType) -> Option<ManagedRecord> {
        self.records
            .get(&ty.name)
            .or_else(|| self.records.get(&ty.key.0))
            .map(|pk| ManagedRecord {
                primary_key: pk.clone(),
                format: "uuid".to_string(),
            })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("null is not a valid {0} identifier")]
    Null(String),
    #[error("record instance is missing primary key '{0}'")]
    MissingPrimaryKey(String),
    #[error("'{0}' is not a valid uuid")]
    InvalidUuid(String),
    #[error("unsupported identifier value: {0}")]
    Unsupported(String),
}

/// Schema type standing in for a managed record reference.
///
/// Accepts a record instance, an identifier or an identifier-shaped string,
/// and normalizes all of them to a [`Uuid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRef {
    /// Generated name, `<Record>UUIDRef`
    pub name: String,
    pub record: String,
    pub primary_key: String,
    pub format: String,
}

impl IdentifierRef {
    pub fn new(record: &ExternalType, managed: ManagedRecord) -> Self {
        IdentifierRef {
            name: format!("{}UUIDRef", record.name),
            record: record.name.clone(),
            primary_key: managed.primary_key,
            format: managed.format,
        }
    }

    /// Document-facing leaf schema
    pub fn schema(&self) -> Value {
        json!({ "type": "string", "format": self.format })
    }

    pub fn normalize(&self, value: &Value) -> Result<Uuid, IdentifierError> {
        match value {
            Value::Null => Err(IdentifierError::Null(self.record.clone())),
            Value::Object(obj) => match obj.get(&self.primary_key) {
                Some(Value::Null) | None => {
                    Err(IdentifierError::MissingPrimaryKey(self.primary_key.clone()))
                }
                Some(pk) => self.normalize(pk),
            },
            Value::String(s) => {
                Uuid::parse_str(s).map_err(|_| IdentifierError::InvalidUuid(s.clone()))
            }
            other => Err(IdentifierError::Unsupported(other.to_string())),
        }
    }
}
