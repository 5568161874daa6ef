//! Error types for document assembly and reference resolution.

use thiserror::Error;

/// Errors raised by builder operations, reference resolution and serialization.
///
/// Every builder call either completes or returns one of these without
/// touching the document.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocError {
    /// A channel with the same sanitized id is already registered
    #[error("channel '{0}' already exists")]
    DuplicateChannel(String),

    /// A message id is already registered in the target table
    #[error("message '{message}' already registered in '{scope}'")]
    DuplicateMessage { scope: String, message: String },

    /// An operation with the same `<channel>/<id>` key is already registered
    #[error("operation '{0}' already exists")]
    DuplicateOperation(String),

    /// Pointer does not start with `#/`
    #[error("malformed reference '{0}': pointers must start with '#/'")]
    MalformedReference(String),

    /// Pointer is well-formed but one of its segments is absent
    #[error("broken reference '{pointer}': segment '{segment}' not found")]
    BrokenReference { pointer: String, segment: String },

    /// `add_component` was asked for a table the components object does not have
    #[error("unknown components kind '{0}'")]
    UnknownComponentKind(String),

    /// A schema name is taken by a differently-shaped schema
    #[error("schema '{0}' is already registered with a different shape")]
    SchemaConflict(String),

    /// An explicitly supplied schema model could not be rendered
    #[error(transparent)]
    Schema(#[from] crate::schema::SchemaError),

    #[error("json serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DocError {
    pub(crate) fn broken(pointer: &str, segment: &str) -> Self {
        DocError::BrokenReference {
            pointer: pointer.to_string(),
            segment: segment.to_string(),
        }
    }

    /// Short machine-readable kind, used by the reference lint
    pub fn kind(&self) -> &'static str {
        match self {
            DocError::DuplicateChannel(_) => "duplicate_channel",
            DocError::DuplicateMessage { .. } => "duplicate_message",
            DocError::DuplicateOperation(_) => "duplicate_operation",
            DocError::MalformedReference(_) => "malformed_reference",
            DocError::BrokenReference { .. } => "broken_reference",
            DocError::UnknownComponentKind(_) => "unknown_component_kind",
            DocError::SchemaConflict(_) => "schema_conflict",
            DocError::Schema(_) => "schema",
            DocError::Serialization(_) => "serialization",
            DocError::Yaml(_) => "yaml",
        }
    }
}

pub type Result<T, E = DocError> = std::result::Result<T, E>;
