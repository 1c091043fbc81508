//! Error types for EmberDB core.

use emberdb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type DbResult<T> = Result<T, DbError>;

/// Coarse classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required collection, document, transform, filter or index is absent.
    NotFound,
    /// A name or unique value is already taken.
    AlreadyExists,
    /// A document is malformed for the requested operation.
    InvalidDocument,
    /// A query is malformed or uses an unknown operator.
    InvalidQuery,
    /// An encrypted payload failed validation.
    InvalidEncryptedPayload,
    /// A serialized database could not be decoded.
    Format,
    /// Storage or I/O failure.
    Storage,
}

/// Errors that can occur in EmberDB core operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Persistence adapter error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Collection not found.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// Collection name already in use.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// Document identity does not reference a live document.
    #[error("document {id} not found in collection {collection}")]
    DocumentNotFound {
        /// The collection searched.
        collection: String,
        /// The identity that was not found.
        id: u64,
    },

    /// Dynamic view name already in use.
    #[error("dynamic view already exists: {name}")]
    ViewExists {
        /// Name of the view.
        name: String,
    },

    /// Dynamic view has no filter with the given uid.
    #[error("dynamic view {view} has no filter with uid {uid}")]
    FilterNotFound {
        /// Name of the view.
        view: String,
        /// The filter uid.
        uid: String,
    },

    /// Transform not found.
    #[error("transform not found: {name}")]
    TransformNotFound {
        /// Name of the transform.
        name: String,
    },

    /// Transform name already in use.
    #[error("transform already exists: {name}")]
    TransformExists {
        /// Name of the transform.
        name: String,
    },

    /// A unique constraint would be violated.
    #[error("duplicate key for unique field {field} in collection {collection}: {value}")]
    UniqueViolation {
        /// The collection.
        collection: String,
        /// The unique field.
        field: String,
        /// The offending value, JSON encoded.
        value: String,
    },

    /// The field has no unique index.
    #[error("field {field} is not a unique index of collection {collection}")]
    FieldNotUnique {
        /// The collection.
        collection: String,
        /// The field.
        field: String,
    },

    /// Document is malformed for the requested operation.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// Query is malformed.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// Query uses an operator this engine does not know.
    #[error("unknown operator: {operator}")]
    UnknownOperator {
        /// The operator key as written.
        operator: String,
    },

    /// Serialized database is malformed.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl DbError {
    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates a document not found error.
    pub fn document_not_found(collection: impl Into<String>, id: u64) -> Self {
        Self::DocumentNotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an unknown operator error.
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CollectionNotFound { .. }
            | Self::DocumentNotFound { .. }
            | Self::FilterNotFound { .. }
            | Self::TransformNotFound { .. }
            | Self::FieldNotUnique { .. } => ErrorKind::NotFound,
            Self::CollectionExists { .. }
            | Self::ViewExists { .. }
            | Self::TransformExists { .. }
            | Self::UniqueViolation { .. } => ErrorKind::AlreadyExists,
            Self::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Self::InvalidQuery { .. } | Self::UnknownOperator { .. } => ErrorKind::InvalidQuery,
            Self::Storage(StorageError::InvalidEncryptedPayload(_)) => {
                ErrorKind::InvalidEncryptedPayload
            }
            Self::Serialization(_) | Self::InvalidFormat { .. } => ErrorKind::Format,
            Self::Storage(_) | Self::Io(_) => ErrorKind::Storage,
        }
    }
}
