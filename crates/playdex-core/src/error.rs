//! Core error types.

use thiserror::Error;

/// Errors raised by the catalog stores and the association layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Requested leaf entity or association does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind label of the missing row.
        kind: String,
        /// Hex-encoded identifier.
        id: String,
    },

    /// A link or patch would duplicate an existing `(left, right)` pair.
    #[error("{relation} already links {left} to {right}")]
    DuplicateRelation {
        /// Relation kind label.
        relation: String,
        /// Hex-encoded left endpoint id.
        left: String,
        /// Hex-encoded right endpoint id.
        right: String,
    },

    /// A leaf entity cannot be removed while associations still reference it.
    #[error("{kind} {id} is referenced by {count} {relation} link(s)")]
    Referenced {
        /// Kind label of the leaf being removed.
        kind: String,
        /// Hex-encoded leaf id.
        id: String,
        /// Relation kind label holding the references.
        relation: String,
        /// Number of referencing rows.
        count: usize,
    },

    /// Malformed or missing input in a request.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Build a NotFound error for a kind label and raw id.
    pub fn not_found(kind: &str, id: &[u8; 16]) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: crate::id::hex(id),
        }
    }
}
