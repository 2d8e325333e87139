//! Error types for model section parsing and linking.

use thiserror::Error;

/// Errors that can occur when reading, writing, or linking model sections.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] pd2model_common::Error),

    /// A section ended before one of its fixed fields could be read.
    #[error(
        "section {section} truncated at offset {offset:#x}: needed {needed} bytes but only {available} available"
    )]
    TruncatedRecord {
        section: u32,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A record names a parent that is not in the object table.
    #[error("object {id} references missing parent {parent}")]
    DanglingParentReference { id: u32, parent: u32 },

    /// Parent links form a loop.
    #[error("cyclic object hierarchy: {chain:?}")]
    CyclicHierarchy { chain: Vec<u32> },

    /// Two records share an identifier.
    #[error("duplicate object id: {0}")]
    DuplicateId(u32),

    /// No record with this identifier exists.
    #[error("object not found: {0}")]
    ObjectNotFound(u32),

    /// The container header declares a negative section count.
    #[error("invalid section count: {0}")]
    InvalidSectionCount(i32),
}

/// Result type for model section operations.
pub type Result<T> = std::result::Result<T, Error>;
