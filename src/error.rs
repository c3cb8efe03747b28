//! `MeshScopeError`: unified error type for mesh-scope public APIs.
//!
//! This error type is used throughout the crate to provide robust,
//! non-panicking error handling for all public APIs. Point-level "no value
//! here" conditions are never errors; they are represented by the
//! [`NODATA`](crate::dataset::NODATA) sentinel instead.

use thiserror::Error;

/// Unified error type for mesh-scope operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshScopeError {
    /// Node index out of range for the mesh's node arena.
    #[error("node index {index} out of range (mesh has {count} nodes)")]
    NodeIndexOutOfRange { index: usize, count: usize },
    /// Element index out of range for the mesh's element arena.
    #[error("element index {index} out of range (mesh has {count} elements)")]
    ElementIndexOutOfRange { index: usize, count: usize },
    /// Dataset index out of range for the mesh's dataset store.
    #[error("dataset index {index} out of range (store has {count} datasets)")]
    DatasetIndexOutOfRange { index: usize, count: usize },
    /// Output index out of range for a dataset.
    #[error("output index {index} out of range (dataset has {count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },
    /// An element references a node index outside the node arena.
    #[error("element {element} references node {node} but the mesh has only {count} nodes")]
    NodeReferenceOutOfBounds {
        element: usize,
        node: usize,
        count: usize,
    },
    /// A mesh must own at least one node.
    #[error("mesh has no nodes")]
    EmptyMesh,
    /// File could not be found by a loader.
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// File exists but no loader recognizes its format.
    #[error("unknown format: {0}")]
    UnknownFormat(String),
    /// Structural mismatch between a dataset and the mesh it targets.
    #[error("incompatible mesh: {0}")]
    IncompatibleMesh(String),
    /// Malformed values in a dataset file.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Loader ran out of memory while materializing a mesh.
    #[error("not enough memory while loading {0}")]
    NotEnoughMemory(String),
    /// Calculator operands disagree on kind or value location.
    #[error("incompatible operands: {0}")]
    IncompatibleOperand(String),
    /// Expression failed to lex or parse.
    #[error("expression syntax error at offset {offset}: {message}")]
    ExpressionSyntax { offset: usize, message: String },
    /// Expression references a dataset name the store does not contain.
    #[error("expression references unknown dataset {0:?}")]
    UnknownDatasetReference(String),
    /// An output's value array does not match the count required by its
    /// dataset's value location.
    #[error("output holds {found} values but the value location requires {expected}")]
    OutputLengthMismatch { expected: usize, found: usize },
    /// An output's value storage (scalar vs vector) does not match the
    /// dataset kind.
    #[error("output value storage does not match dataset kind {0}")]
    OutputKindMismatch(&'static str),
    /// Export I/O failure. Carries the rendered `std::io::Error` so the
    /// error type stays `Clone`.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MeshScopeError {
    fn from(err: std::io::Error) -> Self {
        MeshScopeError::Io(err.to_string())
    }
}
