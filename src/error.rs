//! Error types for halfmesh.
//!
//! This module defines all error types used throughout the library.
//! Topology conflicts while linking a single face are not errors of this
//! kind; they are described by [`LinkError`](crate::mesh::LinkError) and
//! surface as an invalid face handle.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The operation requires a pure triangle mesh.
    #[error("mesh is not a triangle mesh")]
    NotTriangleMesh,

    /// A property with this name already exists on the element kind.
    #[error("property '{name}' already exists")]
    DuplicateProperty {
        /// The property name.
        name: String,
    },

    /// A property exists under this name with another value type.
    #[error("property '{name}' has type {found}, not {expected}")]
    PropertyTypeMismatch {
        /// The property name.
        name: String,
        /// Requested value type.
        expected: &'static str,
        /// Stored value type.
        found: &'static str,
    },

    /// A long-running operation was cancelled through its progress handle.
    #[error("operation cancelled")]
    Cancelled,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
