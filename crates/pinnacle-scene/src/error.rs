//! Error types for model loading, writing and scene invariants.

use crate::format::ModelFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for model loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for model writing.
pub type WriteResult<T> = Result<T, WriteError>;

/// Errors raised while reading a model from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension or magic bytes did not match any known format.
    #[error("Unrecognized model format: {path}")]
    UnknownFormat { path: PathBuf },

    /// The format is recognized but cannot be imported.
    #[error("{format} import is not supported: {path}")]
    UnsupportedFormat { format: ModelFormat, path: PathBuf },

    /// The file parsed but its contents are unusable.
    #[error("Corrupt {format} file {path}: {message}")]
    Corrupt {
        format: ModelFormat,
        path: PathBuf,
        message: String,
    },
}

impl LoadError {
    /// Creates a new corrupt-input error.
    pub fn corrupt(format: ModelFormat, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            format,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable error code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "LOAD_001",
            LoadError::UnknownFormat { .. } => "LOAD_002",
            LoadError::UnsupportedFormat { .. } => "LOAD_003",
            LoadError::Corrupt { .. } => "LOAD_004",
        }
    }
}

/// Errors raised while writing a model to disk.
#[derive(Debug, Error)]
pub enum WriteError {
    /// IO error while writing the destination.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested target format has no writer.
    #[error("Writing {format} files is not supported")]
    UnsupportedTarget { format: ModelFormat },

    /// The scene uses a feature the target cannot express at all.
    #[error("{format} cannot represent {feature}")]
    UnsupportedFeature { format: ModelFormat, feature: String },

    /// Failed to serialize the output document.
    #[error("Failed to encode {format} output: {message}")]
    Encode { format: ModelFormat, message: String },
}

impl WriteError {
    /// Creates an IO error for the given destination.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable error code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            WriteError::Io { .. } => "WRITE_001",
            WriteError::UnsupportedTarget { .. } => "WRITE_002",
            WriteError::UnsupportedFeature { .. } => "WRITE_003",
            WriteError::Encode { .. } => "WRITE_004",
        }
    }
}

/// A scene model invariant was violated.
///
/// Operations that hit this error abort and leave the scene exactly as it
/// was before they started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A material binds a texture index that does not exist.
    #[error("Material '{material}' binds {channel} to texture {index}, but only {texture_count} textures exist")]
    DanglingTexture {
        material: String,
        channel: String,
        index: usize,
        texture_count: usize,
    },

    /// A mesh references a material index that does not exist.
    #[error("Mesh '{mesh}' references material {index}, but only {material_count} materials exist")]
    DanglingMaterial {
        mesh: String,
        index: usize,
        material_count: usize,
    },

    /// A node references a mesh or child that does not exist.
    #[error("Node '{node}' references missing {what} {index}")]
    DanglingNodeReference {
        node: String,
        what: &'static str,
        index: usize,
    },

    /// The node graph contains a cycle.
    #[error("Node hierarchy contains a cycle through node {index}")]
    HierarchyCycle { index: usize },

    /// A triangle index points past the end of the vertex buffer.
    #[error("Mesh '{mesh}' has index {index} but only {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    /// Vertex attribute arrays disagree in length.
    #[error("Mesh '{mesh}' has mismatched attribute lengths: {message}")]
    AttributeMismatch { mesh: String, message: String },
}
