//! Error types for the asset tools.
//!
//! Only operations that cannot start, or that hit a scene invariant
//! violation, return these. Per-file and per-stage problems are recorded in
//! the operation's result instead.

use pinnacle_scene::{EngineError, LoadError, ModelFormat, WriteError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from format conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A batch was started with no input files.
    #[error("No input files to convert")]
    EmptyInput,

    /// The options cannot produce any output.
    #[error("Invalid conversion options: {0}")]
    InvalidOptions(String),

    /// The source format cannot be converted to the target.
    #[error("Cannot convert {from} to {to}")]
    UnsupportedConversion { from: ModelFormat, to: ModelFormat },

    /// The output exists and overwriting is disabled.
    #[error("Output already exists: {path}")]
    OutputExists { path: PathBuf },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Creating the output directory failed.
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::EmptyInput => "CONVERT_001",
            ConvertError::InvalidOptions(_) => "CONVERT_002",
            ConvertError::UnsupportedConversion { .. } => "CONVERT_003",
            ConvertError::OutputExists { .. } => "CONVERT_004",
            ConvertError::Load(e) => e.code(),
            ConvertError::Write(e) => e.code(),
            ConvertError::Engine(_) => "ENGINE_001",
            ConvertError::Io { .. } => "CONVERT_005",
        }
    }
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No model is open.
    #[error("No model is loaded")]
    NoScene,

    /// There is no optimization to undo.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Another thread panicked while holding the scene lock.
    #[error("Scene lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Validate(#[from] pinnacle_lint::ValidateError),
}

/// Errors from the recent-files store.
#[derive(Debug, Error)]
pub enum RecentFilesError {
    /// The platform has no configuration directory.
    #[error("No configuration directory available")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from single-texture operations.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Texture {index} does not exist (scene has {count} textures)")]
    NotFound { index: usize, count: usize },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },
}

/// Errors from background jobs.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to start worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The job panicked; its result is lost.
    #[error("Worker '{name}' panicked")]
    Panicked { name: String },
}
