//! Validator errors.
//!
//! Findings are never errors; these cover runs that could not produce a
//! result at all.

use pinnacle_scene::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidateError {
    /// The run was cancelled between rules.
    #[error("Validation cancelled")]
    Cancelled,

    /// The model could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// `validate_mesh` was asked for a mesh that does not exist.
    #[error("Mesh {index} does not exist (scene has {mesh_count} meshes)")]
    MeshNotFound { index: usize, mesh_count: usize },
}

impl ValidateError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidateError::Cancelled => "VALIDATE_001",
            ValidateError::Load(_) => "VALIDATE_002",
            ValidateError::MeshNotFound { .. } => "VALIDATE_003",
        }
    }
}
