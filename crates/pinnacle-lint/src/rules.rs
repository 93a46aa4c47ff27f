//! Validation rule trait and category rule modules.

use crate::options::ValidationOptions;
use crate::report::{Severity, ValidationCategory, ValidationIssue};
use pinnacle_scene::{PerformanceBudget, SceneModel, SceneStatistics};
use std::path::PathBuf;

pub mod compliance;
pub mod format;
pub mod hierarchy;
pub mod material;
pub mod mesh;
pub mod performance;
pub mod texture;

/// Everything a rule may inspect.
pub struct RuleContext<'a> {
    pub scene: &'a SceneModel,
    pub options: &'a ValidationOptions,
    pub budget: &'a PerformanceBudget,
    pub statistics: &'a SceneStatistics,
}

/// A validation rule that inspects a scene and reports issues.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier (e.g., "mesh/non-manifold").
    fn id(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Category used to skip the rule through [`ValidationOptions`].
    fn category(&self) -> ValidationCategory;

    /// Severity of the issues this rule normally emits.
    fn default_severity(&self) -> Severity;

    /// Runs the check.
    ///
    /// `Err` means the check could not be evaluated at all; the validator
    /// turns it into an info issue and moves on.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError>;
}

/// Reasons a rule could not be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// No mesh in the scene has readable geometry.
    #[error("no mesh has readable geometry ({mesh_count} meshes without vertex data)")]
    MissingGeometry { mesh_count: usize },

    /// A file the rule needed could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Anything else that stopped the check.
    #[error("{0}")]
    Failed(String),
}

/// Starts an issue carrying the rule's id, category and default severity.
pub(crate) fn issue(
    rule: &dyn ValidationRule,
    title: impl Into<String>,
    message: impl Into<String>,
) -> ValidationIssue {
    ValidationIssue::new(rule.id(), rule.category(), rule.default_severity(), title, message)
}
