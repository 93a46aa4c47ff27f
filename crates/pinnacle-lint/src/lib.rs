//! Rule-based model validation for the Pinnacle asset pipeline.
//!
//! Runs an ordered catalog of checks over a [`SceneModel`] and reports
//! categorized issues. Findings are data: a check that cannot run becomes an
//! info issue and never stops the others.
//!
//! # Example
//!
//! ```no_run
//! use pinnacle_lint::{ValidationOptions, Validator};
//! use pinnacle_scene::{FileModelLoader, ModelLoader};
//! use std::path::Path;
//!
//! let scene = FileModelLoader.load(Path::new("chair.glb")).unwrap();
//! let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
//!
//! if !result.is_valid {
//!     for issue in &result.issues {
//!         eprintln!("{}: {} - {}", issue.severity, issue.rule_id, issue.message);
//!     }
//! }
//! ```
//!
//! [`SceneModel`]: pinnacle_scene::SceneModel

pub mod error;
pub mod options;
pub mod recommendations;
pub mod registry;
pub mod report;
pub mod rules;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use error::ValidateError;
pub use options::ValidationOptions;
pub use registry::{RuleMetadata, RuleRegistry};
pub use report::{
    MeshValidationResult, ModelValidationResult, Severity, SeverityCounts, ValidationCategory, ValidationIssue,
};
pub use rules::{CheckError, RuleContext, ValidationRule};
pub use validator::{Validator, ValidatorState};
