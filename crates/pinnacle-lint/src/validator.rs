//! The validator: runs the rule catalog over a scene.

use crate::error::ValidateError;
use crate::options::ValidationOptions;
use crate::recommendations::recommend;
use crate::registry::RuleRegistry;
use crate::report::{MeshValidationResult, ModelValidationResult, Severity, ValidationCategory, ValidationIssue};
use crate::rules::{mesh, RuleContext};
use pinnacle_scene::{CancellationToken, ModelLoader, SceneModel, SceneStatistics};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

/// Lifecycle of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Runs enabled rules in catalog order and aggregates their findings.
///
/// A rule that returns an error or panics becomes an info issue titled
/// "Check could not run"; the remaining rules still run.
pub struct Validator {
    registry: RuleRegistry,
    state: ValidatorState,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Creates a validator with the built-in rules.
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::default_rules())
    }

    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self {
            registry,
            state: ValidatorState::Idle,
        }
    }

    pub fn state(&self) -> ValidatorState {
        self.state
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// Validates a scene.
    pub fn validate(
        &mut self,
        scene: &SceneModel,
        options: &ValidationOptions,
    ) -> Result<ModelValidationResult, ValidateError> {
        self.validate_with_cancel(scene, options, &CancellationToken::new())
    }

    /// Loads and validates a model file.
    pub fn validate_file(
        &mut self,
        loader: &dyn ModelLoader,
        path: &Path,
        options: &ValidationOptions,
    ) -> Result<ModelValidationResult, ValidateError> {
        let scene = match loader.load(path) {
            Ok(scene) => scene,
            Err(e) => {
                self.state = ValidatorState::Failed;
                return Err(e.into());
            }
        };
        self.validate(&scene, options)
    }

    /// Validates a scene, checking `token` before every rule.
    ///
    /// A cancelled run leaves the validator `Failed` and discards partial
    /// findings.
    pub fn validate_with_cancel(
        &mut self,
        scene: &SceneModel,
        options: &ValidationOptions,
        token: &CancellationToken,
    ) -> Result<ModelValidationResult, ValidateError> {
        self.state = ValidatorState::Running;
        let start = Instant::now();

        let budget = options.budget();
        let statistics = SceneStatistics::compute(scene, &budget);
        let ctx = RuleContext {
            scene,
            options,
            budget: &budget,
            statistics: &statistics,
        };
        let mut result = ModelValidationResult::new(scene.source_path.clone(), scene.format, statistics.clone());

        for rule in self.registry.enabled_rules() {
            if token.is_cancelled() {
                log::warn!("Validation cancelled before {}", rule.id());
                self.state = ValidatorState::Failed;
                return Err(ValidateError::Cancelled);
            }
            if !options.is_category_enabled(rule.category()) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| rule.check(&ctx))) {
                Ok(Ok(issues)) => {
                    log::debug!("{}: {} issue(s)", rule.id(), issues.len());
                    for issue in issues {
                        result.add_issue(issue);
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("{} could not run: {}", rule.id(), e);
                    result.add_issue(could_not_run(rule.id(), rule.category(), e.to_string()));
                }
                Err(_) => {
                    log::warn!("{} panicked", rule.id());
                    result.add_issue(could_not_run(
                        rule.id(),
                        rule.category(),
                        "the check aborted unexpectedly".to_string(),
                    ));
                }
            }
        }

        result.mesh_results = (0..scene.meshes.len())
            .filter_map(|i| mesh::mesh_result(scene, i))
            .collect();
        result.recommendations = recommend(&result.issues, &statistics, &budget, options.profile);
        result.validation_time_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "Validated {}: {} critical, {} errors, {} warnings, {} info",
            scene
                .source_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "scene".to_string()),
            result.counts.critical,
            result.counts.error,
            result.counts.warning,
            result.counts.info
        );
        self.state = ValidatorState::Completed;
        Ok(result)
    }

    /// Topology summary for a single mesh.
    pub fn validate_mesh(&self, scene: &SceneModel, index: usize) -> Result<MeshValidationResult, ValidateError> {
        mesh::mesh_result(scene, index).ok_or(ValidateError::MeshNotFound {
            index,
            mesh_count: scene.meshes.len(),
        })
    }
}

fn could_not_run(rule_id: &str, category: ValidationCategory, reason: String) -> ValidationIssue {
    ValidationIssue::new(
        rule_id,
        category,
        Severity::Info,
        "Check could not run",
        format!("{} was skipped: {}", rule_id, reason),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CheckError, ValidationRule};
    use crate::test_support::{cube, quad};
    use pretty_assertions::assert_eq;
    use pinnacle_scene::{MaterialRecord, MeshRecord, NodeRecord, TextureChannel, TextureRecord};

    fn clean_scene() -> SceneModel {
        let mut scene = SceneModel::new();
        let mut geometry = cube();
        pinnacle_scene::geometry::generate_normals(&mut geometry);
        geometry.uvs = vec![[0.0, 0.0]; geometry.positions.len()];
        let mut material = MaterialRecord::new("paint");
        material.base_color_factor = [0.8, 0.2, 0.2, 1.0];
        scene.materials.push(material);
        scene.meshes.push(MeshRecord::new("cube", geometry).with_material(0));
        scene.nodes.push(NodeRecord::new("root").with_mesh(0));
        scene.roots.push(0);
        scene
    }

    struct FailingRule;

    impl ValidationRule for FailingRule {
        fn id(&self) -> &'static str {
            "test/failing"
        }
        fn description(&self) -> &'static str {
            "always fails"
        }
        fn category(&self) -> ValidationCategory {
            ValidationCategory::Mesh
        }
        fn default_severity(&self) -> Severity {
            Severity::Error
        }
        fn check(&self, _ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
            Err(CheckError::Failed("no data".into()))
        }
    }

    struct PanickingRule;

    impl ValidationRule for PanickingRule {
        fn id(&self) -> &'static str {
            "test/panicking"
        }
        fn description(&self) -> &'static str {
            "always panics"
        }
        fn category(&self) -> ValidationCategory {
            ValidationCategory::Mesh
        }
        fn default_severity(&self) -> Severity {
            Severity::Error
        }
        fn check(&self, _ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
            panic!("boom")
        }
    }

    #[test]
    fn test_clean_scene_is_valid() {
        let mut validator = Validator::new();
        assert_eq!(validator.state(), ValidatorState::Idle);
        let result = validator.validate(&clean_scene(), &ValidationOptions::default()).unwrap();
        assert_eq!(validator.state(), ValidatorState::Completed);
        assert!(result.is_valid, "issues: {:?}", result.issues);
        assert!(result.is_gltf_compliant);
        assert_eq!(result.counts.critical + result.counts.error, 0);
        assert_eq!(result.mesh_results.len(), 1);
        assert!(result.mesh_results[0].is_watertight);
    }

    #[test]
    fn test_failing_checks_degrade_to_info() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(FailingRule));
        registry.register(Box::new(PanickingRule));
        registry.register(Box::new(crate::rules::mesh::NotWatertightRule));
        let mut validator = Validator::with_registry(registry);

        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::new("quad", quad()));
        let result = validator.validate(&scene, &ValidationOptions::default()).unwrap();

        assert_eq!(result.issues.len(), 3);
        assert_eq!(result.issues[0].title, "Check could not run");
        assert_eq!(result.issues[0].severity, Severity::Info);
        assert_eq!(result.issues[1].rule_id, "test/panicking");
        assert_eq!(result.issues[2].rule_id, "mesh/not-watertight");
        assert!(result.is_valid);
        assert_eq!(validator.state(), ValidatorState::Completed);
    }

    #[test]
    fn test_missing_geometry_does_not_abort() {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::without_geometry("lost", 3, 1));
        let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
        assert!(result.has_rule("mesh/geometry-unavailable"));
        let skipped: Vec<_> = result
            .issues_for_rule("mesh/non-manifold")
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(skipped, vec!["Check could not run"]);
        assert!(result.has_rule("material/no-materials"), "later rules still run");
    }

    #[test]
    fn test_cancelled_run_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let mut validator = Validator::new();
        let err = validator
            .validate_with_cancel(&clean_scene(), &ValidationOptions::default(), &token)
            .unwrap_err();
        assert!(matches!(err, ValidateError::Cancelled));
        assert_eq!(validator.state(), ValidatorState::Failed);
    }

    #[test]
    fn test_disabled_category_is_skipped() {
        let mut scene = clean_scene();
        scene.textures.push(TextureRecord::from_file("/nonexistent/albedo.png"));
        scene.materials[0] = MaterialRecord::new("paint").with_texture(TextureChannel::BaseColor, 0);

        let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
        assert!(result.has_rule("texture/missing-file"));
        assert!(!result.is_valid);

        let options = ValidationOptions {
            validate_textures: false,
            ..Default::default()
        };
        let result = Validator::new().validate(&scene, &options).unwrap();
        assert!(!result.has_rule("texture/missing-file"));
    }

    #[test]
    fn test_counts_match_issues() {
        let mut scene = clean_scene();
        scene.meshes.push(MeshRecord::new("open", quad()));
        scene.textures.push(TextureRecord::embedded("orphan", vec![1, 2], "image/webp"));
        let result = Validator::new().validate(&scene, &ValidationOptions::default()).unwrap();
        for severity in [Severity::Info, Severity::Warning, Severity::Error, Severity::Critical] {
            let n = result.issues_with_severity(severity).count();
            let counted = match severity {
                Severity::Info => result.counts.info,
                Severity::Warning => result.counts.warning,
                Severity::Error => result.counts.error,
                Severity::Critical => result.counts.critical,
            };
            assert_eq!(n, counted);
        }
        assert!(!result.is_gltf_compliant, "webp is not core glTF");
        assert!(result.recommendations.iter().any(|r| r.contains("unused")));
    }

    #[test]
    fn test_validate_mesh() {
        let validator = Validator::new();
        let scene = clean_scene();
        let result = validator.validate_mesh(&scene, 0).unwrap();
        assert_eq!(result.triangle_count, 12);
        assert!(matches!(
            validator.validate_mesh(&scene, 4),
            Err(ValidateError::MeshNotFound { index: 4, mesh_count: 1 })
        ));
    }
}
