//! Source format rules.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};
use pinnacle_scene::ModelFormat;

/// The scene has nothing to render.
pub struct EmptySceneRule;

impl ValidationRule for EmptySceneRule {
    fn id(&self) -> &'static str {
        "format/empty-scene"
    }

    fn description(&self) -> &'static str {
        "Detects scenes without any mesh"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Format
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        if !ctx.scene.meshes.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![issue(self, "Empty scene", "The model contains no meshes")
            .with_suggestion("Check that the file was exported with geometry included")])
    }
}

/// The source came from a format the pipeline cannot read back.
pub struct UnsupportedSourceRule;

impl ValidationRule for UnsupportedSourceRule {
    fn id(&self) -> &'static str {
        "format/unsupported-source"
    }

    fn description(&self) -> &'static str {
        "Flags sources whose format cannot be imported for round-tripping"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Format
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let Some(path) = &ctx.scene.source_path else {
            return Ok(vec![]);
        };
        let format = ctx.scene.format;
        if format.can_import() {
            return Ok(vec![]);
        }
        let message = match format {
            ModelFormat::Unknown => format!("{} has no recognised model format", path.display()),
            other => format!("{} is {}, which cannot be re-imported", path.display(), other.name()),
        };
        Ok(vec![issue(self, "Unsupported source format", message)
            .with_object(path.display().to_string())
            .with_suggestion("Convert the asset to glTF or GLB")])
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(EmptySceneRule),
        Box::new(UnsupportedSourceRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{quad, run};
    use pinnacle_scene::{MeshRecord, SceneModel};

    #[test]
    fn test_empty_scene() {
        let issues = run(&EmptySceneRule, &SceneModel::new());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);

        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::new("quad", quad()));
        assert!(run(&EmptySceneRule, &scene).is_empty());
    }

    #[test]
    fn test_unsupported_source() {
        let mut scene = SceneModel::new();
        assert!(run(&UnsupportedSourceRule, &scene).is_empty(), "in-memory scenes are not checked");

        scene.source_path = Some("chair.fbx".into());
        scene.format = ModelFormat::Fbx;
        let issues = run(&UnsupportedSourceRule, &scene);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("FBX"));

        scene.format = ModelFormat::Glb;
        assert!(run(&UnsupportedSourceRule, &scene).is_empty());
    }
}
