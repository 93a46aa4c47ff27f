//! Texture rules.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};
use pinnacle_scene::TextureSource;

pub struct MissingFileRule;

impl ValidationRule for MissingFileRule {
    fn id(&self) -> &'static str {
        "texture/missing-file"
    }

    fn description(&self) -> &'static str {
        "Detects textures whose file or embedded data is absent"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Texture
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (index, texture) in ctx.scene.textures.iter().enumerate() {
            if texture.exists() {
                continue;
            }
            let message = match &texture.source {
                TextureSource::File(path) => format!("Texture '{}' not found at {}", texture.name, path.display()),
                TextureSource::Embedded { .. } => format!("Embedded texture '{}' has no data", texture.name),
            };
            issues.push(
                issue(self, "Missing texture", message)
                    .with_object(&texture.name)
                    .with_texture(index)
                    .with_suggestion("Search for the file in the texture manager and fix the path"),
            );
        }
        Ok(issues)
    }
}

/// Textures with unknown dimensions are skipped.
pub struct NonPowerOfTwoRule;

impl ValidationRule for NonPowerOfTwoRule {
    fn id(&self) -> &'static str {
        "texture/non-power-of-two"
    }

    fn description(&self) -> &'static str {
        "Detects textures whose dimensions are not powers of two"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Texture
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .textures
            .iter()
            .enumerate()
            .filter(|(_, t)| t.width > 0 && t.height > 0 && !t.is_power_of_two())
            .map(|(index, t)| {
                issue(
                    self,
                    "Non-power-of-two texture",
                    format!("Texture '{}' is {}x{}; mipmapping may be limited", t.name, t.width, t.height),
                )
                .with_object(&t.name)
                .with_texture(index)
                .with_suggestion("Resize to power-of-two dimensions")
            })
            .collect())
    }
}

pub struct OversizedRule;

impl ValidationRule for OversizedRule {
    fn id(&self) -> &'static str {
        "texture/oversized"
    }

    fn description(&self) -> &'static str {
        "Detects textures larger than the maximum resolution"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Texture
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let max = ctx.options.max_texture_resolution;
        Ok(ctx
            .scene
            .textures
            .iter()
            .enumerate()
            .filter(|(_, t)| t.width.max(t.height) > max)
            .map(|(index, t)| {
                issue(
                    self,
                    "Oversized texture",
                    format!("Texture '{}' is {}x{}, above the {} px limit", t.name, t.width, t.height, max),
                )
                .with_object(&t.name)
                .with_texture(index)
                .with_suggestion(format!("Resize to at most {max} px"))
            })
            .collect())
    }
}

/// Zero references, counted by rescanning materials.
pub struct UnusedRule;

impl ValidationRule for UnusedRule {
    fn id(&self) -> &'static str {
        "texture/unused"
    }

    fn description(&self) -> &'static str {
        "Detects textures no material references"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Texture
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let counts = ctx.scene.reference_counts();
        Ok(ctx
            .scene
            .textures
            .iter()
            .zip(counts)
            .enumerate()
            .filter(|(_, (_, count))| *count == 0)
            .map(|(index, (t, _))| {
                issue(self, "Unused texture", format!("Texture '{}' is not referenced by any material", t.name))
                    .with_object(&t.name)
                    .with_texture(index)
                    .with_suggestion("Remove unused textures")
            })
            .collect())
    }
}

/// File textures resolved outside the model's directory do not travel with
/// the model.
pub struct AbsolutePathRule;

impl ValidationRule for AbsolutePathRule {
    fn id(&self) -> &'static str {
        "texture/absolute-path"
    }

    fn description(&self) -> &'static str {
        "Detects texture files referenced outside the model directory"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Texture
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let Some(base) = ctx.scene.base_dir() else {
            return Ok(vec![]);
        };
        let mut issues = Vec::new();
        for (index, texture) in ctx.scene.textures.iter().enumerate() {
            let Some(path) = texture.path() else {
                continue;
            };
            let escapes = path.components().any(|c| matches!(c, std::path::Component::ParentDir));
            let outside = escapes || (path.is_absolute() && base.is_absolute() && !path.starts_with(base));
            if outside {
                issues.push(
                    issue(
                        self,
                        "Texture outside model directory",
                        format!("Texture '{}' lives at {}, outside {}", texture.name, path.display(), base.display()),
                    )
                    .with_object(&texture.name)
                    .with_texture(index)
                    .with_suggestion("Copy the texture next to the model and use a relative path"),
                );
            }
        }
        Ok(issues)
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(MissingFileRule),
        Box::new(NonPowerOfTwoRule),
        Box::new(OversizedRule),
        Box::new(UnusedRule),
        Box::new(AbsolutePathRule),
    ]
}
