//! glTF 2.0 core compliance rules.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};

/// Image encodings glTF core allows without extensions.
const CORE_IMAGE_FORMATS: &[&str] = &["png", "jpeg"];

/// Largest vertex count addressable with 16-bit indices.
const U16_INDEX_LIMIT: usize = 65_535;

pub struct TextureFormatRule;

impl ValidationRule for TextureFormatRule {
    fn id(&self) -> &'static str {
        "compliance/texture-format"
    }

    fn description(&self) -> &'static str {
        "Detects textures in encodings glTF core does not allow"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Compliance
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .textures
            .iter()
            .enumerate()
            .filter(|(_, t)| !CORE_IMAGE_FORMATS.contains(&t.format.as_str()))
            .map(|(index, t)| {
                let format = if t.format.is_empty() { "unknown" } else { t.format.as_str() };
                issue(
                    self,
                    "Texture format not allowed",
                    format!("Texture '{}' is {}; glTF core only allows PNG and JPEG", t.name, format),
                )
                .with_object(&t.name)
                .with_texture(index)
                .with_suggestion("Re-encode the texture as PNG or JPEG")
            })
            .collect())
    }
}

/// Meshes that need 32-bit indices.
pub struct IndexWidthRule;

impl ValidationRule for IndexWidthRule {
    fn id(&self) -> &'static str {
        "compliance/index-width"
    }

    fn description(&self) -> &'static str {
        "Reports meshes that need 32-bit indices"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Compliance
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .meshes
            .iter()
            .filter(|m| m.vertex_count > U16_INDEX_LIMIT)
            .map(|m| {
                issue(
                    self,
                    "32-bit indices required",
                    format!(
                        "Mesh '{}' has {} vertices; some web and mobile runtimes cannot draw it in one call",
                        m.name, m.vertex_count
                    ),
                )
                .with_mesh(&m.name)
                .with_suggestion("Split the mesh below 65536 vertices")
            })
            .collect())
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(TextureFormatRule),
        Box::new(IndexWidthRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::run;
    use pinnacle_scene::{MeshRecord, SceneModel, TextureRecord};

    #[test]
    fn test_texture_format() {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("a", vec![1], "image/png"));
        scene.textures.push(TextureRecord::embedded("b", vec![1], "image/jpeg"));
        scene.textures.push(TextureRecord::embedded("c", vec![1], "image/webp"));
        scene.textures.push(TextureRecord::from_file("d.tga"));
        let issues = run(&TextureFormatRule, &scene);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].texture_index, Some(2));
        assert!(issues[1].message.contains("tga"));
    }

    #[test]
    fn test_index_width() {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::without_geometry("small", 65_535, 10));
        scene.meshes.push(MeshRecord::without_geometry("large", 70_000, 10));
        let issues = run(&IndexWidthRule, &scene);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].mesh_name.as_deref(), Some("large"));
    }
}
