//! Material rules.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};
use pinnacle_scene::{MaterialRecord, TextureChannel, TextureSlot};

/// Material or texture indices that do not resolve.
pub struct DanglingReferenceRule;

impl ValidationRule for DanglingReferenceRule {
    fn id(&self) -> &'static str {
        "material/dangling-reference"
    }

    fn description(&self) -> &'static str {
        "Detects mesh material and material texture indices that do not exist"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let scene = ctx.scene;
        let mut issues = Vec::new();
        for mesh in &scene.meshes {
            if let Some(index) = mesh.material.filter(|&m| m >= scene.materials.len()) {
                issues.push(
                    issue(
                        self,
                        "Dangling material reference",
                        format!(
                            "Mesh '{}' uses material {} but only {} materials exist",
                            mesh.name,
                            index,
                            scene.materials.len()
                        ),
                    )
                    .with_mesh(&mesh.name),
                );
            }
        }
        for material in &scene.materials {
            for (channel, slot) in &material.bindings {
                if let TextureSlot::Bound(index) = slot {
                    if *index >= scene.textures.len() {
                        issues.push(
                            issue(
                                self,
                                "Dangling texture reference",
                                format!(
                                    "Material '{}' binds {} to texture {} but only {} textures exist",
                                    material.name,
                                    channel,
                                    index,
                                    scene.textures.len()
                                ),
                            )
                            .with_object(&material.name),
                        );
                    }
                }
            }
        }
        Ok(issues)
    }
}

pub struct NoMaterialsRule;

impl ValidationRule for NoMaterialsRule {
    fn id(&self) -> &'static str {
        "material/no-materials"
    }

    fn description(&self) -> &'static str {
        "Detects meshes rendered with the default material"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let unassigned: Vec<&str> = ctx
            .scene
            .meshes
            .iter()
            .filter(|m| m.material.is_none())
            .map(|m| m.name.as_str())
            .collect();
        if unassigned.is_empty() {
            return Ok(vec![]);
        }
        let title = if ctx.scene.materials.is_empty() {
            "No materials"
        } else {
            "Meshes without material"
        };
        Ok(vec![issue(
            self,
            title,
            format!(
                "{} mesh(es) have no material assigned: {}",
                unassigned.len(),
                unassigned.join(", ")
            ),
        )
        .with_suggestion("Assign a material, or create one from textures")])
    }
}

/// A material with neither a base color texture nor a base color factor
/// renders plain white.
pub struct MissingBaseColorRule;

impl ValidationRule for MissingBaseColorRule {
    fn id(&self) -> &'static str {
        "material/missing-base-color"
    }

    fn description(&self) -> &'static str {
        "Detects materials without any base color input"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .materials
            .iter()
            .filter(|m| !m.bindings.contains_key(&TextureChannel::BaseColor) && m.base_color_factor == [1.0; 4])
            .map(|m| {
                issue(
                    self,
                    "Missing base color",
                    format!("Material '{}' has no base color texture or color", m.name),
                )
                .with_object(&m.name)
                .with_suggestion("Bind a base color texture or set a base color factor")
            })
            .collect())
    }
}

pub struct MetallicConflictRule;

impl ValidationRule for MetallicConflictRule {
    fn id(&self) -> &'static str {
        "material/metallic-conflict"
    }

    fn description(&self) -> &'static str {
        "Detects materials binding both a metallic map and a packed metallic-roughness map"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .materials
            .iter()
            .filter(|m| m.has_metallic_conflict())
            .map(|m| {
                issue(
                    self,
                    "Conflicting metallic inputs",
                    format!(
                        "Material '{}' binds both metallic and metallic_roughness; only one can be exported",
                        m.name
                    ),
                )
                .with_object(&m.name)
                .with_suggestion("Run the material auto-fix to keep the packed map")
            })
            .collect())
    }
}

fn factors_out_of_range(material: &MaterialRecord) -> Vec<&'static str> {
    let valid = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
    let mut bad = Vec::new();
    if !material.base_color_factor.iter().all(|&v| valid(v)) {
        bad.push("base color");
    }
    if !valid(material.metallic_factor) {
        bad.push("metallic");
    }
    if !valid(material.roughness_factor) {
        bad.push("roughness");
    }
    if !material.emissive_factor.iter().all(|&v| valid(v)) {
        bad.push("emissive");
    }
    bad
}

pub struct FactorRangeRule;

impl ValidationRule for FactorRangeRule {
    fn id(&self) -> &'static str {
        "material/factor-range"
    }

    fn description(&self) -> &'static str {
        "Detects material factors outside [0, 1]"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for material in &ctx.scene.materials {
            let bad = factors_out_of_range(material);
            if !bad.is_empty() {
                issues.push(
                    issue(
                        self,
                        "Factor out of range",
                        format!(
                            "Material '{}' has {} factor(s) outside [0, 1]",
                            material.name,
                            bad.join(", ")
                        ),
                    )
                    .with_object(&material.name)
                    .with_suggestion("Clamp the factors with the material auto-fix"),
                );
            }
        }
        Ok(issues)
    }
}

/// Slots the loader could not resolve to a texture record.
pub struct MissingTextureFileReferenceRule;

impl ValidationRule for MissingTextureFileReferenceRule {
    fn id(&self) -> &'static str {
        "material/missing-texture-file-reference"
    }

    fn description(&self) -> &'static str {
        "Detects material channels referencing a texture that could not be resolved"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for material in &ctx.scene.materials {
            for (channel, slot) in &material.bindings {
                if let TextureSlot::Missing(uri) = slot {
                    let shown = if uri.is_empty() { "<empty>" } else { uri.as_str() };
                    issues.push(
                        issue(
                            self,
                            "Unresolved texture reference",
                            format!("Material '{}' {} references '{}', which could not be resolved", material.name, channel, shown),
                        )
                        .with_object(&material.name)
                        .with_suggestion("Relocate the texture or remove the binding"),
                    );
                }
            }
        }
        Ok(issues)
    }
}

/// Channels the target engine's standard material has no input for.
pub struct EngineSupportRule;

impl ValidationRule for EngineSupportRule {
    fn id(&self) -> &'static str {
        "material/engine-support"
    }

    fn description(&self) -> &'static str {
        "Detects texture channels the target engine cannot use"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Material
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let engine = ctx.options.target_engine;
        let mut issues = Vec::new();
        for material in &ctx.scene.materials {
            for channel in material.bindings.keys() {
                if !engine.supports_channel(*channel) {
                    issues.push(
                        issue(
                            self,
                            "Channel unsupported by target engine",
                            format!("{} has no {} input; material '{}' will lose it", engine, channel, material.name),
                        )
                        .with_object(&material.name)
                        .with_suggestion("Repack the texture for the target engine"),
                    );
                }
            }
        }
        Ok(issues)
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(DanglingReferenceRule),
        Box::new(NoMaterialsRule),
        Box::new(MissingBaseColorRule),
        Box::new(MetallicConflictRule),
        Box::new(FactorRangeRule),
        Box::new(MissingTextureFileReferenceRule),
        Box::new(EngineSupportRule),
    ]
}
