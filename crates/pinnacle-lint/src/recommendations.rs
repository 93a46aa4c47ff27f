//! Advisory strings derived from issue patterns.

use crate::report::ValidationIssue;
use pinnacle_scene::{OptimizationProfile, PerformanceBudget, SceneStatistics};

/// Builds the recommendation list for a finished run.
///
/// Each recommendation appears at most once, in a fixed order.
pub fn recommend(
    issues: &[ValidationIssue],
    statistics: &SceneStatistics,
    budget: &PerformanceBudget,
    profile: OptimizationProfile,
) -> Vec<String> {
    let has = |rule: &str| issues.iter().any(|i| i.rule_id == rule);
    let count = |rule: &str| issues.iter().filter(|i| i.rule_id == rule).count();
    let mut out = Vec::new();

    if statistics.total_triangles > budget.max_triangles {
        out.push(format!(
            "Consider triangle reduction: {} triangles exceed the {} budget of {}",
            statistics.total_triangles, profile, budget.max_triangles
        ));
    }
    if has("performance/draw-call-budget") {
        out.push("Merge meshes that share a material to cut draw calls".to_string());
    }
    if has("performance/texture-memory") || has("texture/oversized") {
        out.push(format!(
            "Resize textures to at most {} px to reduce texture memory",
            budget.max_texture_resolution
        ));
    }
    if has("texture/non-power-of-two") {
        out.push(format!(
            "Resize {} texture(s) to power-of-two dimensions for full mipmapping",
            count("texture/non-power-of-two")
        ));
    }
    if has("texture/missing-file") || has("material/missing-texture-file-reference") {
        out.push("Relocate missing textures with the texture manager before exporting".to_string());
    }
    if has("texture/unused") {
        out.push(format!("Remove {} unused texture(s)", count("texture/unused")));
    }
    if has("material/metallic-conflict") || has("material/factor-range") {
        out.push("Run the material auto-fix to resolve conflicting or out-of-range inputs".to_string());
    }
    if has("mesh/missing-normals") {
        out.push("Generate normals for meshes that lack them".to_string());
    }
    if has("mesh/degenerate-triangles") || has("mesh/duplicate-vertices") {
        out.push("Enable degenerate triangle removal and vertex merging in the optimizer".to_string());
    }
    if has("hierarchy/depth") {
        out.push("Flatten the node hierarchy".to_string());
    }
    if has("compliance/texture-format") {
        out.push("Re-encode textures as PNG or JPEG for glTF compliance".to_string());
    }
    out
}
