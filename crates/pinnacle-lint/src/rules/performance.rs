//! Scene-wide budget rules, measured against the selected profile.

use crate::report::{Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

pub struct TriangleBudgetRule;

impl ValidationRule for TriangleBudgetRule {
    fn id(&self) -> &'static str {
        "performance/triangle-budget"
    }

    fn description(&self) -> &'static str {
        "Flags scenes above the profile's triangle budget"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Performance
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let triangles = ctx.statistics.total_triangles;
        let max = ctx.budget.max_triangles;
        if triangles <= max {
            return Ok(vec![]);
        }
        Ok(vec![issue(
            self,
            "Triangle budget exceeded",
            format!(
                "{} triangles exceed the {} budget of {}",
                triangles, ctx.options.profile, max
            ),
        )
        .with_suggestion("Reduce triangle count or add LODs")])
    }
}

pub struct DrawCallBudgetRule;

impl ValidationRule for DrawCallBudgetRule {
    fn id(&self) -> &'static str {
        "performance/draw-call-budget"
    }

    fn description(&self) -> &'static str {
        "Flags scenes above the profile's draw call budget"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Performance
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let calls = ctx.statistics.estimated_draw_calls;
        let max = ctx.budget.max_draw_calls;
        if calls <= max {
            return Ok(vec![]);
        }
        Ok(vec![issue(
            self,
            "Draw call budget exceeded",
            format!(
                "An estimated {} draw calls exceed the {} budget of {}",
                calls, ctx.options.profile, max
            ),
        )
        .with_suggestion("Merge meshes that share a material")])
    }
}

pub struct TextureMemoryRule;

impl ValidationRule for TextureMemoryRule {
    fn id(&self) -> &'static str {
        "performance/texture-memory"
    }

    fn description(&self) -> &'static str {
        "Flags scenes above the profile's texture memory budget"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Performance
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let memory = ctx.statistics.texture_memory;
        let max = ctx.budget.max_texture_memory;
        if memory <= max {
            return Ok(vec![]);
        }
        Ok(vec![issue(
            self,
            "Texture memory budget exceeded",
            format!(
                "Textures need {:.1} MiB, above the {} budget of {:.1} MiB",
                mib(memory),
                ctx.options.profile,
                mib(max)
            ),
        )
        .with_suggestion("Resize textures or remove duplicates")])
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(TriangleBudgetRule),
        Box::new(DrawCallBudgetRule),
        Box::new(TextureMemoryRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ValidationOptions;
    use crate::test_support::{cube, run, run_with};
    use pinnacle_scene::{MeshRecord, NodeRecord, OptimizationProfile, SceneModel, TextureRecord};

    #[test]
    fn test_triangle_budget_uses_profile() {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::without_geometry("dense", 80_000, 150_000));
        assert!(run(&TriangleBudgetRule, &scene).is_empty());

        let mobile = ValidationOptions {
            profile: OptimizationProfile::Mobile,
            ..Default::default()
        };
        let issues = run_with(&TriangleBudgetRule, &scene, &mobile).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("100000"));
    }

    #[test]
    fn test_draw_call_budget() {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::new("cube", cube()));
        for i in 0..60 {
            scene.nodes.push(NodeRecord::new(format!("n{i}")).with_mesh(0));
            scene.roots.push(i);
        }
        let ar = ValidationOptions {
            profile: OptimizationProfile::Ar,
            ..Default::default()
        };
        assert_eq!(run_with(&DrawCallBudgetRule, &scene, &ar).unwrap().len(), 1);
        assert!(run(&DrawCallBudgetRule, &scene).is_empty());
    }

    #[test]
    fn test_texture_memory() {
        let mut scene = SceneModel::new();
        let mut big = TextureRecord::embedded("big", vec![1], "image/png");
        big.width = 8192;
        big.height = 8192;
        scene.textures.push(big);
        let mobile = ValidationOptions {
            profile: OptimizationProfile::Mobile,
            ..Default::default()
        };
        let issues = run_with(&TextureMemoryRule, &scene, &mobile).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("256.0 MiB"));
    }
}
