//! Scene fixtures shared by rule tests.

use crate::options::ValidationOptions;
use crate::report::ValidationIssue;
use crate::rules::{CheckError, RuleContext, ValidationRule};
use pinnacle_scene::{MeshGeometry, SceneModel, SceneStatistics};

pub fn cube() -> MeshGeometry {
    MeshGeometry {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ],
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: vec![
            0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, 3, 7, 6, 3, 6, 2, 0, 4, 7, 0, 7, 3, 1, 2, 6, 1, 6, 5,
        ],
    }
}

/// Two triangles forming an open unit quad with normals and UVs.
pub fn quad() -> MeshGeometry {
    MeshGeometry {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

pub fn run_with(
    rule: &dyn ValidationRule,
    scene: &SceneModel,
    options: &ValidationOptions,
) -> Result<Vec<ValidationIssue>, CheckError> {
    let budget = options.budget();
    let statistics = SceneStatistics::compute(scene, &budget);
    let ctx = RuleContext {
        scene,
        options,
        budget: &budget,
        statistics: &statistics,
    };
    rule.check(&ctx)
}

pub fn run(rule: &dyn ValidationRule, scene: &SceneModel) -> Vec<ValidationIssue> {
    run_with(rule, scene, &ValidationOptions::default()).unwrap()
}
