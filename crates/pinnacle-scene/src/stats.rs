//! Scene statistics and the derived performance score.
//!
//! Statistics are a pure read of the scene and cheap enough to recompute
//! after every mutation.

use crate::profile::PerformanceBudget;
use crate::scene::SceneModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Weight of the triangle component in the score.
pub const TRIANGLE_WEIGHT: f64 = 0.4;
/// Weight of the texture memory component in the score.
pub const TEXTURE_MEMORY_WEIGHT: f64 = 0.35;
/// Weight of the draw call component in the score.
pub const DRAW_CALL_WEIGHT: f64 = 0.25;

/// Score band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceRating {
    /// Maps a 0-100 score to its band.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PerformanceRating::Excellent
        } else if score >= 60.0 {
            PerformanceRating::Good
        } else if score >= 40.0 {
            PerformanceRating::Fair
        } else {
            PerformanceRating::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceRating::Excellent => "Excellent",
            PerformanceRating::Good => "Good",
            PerformanceRating::Fair => "Fair",
            PerformanceRating::Poor => "Poor",
        }
    }
}

impl fmt::Display for PerformanceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counts and performance estimate for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStatistics {
    pub mesh_count: usize,
    pub material_count: usize,
    pub texture_count: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
    /// Materials actually assigned to at least one mesh.
    pub unique_materials: usize,
    pub total_nodes: usize,
    pub max_hierarchy_depth: usize,
    /// Decompressed texture bytes.
    pub texture_memory: u64,
    pub estimated_draw_calls: usize,
    /// 0 to 100, higher is better.
    pub performance_score: f64,
    pub performance_rating: PerformanceRating,
}

impl SceneStatistics {
    /// Computes statistics for a scene against a budget.
    pub fn compute(scene: &SceneModel, budget: &PerformanceBudget) -> Self {
        let total_triangles = scene.total_triangles();
        let texture_memory: u64 = scene.textures.iter().map(|t| t.memory_estimate()).sum();
        let estimated_draw_calls = estimate_draw_calls(scene);
        let unique_materials = scene
            .meshes
            .iter()
            .filter_map(|m| m.material)
            .collect::<BTreeSet<_>>()
            .len();

        let performance_score = performance_score(total_triangles, texture_memory, estimated_draw_calls, budget);

        Self {
            mesh_count: scene.meshes.len(),
            material_count: scene.materials.len(),
            texture_count: scene.textures.len(),
            total_vertices: scene.total_vertices(),
            total_triangles,
            unique_materials,
            total_nodes: scene.nodes.len(),
            max_hierarchy_depth: scene.max_hierarchy_depth(),
            texture_memory,
            estimated_draw_calls,
            performance_score,
            performance_rating: PerformanceRating::from_score(performance_score),
        }
    }
}

/// One draw call per node-mesh instance, plus one for each mesh no node
/// instantiates. Every mesh carries exactly one material, so this is the
/// mesh-material combination count.
pub fn estimate_draw_calls(scene: &SceneModel) -> usize {
    scene
        .mesh_instance_counts()
        .into_iter()
        .map(|count| count.max(1))
        .sum()
}

/// Score for one metric: 100 at half the budget or less, 0 at twice the
/// budget or more, linear in between.
pub fn component_score(value: f64, budget: f64) -> f64 {
    if budget <= 0.0 {
        return if value <= 0.0 { 100.0 } else { 0.0 };
    }
    let ratio = value / budget;
    if ratio <= 0.5 {
        100.0
    } else if ratio >= 2.0 {
        0.0
    } else {
        100.0 * (2.0 - ratio) / 1.5
    }
}

/// Weighted 0-100 score.
pub fn performance_score(triangles: usize, texture_memory: u64, draw_calls: usize, budget: &PerformanceBudget) -> f64 {
    let score = TRIANGLE_WEIGHT * component_score(triangles as f64, budget.max_triangles as f64)
        + TEXTURE_MEMORY_WEIGHT * component_score(texture_memory as f64, budget.max_texture_memory as f64)
        + DRAW_CALL_WEIGHT * component_score(draw_calls as f64, budget.max_draw_calls as f64);
    (score * 10.0).round() / 10.0
}
