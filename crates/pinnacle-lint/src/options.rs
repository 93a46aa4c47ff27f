//! Validation options.

use crate::report::ValidationCategory;
use pinnacle_scene::{OptimizationProfile, PerformanceBudget, TargetEngine};
use serde::{Deserialize, Serialize};

/// Which categories run, and the thresholds rules compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub validate_format: bool,
    pub validate_mesh_topology: bool,
    pub validate_materials: bool,
    pub validate_textures: bool,
    pub validate_hierarchy: bool,
    pub validate_animations: bool,
    pub check_performance: bool,
    pub check_gltf_compliance: bool,
    pub max_vertices_per_mesh: usize,
    pub max_triangles_per_mesh: usize,
    pub max_texture_resolution: u32,
    pub max_hierarchy_depth: usize,
    /// Engine whose material conventions are checked.
    pub target_engine: TargetEngine,
    /// Profile whose budget the performance rules use.
    pub profile: OptimizationProfile,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_format: true,
            validate_mesh_topology: true,
            validate_materials: true,
            validate_textures: true,
            validate_hierarchy: true,
            validate_animations: true,
            check_performance: true,
            check_gltf_compliance: true,
            max_vertices_per_mesh: 65535,
            max_triangles_per_mesh: 50000,
            max_texture_resolution: 4096,
            max_hierarchy_depth: 10,
            target_engine: TargetEngine::default(),
            profile: OptimizationProfile::default(),
        }
    }
}

impl ValidationOptions {
    /// Whether rules in `category` should run.
    pub fn is_category_enabled(&self, category: ValidationCategory) -> bool {
        match category {
            ValidationCategory::Format => self.validate_format,
            ValidationCategory::Mesh => self.validate_mesh_topology,
            ValidationCategory::Material => self.validate_materials,
            ValidationCategory::Texture => self.validate_textures,
            ValidationCategory::Hierarchy => self.validate_hierarchy,
            ValidationCategory::Animation => self.validate_animations,
            ValidationCategory::Performance => self.check_performance,
            ValidationCategory::Compliance => self.check_gltf_compliance,
        }
    }

    /// Budget for the selected profile.
    pub fn budget(&self) -> PerformanceBudget {
        PerformanceBudget::for_profile(self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidationOptions::default();
        assert_eq!(options.max_vertices_per_mesh, 65535);
        assert_eq!(options.max_triangles_per_mesh, 50000);
        assert_eq!(options.max_texture_resolution, 4096);
        assert_eq!(options.max_hierarchy_depth, 10);
        assert!(ValidationCategory::ALL.iter().all(|c| options.is_category_enabled(*c)));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{"validate_textures": false, "profile": "mobile"}"#).unwrap();
        assert!(!options.is_category_enabled(ValidationCategory::Texture));
        assert!(options.is_category_enabled(ValidationCategory::Mesh));
        assert_eq!(options.budget(), PerformanceBudget::mobile());
    }
}
