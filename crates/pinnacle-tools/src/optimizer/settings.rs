//! Optimization settings and profile presets.

use pinnacle_scene::{OptimizationProfile, PerformanceBudget, TargetEngine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat optimizer configuration.
///
/// Each operation is toggled on its own, except texture resizing which
/// also needs `optimize_textures`. Choosing a named profile replaces every
/// field; see [`OptimizationSettings::for_profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub profile: OptimizationProfile,

    pub fix_materials: bool,
    pub validate_materials: bool,
    pub target_engine: TargetEngine,

    pub optimize_textures: bool,
    pub resize_textures: bool,
    pub max_texture_resolution: u32,
    pub remove_duplicate_textures: bool,
    pub remove_unused_textures: bool,

    /// Unused-vertex compaction and per-mesh limit checks.
    pub optimize_meshes: bool,
    pub max_vertices_per_mesh: usize,
    pub max_triangles_per_mesh: usize,
    pub remove_degenerate_triangles: bool,
    pub merge_duplicate_vertices: bool,

    /// Merge single-instance meshes that share a material.
    pub optimize_hierarchy: bool,
    pub flatten_hierarchy: bool,
    pub max_hierarchy_depth: usize,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self::for_profile(OptimizationProfile::Desktop)
    }
}

impl OptimizationSettings {
    /// Preset for a profile. Pure: the same profile always yields the same
    /// record, and nothing from an earlier configuration survives.
    pub fn for_profile(profile: OptimizationProfile) -> Self {
        let budget = PerformanceBudget::for_profile(profile);
        let base = Self {
            profile,
            fix_materials: true,
            validate_materials: true,
            target_engine: TargetEngine::GenericPbr,
            optimize_textures: true,
            resize_textures: true,
            max_texture_resolution: budget.max_texture_resolution,
            remove_duplicate_textures: true,
            remove_unused_textures: true,
            optimize_meshes: true,
            max_vertices_per_mesh: 65_535,
            max_triangles_per_mesh: 50_000,
            remove_degenerate_triangles: true,
            merge_duplicate_vertices: true,
            optimize_hierarchy: false,
            flatten_hierarchy: false,
            max_hierarchy_depth: 10,
        };

        match profile {
            OptimizationProfile::Mobile => Self {
                max_vertices_per_mesh: 32_768,
                max_triangles_per_mesh: 20_000,
                optimize_hierarchy: true,
                flatten_hierarchy: true,
                max_hierarchy_depth: 5,
                ..base
            },
            OptimizationProfile::Desktop => Self {
                max_vertices_per_mesh: 1_000_000,
                max_triangles_per_mesh: 500_000,
                resize_textures: false,
                ..base
            },
            OptimizationProfile::Vr => Self {
                max_triangles_per_mesh: 100_000,
                optimize_hierarchy: true,
                max_hierarchy_depth: 8,
                ..base
            },
            OptimizationProfile::Ar => Self {
                max_triangles_per_mesh: 50_000,
                optimize_hierarchy: true,
                flatten_hierarchy: true,
                max_hierarchy_depth: 6,
                ..base
            },
            OptimizationProfile::Web => Self {
                max_triangles_per_mesh: 50_000,
                optimize_hierarchy: true,
                flatten_hierarchy: true,
                max_hierarchy_depth: 6,
                ..base
            },
            OptimizationProfile::Console => Self {
                max_vertices_per_mesh: 1_000_000,
                max_triangles_per_mesh: 1_000_000,
                resize_textures: false,
                max_hierarchy_depth: 16,
                ..base
            },
            OptimizationProfile::Custom => Self {
                fix_materials: false,
                validate_materials: false,
                optimize_textures: false,
                resize_textures: false,
                remove_duplicate_textures: false,
                remove_unused_textures: false,
                optimize_meshes: false,
                remove_degenerate_triangles: false,
                merge_duplicate_vertices: false,
                ..base
            },
        }
    }

    /// Replaces every field with the preset for `profile`.
    pub fn apply_profile(&mut self, profile: OptimizationProfile) {
        *self = Self::for_profile(profile);
    }

    /// Names of the selectable profiles.
    pub fn available_profiles() -> Vec<&'static str> {
        OptimizationProfile::PRESETS
            .iter()
            .map(OptimizationProfile::as_str)
            .chain(std::iter::once(OptimizationProfile::Custom.as_str()))
            .collect()
    }

    /// Returns true if `operation` runs under these settings.
    pub fn enables(&self, operation: OptimizationOperation) -> bool {
        match operation {
            OptimizationOperation::FixMaterials => self.fix_materials,
            OptimizationOperation::ValidateMaterials => self.validate_materials,
            OptimizationOperation::DeduplicateTextures => self.remove_duplicate_textures,
            OptimizationOperation::ResizeTextures => self.optimize_textures && self.resize_textures,
            OptimizationOperation::RemoveUnusedTextures => self.remove_unused_textures,
            OptimizationOperation::RemoveDegenerateTriangles => self.remove_degenerate_triangles,
            OptimizationOperation::MergeDuplicateVertices => self.merge_duplicate_vertices,
            OptimizationOperation::OptimizeMeshes => self.optimize_meshes,
            OptimizationOperation::FlattenHierarchy => self.flatten_hierarchy,
            OptimizationOperation::OptimizeHierarchy => self.optimize_hierarchy,
        }
    }

    /// Enabled operations in execution order.
    pub fn planned_operations(&self) -> Vec<OptimizationOperation> {
        OptimizationOperation::ALL
            .into_iter()
            .filter(|op| self.enables(*op))
            .collect()
    }
}

/// One optimizer operation. Operations always run in [`ALL`](Self::ALL)
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationOperation {
    FixMaterials,
    ValidateMaterials,
    DeduplicateTextures,
    ResizeTextures,
    RemoveUnusedTextures,
    RemoveDegenerateTriangles,
    MergeDuplicateVertices,
    OptimizeMeshes,
    FlattenHierarchy,
    OptimizeHierarchy,
}

impl OptimizationOperation {
    pub const ALL: [OptimizationOperation; 10] = [
        OptimizationOperation::FixMaterials,
        OptimizationOperation::ValidateMaterials,
        OptimizationOperation::DeduplicateTextures,
        OptimizationOperation::ResizeTextures,
        OptimizationOperation::RemoveUnusedTextures,
        OptimizationOperation::RemoveDegenerateTriangles,
        OptimizationOperation::MergeDuplicateVertices,
        OptimizationOperation::OptimizeMeshes,
        OptimizationOperation::FlattenHierarchy,
        OptimizationOperation::OptimizeHierarchy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OptimizationOperation::FixMaterials => "Fix materials",
            OptimizationOperation::ValidateMaterials => "Validate materials",
            OptimizationOperation::DeduplicateTextures => "Remove duplicate textures",
            OptimizationOperation::ResizeTextures => "Resize textures",
            OptimizationOperation::RemoveUnusedTextures => "Remove unused textures",
            OptimizationOperation::RemoveDegenerateTriangles => "Remove degenerate triangles",
            OptimizationOperation::MergeDuplicateVertices => "Merge duplicate vertices",
            OptimizationOperation::OptimizeMeshes => "Optimize meshes",
            OptimizationOperation::FlattenHierarchy => "Flatten hierarchy",
            OptimizationOperation::OptimizeHierarchy => "Optimize hierarchy",
        }
    }
}

impl fmt::Display for OptimizationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_overwrites_custom_settings() {
        let mut settings = OptimizationSettings::for_profile(OptimizationProfile::Custom);
        settings.max_texture_resolution = 123;
        settings.flatten_hierarchy = true;
        settings.target_engine = TargetEngine::Unreal;

        settings.apply_profile(OptimizationProfile::Mobile);
        assert_eq!(settings, OptimizationSettings::for_profile(OptimizationProfile::Mobile));
        assert_eq!(settings.max_texture_resolution, 1024);
        assert_eq!(settings.target_engine, TargetEngine::GenericPbr);
    }

    #[test]
    fn test_presets_are_pure() {
        for profile in OptimizationProfile::PRESETS {
            let mut settings = OptimizationSettings::for_profile(profile);
            settings.apply_profile(profile);
            assert_eq!(settings, OptimizationSettings::for_profile(profile));
            assert_eq!(settings.profile, profile);
        }
    }

    #[test]
    fn test_planned_operations_follow_fixed_order() {
        let settings = OptimizationSettings::for_profile(OptimizationProfile::Mobile);
        let planned = settings.planned_operations();
        assert_eq!(planned.len(), 10);
        assert_eq!(planned, OptimizationOperation::ALL.to_vec());

        let desktop = OptimizationSettings::default().planned_operations();
        assert!(!desktop.contains(&OptimizationOperation::ResizeTextures));
        assert!(!desktop.contains(&OptimizationOperation::FlattenHierarchy));

        assert!(OptimizationSettings::for_profile(OptimizationProfile::Custom)
            .planned_operations()
            .is_empty());
    }

    #[test]
    fn test_resize_needs_optimize_textures() {
        let settings = OptimizationSettings {
            optimize_textures: false,
            ..OptimizationSettings::for_profile(OptimizationProfile::Mobile)
        };
        assert!(!settings.enables(OptimizationOperation::ResizeTextures));
        assert!(settings.enables(OptimizationOperation::DeduplicateTextures));
    }

    #[test]
    fn test_available_profiles() {
        let profiles = OptimizationSettings::available_profiles();
        assert_eq!(profiles.first(), Some(&"mobile"));
        assert_eq!(profiles.last(), Some(&"custom"));
        assert_eq!(profiles.len(), 7);
    }
}
