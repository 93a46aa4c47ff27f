//! Material validation, repair and creation.

use crate::convert::CoordinateSystem;
use pinnacle_lint::Severity;
use pinnacle_scene::{
    MaterialRecord, NormalMapFormat, SceneModel, TargetEngine, TextureChannel, TextureRecord, TextureSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Conventions an engine's standard material expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedSettings {
    pub engine: TargetEngine,
    pub normal_map_format: NormalMapFormat,
    pub coordinate_system: CoordinateSystem,
    /// Metallic and roughness should arrive packed in one texture.
    pub packed_metallic_roughness: bool,
    pub supports_height: bool,
    pub max_texture_resolution: u32,
}

/// Recommended material settings for an engine.
pub fn recommended_settings(engine: TargetEngine) -> RecommendedSettings {
    let (coordinate_system, packed, max_texture_resolution) = match engine {
        TargetEngine::UnityBuiltIn | TargetEngine::UnityUrp => (CoordinateSystem::YUpLeftHanded, false, 2048),
        TargetEngine::UnityHdrp => (CoordinateSystem::YUpLeftHanded, true, 4096),
        TargetEngine::Unreal => (CoordinateSystem::ZUpLeftHanded, true, 4096),
        TargetEngine::Godot => (CoordinateSystem::YUpRightHanded, true, 4096),
        TargetEngine::GenericPbr => (CoordinateSystem::YUpRightHanded, true, 4096),
    };
    RecommendedSettings {
        engine,
        normal_map_format: engine.normal_map_format(),
        coordinate_system,
        packed_metallic_roughness: packed,
        supports_height: engine.supports_channel(TextureChannel::Height),
        max_texture_resolution,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialIssue {
    pub severity: Severity,
    pub material_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialValidationResult {
    /// No error-level issues.
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub issues: Vec<MaterialIssue>,
}

impl MaterialValidationResult {
    fn push(&mut self, severity: Severity, material: &MaterialRecord, message: String, suggestion: Option<&str>) {
        match severity {
            Severity::Error | Severity::Critical => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => {}
        }
        self.issues.push(MaterialIssue {
            severity,
            material_name: material.name.clone(),
            message,
            suggestion: suggestion.map(str::to_string),
        });
    }
}

/// Checks every material against general PBR rules and the conventions of
/// `engine`.
pub fn validate_materials(scene: &SceneModel, engine: TargetEngine) -> MaterialValidationResult {
    let mut result = MaterialValidationResult::default();
    let used: Vec<bool> = (0..scene.materials.len())
        .map(|i| scene.meshes.iter().any(|m| m.material == Some(i)))
        .collect();

    for (index, material) in scene.materials.iter().enumerate() {
        if !factors_in_range(material) {
            result.push(
                Severity::Error,
                material,
                "Material factors are outside [0, 1]".to_string(),
                Some("Auto-fix clamps factors into range"),
            );
        }
        if material.has_metallic_conflict() {
            result.push(
                Severity::Error,
                material,
                "Both metallic and metallic-roughness textures are bound".to_string(),
                Some("Keep the packed metallic-roughness texture"),
            );
        }
        for (channel, slot) in &material.bindings {
            match slot {
                TextureSlot::Missing(uri) => result.push(
                    Severity::Error,
                    material,
                    format!("{} texture '{}' could not be resolved", channel, uri),
                    Some("Fix the texture path or remove the binding"),
                ),
                TextureSlot::Bound(texture) => {
                    if scene.textures.get(*texture).is_some_and(|t| !t.exists()) {
                        result.push(
                            Severity::Warning,
                            material,
                            format!("{} texture file is missing", channel),
                            Some("Search for the missing texture"),
                        );
                    }
                }
            }
            if !engine.supports_channel(*channel) {
                result.push(
                    Severity::Warning,
                    material,
                    format!("{} has no {} input", engine, channel),
                    None,
                );
            }
        }
        if material.bindings.contains_key(&TextureChannel::Normal)
            && engine.normal_map_format() == NormalMapFormat::DirectX
        {
            result.push(
                Severity::Info,
                material,
                format!("Normal map needs a flipped green channel for {}", engine),
                Some("Enable normal map conversion"),
            );
        }
        if !material.bindings.contains_key(&TextureChannel::BaseColor) && material.base_color_factor == [1.0; 4] {
            result.push(
                Severity::Info,
                material,
                "Material has no base color texture and a white base color".to_string(),
                None,
            );
        }
        if !used[index] {
            result.push(
                Severity::Info,
                material,
                "Material is not used by any mesh".to_string(),
                None,
            );
        }
    }

    result.is_valid = result.error_count == 0;
    log::debug!(
        "Material validation for {}: {} errors, {} warnings",
        engine,
        result.error_count,
        result.warning_count
    );
    result
}

fn factors_in_range(material: &MaterialRecord) -> bool {
    let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
    material.base_color_factor.iter().all(|&v| unit(v))
        && unit(material.metallic_factor)
        && unit(material.roughness_factor)
        && material.emissive_factor.iter().all(|&v| unit(v))
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Repairs common material problems in place.
///
/// Factors are clamped into `[0, 1]` (non-finite values reset to the glTF
/// default), a separate metallic texture conflicting with a packed
/// metallic-roughness texture is dropped, and unresolved bindings with an
/// empty URI are removed. Returns the number of materials changed.
pub fn auto_fix_materials(scene: &mut SceneModel) -> usize {
    let mut fixed = 0;
    for material in &mut scene.materials {
        let before = material.clone();

        for v in &mut material.base_color_factor {
            *v = clamp_unit(*v, 1.0);
        }
        material.metallic_factor = clamp_unit(material.metallic_factor, 1.0);
        material.roughness_factor = clamp_unit(material.roughness_factor, 1.0);
        for v in &mut material.emissive_factor {
            *v = clamp_unit(*v, 0.0);
        }
        if material.has_metallic_conflict() {
            material.bindings.remove(&TextureChannel::Metallic);
        }
        material
            .bindings
            .retain(|_, slot| !matches!(slot, TextureSlot::Missing(uri) if uri.trim().is_empty()));

        if *material != before {
            log::debug!("Fixed material '{}'", material.name);
            fixed += 1;
        }
    }
    if fixed > 0 {
        log::info!("Auto-fixed {} material(s)", fixed);
    }
    fixed
}

/// Guesses a texture's channel from its file name.
///
/// Tokens are matched from the end of the stem, so `metal_plate_normal.png`
/// is a normal map.
pub fn detect_texture_channel(filename: &str) -> Option<TextureChannel> {
    let stem = Path::new(filename).file_stem()?.to_string_lossy().to_ascii_lowercase();
    let tokens: Vec<&str> = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for i in (0..tokens.len()).rev() {
        if i > 0 {
            let pair = format!("{}{}", tokens[i - 1], tokens[i]);
            if let Some(channel) = channel_for_token(&pair) {
                return Some(channel);
            }
        }
        if let Some(channel) = channel_for_token(tokens[i]) {
            return Some(channel);
        }
    }
    None
}

fn channel_for_token(token: &str) -> Option<TextureChannel> {
    let channel = match token {
        "orm" | "metallicroughness" | "metalroughness" | "occlusionroughnessmetallic" => {
            TextureChannel::MetallicRoughness
        }
        "basecolor" | "albedo" | "diffuse" | "diff" | "color" | "col" => TextureChannel::BaseColor,
        "normal" | "normalgl" | "normaldx" | "nrm" | "nor" | "norm" => TextureChannel::Normal,
        "roughness" | "rough" | "rgh" => TextureChannel::Roughness,
        "metallic" | "metalness" | "metal" | "mtl" => TextureChannel::Metallic,
        "ao" | "occlusion" | "ambientocclusion" => TextureChannel::AmbientOcclusion,
        "emissive" | "emission" | "emit" => TextureChannel::Emissive,
        "height" | "displacement" | "disp" | "bump" => TextureChannel::Height,
        _ => return None,
    };
    Some(channel)
}

/// Outcome of [`create_material_from_textures`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCreationResult {
    pub success: bool,
    pub material_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub assigned_textures: BTreeMap<TextureChannel, PathBuf>,
    /// Index of the new material in the scene.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_index: Option<usize>,
}

impl MaterialCreationResult {
    fn failed(name: &str, message: String) -> Self {
        log::warn!("Cannot create material '{}': {}", name, message);
        Self {
            success: false,
            material_name: name.to_string(),
            error_message: Some(message),
            assigned_textures: BTreeMap::new(),
            material_index: None,
        }
    }
}

/// Creates a material from texture files and appends it to the scene.
///
/// Files already referenced by a scene texture reuse that record. On
/// failure the scene is unchanged.
pub fn create_material_from_textures(
    scene: &mut SceneModel,
    name: &str,
    textures: &BTreeMap<TextureChannel, PathBuf>,
) -> MaterialCreationResult {
    if name.trim().is_empty() {
        return MaterialCreationResult::failed(name, "Material name is empty".to_string());
    }
    if textures.is_empty() {
        return MaterialCreationResult::failed(name, "No textures assigned".to_string());
    }
    if textures.contains_key(&TextureChannel::Metallic) && textures.contains_key(&TextureChannel::MetallicRoughness) {
        return MaterialCreationResult::failed(
            name,
            "Assign either a metallic or a metallic-roughness texture, not both".to_string(),
        );
    }
    if let Some(missing) = textures.values().find(|p| !p.is_file()) {
        return MaterialCreationResult::failed(name, format!("Texture file not found: {}", missing.display()));
    }

    let mut material = MaterialRecord::new(name);
    for (channel, path) in textures {
        let index = match scene.textures.iter().position(|t| t.path() == Some(path.as_path())) {
            Some(existing) => existing,
            None => {
                scene.textures.push(TextureRecord::from_file(path));
                scene.textures.len() - 1
            }
        };
        material.bindings.insert(*channel, TextureSlot::Bound(index));
    }
    scene.materials.push(material);
    let material_index = scene.materials.len() - 1;

    log::info!("Created material '{}' with {} texture(s)", name, textures.len());
    MaterialCreationResult {
        success: true,
        material_name: name.to_string(),
        error_message: None,
        assigned_textures: textures.clone(),
        material_index: Some(material_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnacle_scene::{MeshGeometry, MeshRecord};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_detect_texture_channel() {
        let cases = [
            ("wood_basecolor.png", Some(TextureChannel::BaseColor)),
            ("Wood_Base_Color.jpg", Some(TextureChannel::BaseColor)),
            ("brick-albedo.png", Some(TextureChannel::BaseColor)),
            ("metal_plate_normal.png", Some(TextureChannel::Normal)),
            ("rock_nrm.png", Some(TextureChannel::Normal)),
            ("rock_rough.png", Some(TextureChannel::Roughness)),
            ("gun_metallic.png", Some(TextureChannel::Metallic)),
            ("gun_ORM.png", Some(TextureChannel::MetallicRoughness)),
            ("gun_metallic_roughness.png", Some(TextureChannel::MetallicRoughness)),
            ("floor_ao.png", Some(TextureChannel::AmbientOcclusion)),
            ("lamp_emission.png", Some(TextureChannel::Emissive)),
            ("cliff_displacement.exr", Some(TextureChannel::Height)),
            ("readme.txt", None),
        ];
        for (name, expected) in cases {
            assert_eq!(detect_texture_channel(name), expected, "{name}");
        }
    }

    #[test]
    fn test_recommended_settings() {
        let unreal = recommended_settings(TargetEngine::Unreal);
        assert_eq!(unreal.normal_map_format, NormalMapFormat::DirectX);
        assert_eq!(unreal.coordinate_system, CoordinateSystem::ZUpLeftHanded);
        assert!(unreal.packed_metallic_roughness);

        let unity = recommended_settings(TargetEngine::UnityBuiltIn);
        assert_eq!(unity.normal_map_format, NormalMapFormat::OpenGl);
        assert!(!unity.packed_metallic_roughness);
    }

    fn broken_scene() -> SceneModel {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("mr", vec![1], "image/png"));
        scene.textures.push(TextureRecord::embedded("m", vec![2], "image/png"));
        let mut material = MaterialRecord::new("broken")
            .with_texture(TextureChannel::MetallicRoughness, 0)
            .with_texture(TextureChannel::Metallic, 1);
        material.metallic_factor = 1.5;
        material.roughness_factor = f32::NAN;
        material
            .bindings
            .insert(TextureChannel::Emissive, TextureSlot::Missing(String::new()));
        scene.materials.push(material);
        scene.materials.push(MaterialRecord::new("fine"));
        scene.meshes.push(MeshRecord::new("m", MeshGeometry::default()).with_material(0));
        scene
    }

    #[test]
    fn test_validate_materials() {
        let scene = broken_scene();
        let result = validate_materials(&scene, TargetEngine::UnityBuiltIn);
        assert!(!result.is_valid);
        // Range, conflict and the unresolved emissive binding.
        assert_eq!(result.error_count, 3);
        // Unity built-in has no metallic-roughness input.
        assert_eq!(result.warning_count, 1);
        assert!(result
            .issues
            .iter()
            .any(|i| i.material_name == "fine" && i.message.contains("not used")));
    }

    #[test]
    fn test_auto_fix_materials() {
        let mut scene = broken_scene();
        assert_eq!(auto_fix_materials(&mut scene), 1);
        let material = &scene.materials[0];
        assert_eq!(material.metallic_factor, 1.0);
        assert_eq!(material.roughness_factor, 1.0);
        assert!(!material.has_metallic_conflict());
        assert_eq!(material.texture(TextureChannel::MetallicRoughness), Some(0));
        assert!(!material.bindings.contains_key(&TextureChannel::Emissive));

        assert_eq!(auto_fix_materials(&mut scene), 0);
        assert!(validate_materials(&scene, TargetEngine::GenericPbr).is_valid);
    }

    #[test]
    fn test_create_material_from_textures() {
        let dir = tempdir().unwrap();
        let albedo = dir.path().join("wood_albedo.png");
        let normal = dir.path().join("wood_normal.png");
        std::fs::write(&albedo, b"a").unwrap();
        std::fs::write(&normal, b"n").unwrap();

        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::from_file(&albedo));

        let mut textures = BTreeMap::new();
        textures.insert(TextureChannel::BaseColor, albedo.clone());
        textures.insert(TextureChannel::Normal, normal.clone());
        let result = create_material_from_textures(&mut scene, "wood", &textures);

        assert!(result.success);
        assert_eq!(result.material_index, Some(0));
        assert_eq!(scene.textures.len(), 2, "albedo record is reused");
        assert_eq!(scene.materials[0].texture(TextureChannel::BaseColor), Some(0));
        assert_eq!(scene.materials[0].texture(TextureChannel::Normal), Some(1));
    }

    #[test]
    fn test_create_material_failures_leave_scene_unchanged() {
        let mut scene = SceneModel::new();
        let mut textures = BTreeMap::new();
        textures.insert(TextureChannel::BaseColor, PathBuf::from("/nonexistent/a.png"));

        let result = create_material_from_textures(&mut scene, "wood", &textures);
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("not found"));
        assert!(scene.materials.is_empty());
        assert!(scene.textures.is_empty());

        let result = create_material_from_textures(&mut scene, " ", &textures);
        assert_eq!(result.error_message.as_deref(), Some("Material name is empty"));
    }
}
