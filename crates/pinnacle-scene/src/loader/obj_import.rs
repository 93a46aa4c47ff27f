//! Wavefront OBJ import via `tobj`.
//!
//! Every OBJ object or group becomes one mesh under its own root node.
//! MTL texture maps are resolved relative to the OBJ file and deduplicated
//! by path.

use crate::error::{LoadError, LoadResult};
use crate::format::ModelFormat;
use crate::scene::{MaterialRecord, MeshGeometry, MeshRecord, NodeRecord, SceneModel, TextureChannel, TextureRecord, TextureSlot};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Non-standard MTL keys carrying PBR maps, and the channel each feeds.
const PBR_MAP_KEYS: &[(&str, TextureChannel)] = &[
    ("map_Pr", TextureChannel::Roughness),
    ("map_Pm", TextureChannel::Metallic),
    ("map_Ke", TextureChannel::Emissive),
    ("disp", TextureChannel::Height),
    ("map_ao", TextureChannel::AmbientOcclusion),
];

pub(super) fn load(path: &Path) -> LoadResult<SceneModel> {
    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, materials) = tobj::load_obj(path, &load_options)
        .map_err(|e| LoadError::corrupt(ModelFormat::Obj, path, e.to_string()))?;

    let materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            log::warn!("Materials for {} could not be loaded: {}", path.display(), e);
            Vec::new()
        }
    };

    let base = path.parent().unwrap_or(Path::new("."));
    let mut scene = SceneModel::new();
    let mut textures_by_path: HashMap<PathBuf, usize> = HashMap::new();

    for material in &materials {
        let mut record = MaterialRecord::new(if material.name.is_empty() { "default" } else { material.name.as_str() });
        if let Some([r, g, b]) = material.diffuse {
            record.base_color_factor = [r, g, b, material.dissolve.unwrap_or(1.0)];
        }
        record.metallic_factor = parse_param(material, "Pm").unwrap_or(0.0);
        record.roughness_factor = parse_param(material, "Pr").unwrap_or(1.0);
        if let Some(emissive) = material.unknown_param.get("Ke").and_then(|v| parse_vec3(v)) {
            record.emissive_factor = emissive;
        }

        let mut maps: Vec<(TextureChannel, &str)> = Vec::new();
        if let Some(map) = &material.diffuse_texture {
            maps.push((TextureChannel::BaseColor, map.as_str()));
        }
        if let Some(map) = &material.normal_texture {
            maps.push((TextureChannel::Normal, map.as_str()));
        }
        for (key, channel) in PBR_MAP_KEYS {
            if let Some(map) = material.unknown_param.get(*key) {
                maps.push((*channel, map.as_str()));
            }
        }

        for (channel, map) in maps {
            let Some(file) = map_file_name(map) else {
                record.bindings.insert(channel, TextureSlot::Missing(map.to_string()));
                continue;
            };
            let resolved = base.join(file.replace('\\', "/"));
            let index = *textures_by_path.entry(resolved.clone()).or_insert_with(|| {
                scene.textures.push(TextureRecord::from_file(&resolved));
                scene.textures.len() - 1
            });
            record.bindings.insert(channel, TextureSlot::Bound(index));
        }
        scene.materials.push(record);
    }

    for model in &models {
        let mesh = &model.mesh;
        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals: Vec<[f32; 3]> = mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect();
        let uvs: Vec<[f32; 2]> = mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect();

        let geometry = MeshGeometry {
            normals: if normals.len() == positions.len() { normals } else { Vec::new() },
            uvs: if uvs.len() == positions.len() { uvs } else { Vec::new() },
            positions,
            indices: mesh.indices.clone(),
        };

        let name = if model.name.is_empty() {
            format!("mesh_{}", scene.meshes.len())
        } else {
            model.name.clone()
        };
        let mut record = MeshRecord::new(name.clone(), geometry);
        record.material = mesh.material_id.filter(|&id| id < scene.materials.len());

        let mesh_index = scene.meshes.len();
        scene.meshes.push(record);
        scene.roots.push(scene.nodes.len());
        scene.nodes.push(NodeRecord::new(name).with_mesh(mesh_index));
    }

    if scene.meshes.is_empty() {
        log::warn!("OBJ file has no geometry: {}", path.display());
    }

    Ok(scene)
}

/// Extracts the file name from an MTL map statement, skipping options such
/// as `-bm 1.0` or `-s 1 1 1`.
fn map_file_name(map: &str) -> Option<&str> {
    let tokens: Vec<&str> = map.split_whitespace().collect();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if token.starts_with('-') && token.len() > 1 && token[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            i += 1;
            while i < tokens.len() && tokens[i].parse::<f32>().is_ok() {
                i += 1;
            }
            continue;
        }
        return tokens.last().copied();
    }
    None
}

fn parse_param(material: &tobj::Material, key: &str) -> Option<f32> {
    material.unknown_param.get(key)?.trim().parse().ok()
}

fn parse_vec3(value: &str) -> Option<[f32; 3]> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|v| v.parse().ok())
        .collect::<Option<Vec<f32>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some([*r, *g, *b]),
        [v] => Some([*v, *v, *v]),
        _ => None,
    }
}
