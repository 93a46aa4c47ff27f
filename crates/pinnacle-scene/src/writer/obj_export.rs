//! Wavefront OBJ + MTL export.
//!
//! OBJ has no node hierarchy, so every mesh instance is baked into world
//! space and written as its own object. Embedded textures are written as
//! image files next to the output.

use super::{extension_for_mime, sanitize_name, texture_reference, write_file, NameAllocator, WriteOptions, WriteReport};
use crate::error::WriteResult;
use crate::geometry;
use crate::scene::{SceneModel, TextureChannel, TextureSlot, TextureSource};
use std::fmt::Write as _;
use std::path::Path;

/// MTL statement for each channel OBJ can carry.
fn map_keyword(channel: TextureChannel) -> Option<&'static str> {
    match channel {
        TextureChannel::BaseColor => Some("map_Kd"),
        TextureChannel::Normal => Some("norm"),
        TextureChannel::Roughness => Some("map_Pr"),
        TextureChannel::Metallic => Some("map_Pm"),
        TextureChannel::Emissive => Some("map_Ke"),
        TextureChannel::Height => Some("disp"),
        TextureChannel::AmbientOcclusion => Some("map_ao"),
        TextureChannel::MetallicRoughness => None,
    }
}

pub(super) fn write(scene: &SceneModel, path: &Path, options: &WriteOptions, report: &mut WriteReport) -> WriteResult<()> {
    let output_dir = path.parent().unwrap_or(Path::new("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    let mtl_name = format!("{}.mtl", stem);

    let mut material_names = NameAllocator::default();
    let material_ids: Vec<String> = scene
        .materials
        .iter()
        .enumerate()
        .map(|(i, m)| material_names.allocate(sanitize_name(&m.name, &format!("material_{}", i))))
        .collect();

    // Texture references, writing embedded images out as files.
    let mut texture_files: Vec<Option<String>> = Vec::with_capacity(scene.textures.len());
    for (index, texture) in scene.textures.iter().enumerate() {
        let reference = match &texture.source {
            TextureSource::Embedded { bytes, mime } if !bytes.is_empty() => {
                let file_name = format!(
                    "{}_{}.{}",
                    stem,
                    sanitize_name(&texture.name, &format!("texture_{}", index)),
                    extension_for_mime(mime)
                );
                write_file(&output_dir.join(&file_name), bytes, report)?;
                Some(file_name)
            }
            TextureSource::Embedded { .. } => None,
            TextureSource::File(_) => texture_reference(texture, output_dir, options.copy_textures, report)?,
        };
        texture_files.push(reference);
    }

    let mut mtl = String::new();
    for (material, id) in scene.materials.iter().zip(&material_ids) {
        let [r, g, b, a] = material.base_color_factor;
        let [er, eg, eb] = material.emissive_factor;
        let _ = writeln!(mtl, "newmtl {}", id);
        let _ = writeln!(mtl, "Kd {} {} {}", r, g, b);
        let _ = writeln!(mtl, "d {}", a);
        let _ = writeln!(mtl, "Ke {} {} {}", er, eg, eb);
        let _ = writeln!(mtl, "Pm {}", material.metallic_factor);
        let _ = writeln!(mtl, "Pr {}", material.roughness_factor);
        for (channel, slot) in &material.bindings {
            let file = match slot {
                TextureSlot::Bound(index) => texture_files.get(*index).cloned().flatten(),
                TextureSlot::Missing(_) => None,
            };
            match (map_keyword(*channel), file) {
                (Some(keyword), Some(file)) => {
                    let _ = writeln!(mtl, "{} {}", keyword, file);
                }
                (None, _) => report.warn(format!(
                    "OBJ has no packed {} map; binding on material '{}' dropped",
                    channel, material.name
                )),
                (Some(_), None) => report.warn(format!(
                    "Material '{}' {} texture is unavailable; binding dropped",
                    material.name, channel
                )),
            }
        }
        mtl.push('\n');
    }

    let mut obj = String::new();
    let _ = writeln!(obj, "# Exported by pinnacle {}", env!("CARGO_PKG_VERSION"));
    if !scene.materials.is_empty() {
        let _ = writeln!(obj, "mtllib {}", mtl_name);
    }

    let mut instances: Vec<(usize, glam::Mat4, String)> = Vec::new();
    let world = scene.world_matrices();
    for (node_index, node) in scene.nodes.iter().enumerate() {
        let Some(matrix) = world[node_index] else {
            continue;
        };
        for &mesh in &node.meshes {
            instances.push((mesh, matrix, format!("{}_{}", node.name, scene.meshes[mesh].name)));
        }
    }
    for (mesh, count) in scene.mesh_instance_counts().into_iter().enumerate() {
        if count == 0 {
            instances.push((mesh, glam::Mat4::IDENTITY, scene.meshes[mesh].name.clone()));
        }
    }

    let mut object_names = NameAllocator::default();
    let (mut v_base, mut vt_base, mut vn_base) = (1u32, 1u32, 1u32);
    for (mesh_index, matrix, name) in instances {
        let mesh = &scene.meshes[mesh_index];
        let Some(source) = &mesh.geometry else {
            report.warn(format!("Mesh '{}' has no readable geometry and was omitted", mesh.name));
            continue;
        };
        let mut geometry = source.clone();
        if matrix != glam::Mat4::IDENTITY {
            geometry::transform(&mut geometry, matrix);
        }

        let _ = writeln!(obj, "o {}", object_names.allocate(sanitize_name(&name, "object")));
        if let Some(id) = mesh.material.and_then(|m| material_ids.get(m)) {
            let _ = writeln!(obj, "usemtl {}", id);
        }
        for p in &geometry.positions {
            let _ = writeln!(obj, "v {} {} {}", p[0], p[1], p[2]);
        }
        for t in &geometry.uvs {
            let _ = writeln!(obj, "vt {} {}", t[0], t[1]);
        }
        for n in &geometry.normals {
            let _ = writeln!(obj, "vn {} {} {}", n[0], n[1], n[2]);
        }
        let has_uv = !geometry.uvs.is_empty();
        let has_normal = !geometry.normals.is_empty();
        for tri in geometry.triangles() {
            obj.push('f');
            for i in tri {
                let v = v_base + i;
                let _ = match (has_uv, has_normal) {
                    (true, true) => write!(obj, " {}/{}/{}", v, vt_base + i, vn_base + i),
                    (true, false) => write!(obj, " {}/{}", v, vt_base + i),
                    (false, true) => write!(obj, " {}//{}", v, vn_base + i),
                    (false, false) => write!(obj, " {}", v),
                };
            }
            obj.push('\n');
        }
        v_base += geometry.positions.len() as u32;
        vt_base += geometry.uvs.len() as u32;
        vn_base += geometry.normals.len() as u32;
    }

    write_file(path, obj.as_bytes(), report)?;
    if !scene.materials.is_empty() {
        write_file(&output_dir.join(&mtl_name), mtl.as_bytes(), report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ModelFormat;
    use crate::loader::{FileModelLoader, ModelLoader};
    use crate::scene::{MaterialRecord, MeshGeometry, MeshRecord, NodeRecord, TextureRecord};
    use crate::writer::{FileModelWriter, ModelWriter};

    #[test]
    fn test_obj_round_trip_bakes_transforms() {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("albedo", vec![1, 2, 3], "image/png"));
        scene.materials.push(
            MaterialRecord::new("red")
                .with_texture(TextureChannel::BaseColor, 0)
                .with_texture(TextureChannel::MetallicRoughness, 0),
        );
        let geometry = MeshGeometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: vec![0, 1, 2],
        };
        scene.meshes.push(MeshRecord::new("tri", geometry).with_material(0));
        let mut left = NodeRecord::new("left").with_mesh(0);
        left.matrix = glam::Mat4::from_translation(glam::Vec3::new(-5.0, 0.0, 0.0)).to_cols_array();
        scene.nodes.push(left);
        scene.nodes.push(NodeRecord::new("right").with_mesh(0));
        scene.roots = vec![0, 1];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.obj");
        let report = FileModelWriter
            .write(&scene, ModelFormat::Obj, &path, &WriteOptions::default())
            .unwrap();
        assert_eq!(report.warnings.len(), 1, "packed metallic-roughness is dropped");
        assert!(dir.path().join("pair.mtl").is_file());
        assert!(dir.path().join("pair_albedo.png").is_file());

        let loaded = FileModelLoader.load(&path).unwrap();
        assert_eq!(loaded.meshes.len(), 2);
        assert_eq!(loaded.total_triangles(), 2);
        let xs: Vec<f32> = loaded
            .meshes
            .iter()
            .map(|m| m.geometry.as_ref().unwrap().positions[0][0])
            .collect();
        assert!(xs.contains(&-5.0));
        assert_eq!(loaded.materials[0].texture(TextureChannel::BaseColor), Some(0));
    }
}
