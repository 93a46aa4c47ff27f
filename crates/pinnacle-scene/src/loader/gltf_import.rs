//! glTF 2.0 / GLB import.
//!
//! Each glTF primitive becomes one [`MeshRecord`], since a record carries a
//! single material. A node that instantiates a multi-primitive mesh
//! references all of the resulting records. glTF textures are resolved to
//! their source images, so [`SceneModel::textures`] holds one record per
//! image.

use crate::error::{LoadError, LoadResult};
use crate::format::ModelFormat;
use crate::scene::{
    MaterialRecord, MeshGeometry, MeshRecord, NodeRecord, SceneModel, TextureChannel, TextureRecord, TextureSlot,
};
use base64::Engine;
use std::path::Path;

pub(super) fn load(path: &Path, format: ModelFormat) -> LoadResult<SceneModel> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(|e| match e {
        gltf::Error::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => LoadError::corrupt(format, path, other.to_string()),
    })?;

    let base = path.parent();
    let buffers = match gltf::import_buffers(&document, base, blob) {
        Ok(buffers) => Some(buffers),
        Err(e) => {
            log::warn!(
                "Buffers of {} could not be read ({}); geometry will be unavailable",
                path.display(),
                e
            );
            None
        }
    };
    let buffer_slice = |index: usize| {
        buffers
            .as_ref()
            .and_then(|b| b.get(index))
            .map(|data| data.0.as_slice())
    };

    let mut scene = SceneModel::new();

    for image in document.images() {
        let fallback = format!("image_{}", image.index());
        let record = match image.source() {
            gltf::image::Source::Uri { uri, mime_type } => {
                if let Some(data_uri) = uri.strip_prefix("data:") {
                    let (mime, bytes) = decode_data_uri(data_uri)
                        .ok_or_else(|| LoadError::corrupt(format, path, format!("invalid data URI in image {}", image.index())))?;
                    let mime = mime_type.map(str::to_string).unwrap_or(mime);
                    TextureRecord::embedded(image.name().unwrap_or(&fallback), bytes, mime)
                } else {
                    let relative = super::percent_decode(uri);
                    let resolved = match base {
                        Some(dir) => dir.join(&relative),
                        None => Path::new(&relative).to_path_buf(),
                    };
                    let mut record = TextureRecord::from_file(resolved);
                    if let Some(name) = image.name() {
                        record.name = name.to_string();
                    }
                    record
                }
            }
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffer_slice(view.buffer().index())
                    .and_then(|data| data.get(start..end))
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                TextureRecord::embedded(image.name().unwrap_or(&fallback), bytes, mime_type)
            }
        };
        scene.textures.push(record);
    }

    for material in document.materials() {
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0)));
        let pbr = material.pbr_metallic_roughness();
        let mut record = MaterialRecord::new(name);
        record.base_color_factor = pbr.base_color_factor();
        record.metallic_factor = pbr.metallic_factor();
        record.roughness_factor = pbr.roughness_factor();
        record.emissive_factor = material.emissive_factor();

        let image_count = scene.textures.len();
        let mut bind = |channel: TextureChannel, texture: gltf::Texture| {
            let image = texture.source().index();
            let slot = if image < image_count {
                TextureSlot::Bound(image)
            } else {
                TextureSlot::Missing(format!("texture {}", texture.index()))
            };
            record.bindings.insert(channel, slot);
        };
        if let Some(info) = pbr.base_color_texture() {
            bind(TextureChannel::BaseColor, info.texture());
        }
        if let Some(info) = pbr.metallic_roughness_texture() {
            bind(TextureChannel::MetallicRoughness, info.texture());
        }
        if let Some(normal) = material.normal_texture() {
            bind(TextureChannel::Normal, normal.texture());
        }
        if let Some(occlusion) = material.occlusion_texture() {
            bind(TextureChannel::AmbientOcclusion, occlusion.texture());
        }
        if let Some(info) = material.emissive_texture() {
            bind(TextureChannel::Emissive, info.texture());
        }
        scene.materials.push(record);
    }

    let mut mesh_records: Vec<Vec<usize>> = Vec::with_capacity(document.meshes().count());
    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().count();
        let mut records = Vec::with_capacity(primitive_count);

        for primitive in mesh.primitives() {
            let name = if primitive_count > 1 {
                format!("{}_{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            };
            let declared_vertices = primitive
                .get(&gltf::Semantic::Positions)
                .map(|a| a.count())
                .unwrap_or(0);
            let declared_triangles = primitive
                .indices()
                .map(|a| a.count() / 3)
                .unwrap_or(declared_vertices / 3);

            let geometry = if primitive.mode() == gltf::mesh::Mode::Triangles {
                read_geometry(&primitive, &buffer_slice)
            } else {
                log::warn!(
                    "Primitive {} of mesh '{}' uses {:?} mode; only triangle lists are imported",
                    primitive.index(),
                    mesh_name,
                    primitive.mode()
                );
                None
            };

            let mut record = match geometry {
                Some(geometry) => MeshRecord::new(name, geometry),
                None => MeshRecord::without_geometry(name, declared_vertices, declared_triangles),
            };
            record.material = primitive.material().index();
            records.push(scene.meshes.len());
            scene.meshes.push(record);
        }
        mesh_records.push(records);
    }

    for node in document.nodes() {
        let meshes = node
            .mesh()
            .and_then(|m| mesh_records.get(m.index()).cloned())
            .unwrap_or_default();
        scene.nodes.push(NodeRecord {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", node.index())),
            meshes,
            children: node.children().map(|c| c.index()).collect(),
            matrix: glam::Mat4::from_cols_array_2d(&node.transform().matrix()).to_cols_array(),
        });
    }

    let root_scene = document.default_scene().or_else(|| document.scenes().next());
    scene.roots = match root_scene {
        Some(s) => s.nodes().map(|n| n.index()).collect(),
        None => parentless_nodes(&scene.nodes),
    };

    Ok(scene)
}

fn read_geometry<'s, F>(primitive: &gltf::Primitive<'_>, buffer_slice: &F) -> Option<MeshGeometry>
where
    F: Fn(usize) -> Option<&'s [u8]>,
{
    let reader = primitive.reader(|buffer| buffer_slice(buffer.index()));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Vec<[f32; 3]> = reader.read_normals().map(|n| n.collect()).unwrap_or_default();
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_default();
    let mut indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let whole = indices.len() - indices.len() % 3;
    indices.truncate(whole);

    Some(MeshGeometry {
        positions,
        normals,
        uvs,
        indices,
    })
}

fn parentless_nodes(nodes: &[NodeRecord]) -> Vec<usize> {
    let mut has_parent = vec![false; nodes.len()];
    for node in nodes {
        for &child in &node.children {
            if let Some(flag) = has_parent.get_mut(child) {
                *flag = true;
            }
        }
    }
    (0..nodes.len()).filter(|&i| !has_parent[i]).collect()
}

/// Decodes the part of a `data:` URI after the scheme.
pub(crate) fn decode_data_uri(data: &str) -> Option<(String, Vec<u8>)> {
    let (header, payload) = data.split_once(',')?;
    let mime = header.split(';').next().unwrap_or("").to_string();
    if !header.ends_with(";base64") {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}
