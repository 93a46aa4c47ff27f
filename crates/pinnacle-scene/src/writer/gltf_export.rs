//! glTF 2.0 JSON and GLB export.
//!
//! Every mesh record becomes a glTF mesh with one primitive. Vertex data is
//! written as 32-bit floats and indices as 32-bit unsigned integers into a
//! single buffer, which is a `.bin` sidecar for glTF and the BIN chunk for
//! GLB.

use super::{extension_for_mime, texture_reference, write_file, WriteReport, WriteOptions};
use crate::error::{WriteError, WriteResult};
use crate::format::ModelFormat;
use crate::scene::{SceneModel, TextureChannel, TextureSlot, TextureSource, IDENTITY_MATRIX};
use base64::Engine;
use serde_json::{json, Map, Value};
use std::path::Path;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const TRIANGLES: u32 = 4;

const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

#[derive(Clone, Copy, PartialEq)]
enum ImageMode {
    /// External files or `data:` URIs.
    Uri { embed_files: bool, copy_files: bool },
    /// Buffer views inside the binary chunk.
    BufferView,
}

pub(super) fn write_gltf(scene: &SceneModel, path: &Path, options: &WriteOptions, report: &mut WriteReport) -> WriteResult<()> {
    let output_dir = path.parent().unwrap_or(Path::new("."));
    let mode = ImageMode::Uri {
        embed_files: options.embed_textures,
        copy_files: options.copy_textures,
    };
    let (mut document, bin) = build_document(scene, output_dir, mode, report)?;

    if !bin.is_empty() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scene".to_string());
        let bin_name = format!("{}.bin", stem);
        document["buffers"] = json!([{ "byteLength": bin.len(), "uri": encode_uri(&bin_name) }]);
        write_file(&output_dir.join(&bin_name), &bin, report)?;
    }

    let text = serde_json::to_vec_pretty(&document).map_err(|e| WriteError::Encode {
        format: ModelFormat::Gltf,
        message: e.to_string(),
    })?;
    write_file(path, &text, report)?;
    // The primary file goes first.
    report.written_files.rotate_right(1);
    Ok(())
}

pub(super) fn write_glb(scene: &SceneModel, path: &Path, report: &mut WriteReport) -> WriteResult<()> {
    let output_dir = path.parent().unwrap_or(Path::new("."));
    let (mut document, mut bin) = build_document(scene, output_dir, ImageMode::BufferView, report)?;
    if !bin.is_empty() {
        document["buffers"] = json!([{ "byteLength": bin.len() }]);
    }

    let mut json_bytes = serde_json::to_vec(&document).map_err(|e| WriteError::Encode {
        format: ModelFormat::Glb,
        message: e.to_string(),
    })?;
    pad_to_four(&mut json_bytes, b' ');
    pad_to_four(&mut bin, 0);

    let mut total = 12 + 8 + json_bytes.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }

    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    if !bin.is_empty() {
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(&bin);
    }

    write_file(path, &glb, report)
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn encode_uri(uri: &str) -> String {
    uri.replace('%', "%25").replace(' ', "%20")
}

#[derive(Default)]
struct BinBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BinBuilder {
    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        pad_to_four(&mut self.data, 0);
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.data.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.data.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }

    fn push_floats<const N: usize>(&mut self, values: &[[f32; N]], kind: &str, bounds: bool) -> usize {
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|v| v.iter().flat_map(|f| f.to_le_bytes()))
            .collect();
        let view = self.push_view(&bytes, Some(ARRAY_BUFFER));
        let mut accessor = json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": values.len(),
            "type": kind,
        });
        if bounds {
            let mut min = [f32::INFINITY; N];
            let mut max = [f32::NEG_INFINITY; N];
            for v in values {
                for i in 0..N {
                    min[i] = min[i].min(v[i]);
                    max[i] = max[i].max(v[i]);
                }
            }
            accessor["min"] = json!(min.to_vec());
            accessor["max"] = json!(max.to_vec());
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(ELEMENT_ARRAY_BUFFER));
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": UNSIGNED_INT,
            "count": indices.len(),
            "type": "SCALAR",
        }));
        self.accessors.len() - 1
    }
}

fn build_document(
    scene: &SceneModel,
    output_dir: &Path,
    mode: ImageMode,
    report: &mut WriteReport,
) -> WriteResult<(Value, Vec<u8>)> {
    let mut bin = BinBuilder::default();

    // Meshes
    let mut gltf_meshes = Vec::new();
    let mut mesh_map: Vec<Option<usize>> = Vec::with_capacity(scene.meshes.len());
    for mesh in &scene.meshes {
        let Some(geometry) = mesh.geometry.as_ref().filter(|g| g.vertex_count() > 0 && g.triangle_count() > 0) else {
            report.warn(format!("Mesh '{}' has no usable geometry and was omitted", mesh.name));
            mesh_map.push(None);
            continue;
        };
        let mut attributes = Map::new();
        attributes.insert("POSITION".into(), json!(bin.push_floats(&geometry.positions, "VEC3", true)));
        if !geometry.normals.is_empty() {
            attributes.insert("NORMAL".into(), json!(bin.push_floats(&geometry.normals, "VEC3", false)));
        }
        if !geometry.uvs.is_empty() {
            attributes.insert("TEXCOORD_0".into(), json!(bin.push_floats(&geometry.uvs, "VEC2", false)));
        }
        let mut primitive = json!({
            "attributes": attributes,
            "indices": bin.push_indices(&geometry.indices),
            "mode": TRIANGLES,
        });
        if let Some(material) = mesh.material {
            primitive["material"] = json!(material);
        }
        mesh_map.push(Some(gltf_meshes.len()));
        gltf_meshes.push(json!({ "name": mesh.name, "primitives": [primitive] }));
    }

    // Images and textures, one texture per image.
    let mut images = Vec::new();
    let mut texture_map: Vec<Option<usize>> = Vec::with_capacity(scene.textures.len());
    for texture in &scene.textures {
        let embedded = match &texture.source {
            TextureSource::Embedded { bytes, mime } if !bytes.is_empty() => Some((bytes.clone(), mime.clone())),
            TextureSource::Embedded { .. } => {
                report.warn(format!("Texture '{}' has no image data and was omitted", texture.name));
                texture_map.push(None);
                continue;
            }
            TextureSource::File(path) => {
                let wants_embed = match mode {
                    ImageMode::BufferView => true,
                    ImageMode::Uri { embed_files, .. } => embed_files,
                };
                if wants_embed {
                    match std::fs::read(path) {
                        Ok(bytes) => Some((bytes, texture.mime_type())),
                        Err(e) => {
                            report.warn(format!(
                                "Texture '{}' could not be embedded ({}); referencing {} instead",
                                texture.name,
                                e,
                                path.display()
                            ));
                            None
                        }
                    }
                } else {
                    None
                }
            }
        };

        let mut image = Map::new();
        image.insert("name".into(), json!(texture.name));
        match (embedded, mode) {
            (Some((bytes, mime)), ImageMode::BufferView) => {
                image.insert("bufferView".into(), json!(bin.push_view(&bytes, None)));
                image.insert("mimeType".into(), json!(mime));
            }
            (Some((bytes, mime)), ImageMode::Uri { .. }) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                image.insert("uri".into(), json!(format!("data:{};base64,{}", mime, encoded)));
            }
            (None, mode) => {
                let copy = matches!(mode, ImageMode::Uri { copy_files: true, .. });
                let reference = texture_reference(texture, output_dir, copy, report)?
                    .unwrap_or_else(|| format!("{}.{}", texture.name, extension_for_mime(&texture.mime_type())));
                image.insert("uri".into(), json!(encode_uri(&reference)));
            }
        }
        texture_map.push(Some(images.len()));
        images.push(Value::Object(image));
    }
    let gltf_textures: Vec<Value> = (0..images.len())
        .map(|i| json!({ "source": i, "sampler": 0 }))
        .collect();

    // Materials
    let mut materials = Vec::with_capacity(scene.materials.len());
    for material in &scene.materials {
        let mut pbr = json!({
            "baseColorFactor": material.base_color_factor,
            "metallicFactor": material.metallic_factor,
            "roughnessFactor": material.roughness_factor,
        });
        let mut record = json!({ "name": material.name });
        if material.emissive_factor != [0.0; 3] {
            record["emissiveFactor"] = json!(material.emissive_factor);
        }

        for (channel, slot) in &material.bindings {
            let index = match slot {
                TextureSlot::Bound(index) => texture_map.get(*index).copied().flatten(),
                TextureSlot::Missing(uri) => {
                    report.warn(format!(
                        "Material '{}' has an unresolved {} texture '{}'; binding dropped",
                        material.name, channel, uri
                    ));
                    continue;
                }
            };
            let Some(index) = index else {
                continue;
            };
            let info = json!({ "index": index });
            match channel {
                TextureChannel::BaseColor => pbr["baseColorTexture"] = info,
                TextureChannel::MetallicRoughness => pbr["metallicRoughnessTexture"] = info,
                TextureChannel::Normal => record["normalTexture"] = info,
                TextureChannel::AmbientOcclusion => record["occlusionTexture"] = info,
                TextureChannel::Emissive => record["emissiveTexture"] = info,
                TextureChannel::Metallic | TextureChannel::Roughness | TextureChannel::Height => {
                    report.warn(format!(
                        "glTF has no separate {} slot; binding on material '{}' dropped",
                        channel, material.name
                    ));
                }
            }
        }
        record["pbrMetallicRoughness"] = pbr;
        materials.push(record);
    }

    // Nodes. A node with several meshes gets one child node per extra mesh.
    let mut nodes: Vec<Value> = Vec::with_capacity(scene.nodes.len());
    let mut extra_nodes: Vec<Value> = Vec::new();
    let extra_base = scene.nodes.len();
    for node in &scene.nodes {
        let mut value = json!({ "name": node.name });
        let emitted: Vec<usize> = node
            .meshes
            .iter()
            .filter_map(|&m| mesh_map.get(m).copied().flatten())
            .collect();
        let mut children = node.children.clone();
        if let Some((&first, rest)) = emitted.split_first() {
            value["mesh"] = json!(first);
            for &mesh in rest {
                children.push(extra_base + extra_nodes.len());
                extra_nodes.push(json!({ "name": format!("{}_{}", node.name, mesh), "mesh": mesh }));
            }
        }
        if !children.is_empty() {
            value["children"] = json!(children);
        }
        if node.matrix != IDENTITY_MATRIX {
            value["matrix"] = json!(node.matrix);
        }
        nodes.push(value);
    }
    nodes.append(&mut extra_nodes);

    let mut roots = scene.roots.clone();
    for (mesh_index, count) in scene.mesh_instance_counts().into_iter().enumerate() {
        if count > 0 {
            continue;
        }
        if let Some(Some(gltf_mesh)) = mesh_map.get(mesh_index) {
            roots.push(nodes.len());
            nodes.push(json!({ "name": scene.meshes[mesh_index].name, "mesh": gltf_mesh }));
        }
    }

    let mut document = json!({
        "asset": { "version": "2.0", "generator": concat!("pinnacle ", env!("CARGO_PKG_VERSION")) },
    });
    if !roots.is_empty() {
        document["scene"] = json!(0);
        document["scenes"] = json!([{ "nodes": roots }]);
    }
    let sections = [
        ("nodes", nodes),
        ("meshes", gltf_meshes),
        ("materials", materials),
        ("images", images),
        ("textures", gltf_textures),
        ("accessors", std::mem::take(&mut bin.accessors)),
        ("bufferViews", std::mem::take(&mut bin.views)),
    ];
    for (key, values) in sections {
        if !values.is_empty() {
            document[key] = Value::Array(values);
        }
    }
    if document.get("textures").is_some() {
        document["samplers"] = json!([{}]);
    }

    Ok((document, bin.data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{FileModelLoader, ModelLoader};
    use crate::scene::{MaterialRecord, MeshGeometry, MeshRecord, NodeRecord, TextureRecord};
    use crate::writer::{FileModelWriter, ModelWriter};

    fn sample_scene(texture_bytes: Vec<u8>) -> SceneModel {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("albedo", texture_bytes, "image/png"));
        scene.materials.push(
            MaterialRecord::new("paint")
                .with_texture(TextureChannel::BaseColor, 0)
                .with_texture(TextureChannel::Height, 0),
        );
        let geometry = MeshGeometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        };
        scene.meshes.push(MeshRecord::new("tri", geometry).with_material(0));
        let mut node = NodeRecord::new("root").with_mesh(0);
        node.matrix = glam::Mat4::from_translation(glam::Vec3::new(0.0, 3.0, 0.0)).to_cols_array();
        scene.nodes.push(node);
        scene.roots.push(0);
        scene
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_glb_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.glb");
        let report = FileModelWriter
            .write(&sample_scene(tiny_png()), ModelFormat::Glb, &path, &WriteOptions::default())
            .unwrap();
        assert_eq!(report.written_files, vec![path.clone()]);
        assert_eq!(report.warnings.len(), 1, "height binding is dropped");

        let scene = FileModelLoader.load(&path).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].triangle_count, 1);
        assert!(scene.meshes[0].flags.has_normals);
        assert!(scene.meshes[0].flags.has_tex_coords);
        assert_eq!(scene.textures.len(), 1);
        assert_eq!((scene.textures[0].width, scene.textures[0].height), (2, 2));
        assert_eq!(scene.materials[0].texture(TextureChannel::BaseColor), Some(0));
        assert_eq!(scene.nodes[0].matrix[13], 3.0);
    }

    #[test]
    fn test_gltf_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gltf");
        let report = FileModelWriter
            .write(&sample_scene(tiny_png()), ModelFormat::Gltf, &path, &WriteOptions::default())
            .unwrap();
        assert_eq!(report.written_files[0], path);
        assert!(dir.path().join("out.bin").is_file());

        let scene = FileModelLoader.load(&path).unwrap();
        assert_eq!(scene.meshes[0].vertex_count, 3);
        assert!(scene.textures[0].exists());
    }

    #[test]
    fn test_unused_mesh_gets_root_node() {
        let mut scene = sample_scene(tiny_png());
        scene.nodes.clear();
        scene.roots.clear();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loose.glb");
        FileModelWriter
            .write(&scene, ModelFormat::Glb, &path, &WriteOptions::default())
            .unwrap();
        let loaded = FileModelLoader.load(&path).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.roots, vec![0]);
    }
}
