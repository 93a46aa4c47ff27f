//! USDZ export.
//!
//! The scene is written as a single USDA layer with `UsdPreviewSurface`
//! materials, then packed with its textures into an uncompressed zip whose
//! entries start on 64-byte boundaries, as USDZ readers require. The layer
//! is always the first entry.

use super::{extension_for_mime, sanitize_name, write_file, NameAllocator, WriteReport};
use crate::error::{WriteError, WriteResult};
use crate::format::ModelFormat;
use crate::scene::{MaterialRecord, MeshGeometry, SceneModel, TextureChannel, TextureSlot, IDENTITY_MATRIX};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

const USDZ_ALIGNMENT: u16 = 64;
const LAYER_NAME: &str = "scene.usda";

struct PackedTexture {
    entry: String,
    bytes: Vec<u8>,
}

pub(super) fn write(scene: &SceneModel, path: &Path, report: &mut WriteReport) -> WriteResult<()> {
    let textures = collect_textures(scene, report);
    let layer = build_layer(scene, &textures, report);

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .with_alignment(USDZ_ALIGNMENT);

        let mut add = |name: &str, bytes: &[u8]| -> Result<(), String> {
            zip.start_file(name, options).map_err(|e| e.to_string())?;
            zip.write_all(bytes).map_err(|e| e.to_string())
        };
        add(LAYER_NAME, layer.as_bytes()).map_err(encode_error)?;
        for texture in textures.iter().flatten() {
            add(&texture.entry, &texture.bytes).map_err(encode_error)?;
        }
        zip.finish().map_err(|e| encode_error(e.to_string()))?;
    }

    write_file(path, &buffer.into_inner(), report)
}

fn encode_error(message: String) -> WriteError {
    WriteError::Encode {
        format: ModelFormat::Usdz,
        message,
    }
}

fn collect_textures(scene: &SceneModel, report: &mut WriteReport) -> Vec<Option<PackedTexture>> {
    let mut names = NameAllocator::default();
    scene
        .textures
        .iter()
        .enumerate()
        .map(|(index, texture)| match texture.read_bytes() {
            Ok(bytes) if !bytes.is_empty() => {
                let stem = sanitize_name(
                    Path::new(&texture.name)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or(""),
                    &format!("texture_{}", index),
                );
                let ext = match texture.format.as_str() {
                    "jpeg" | "jpg" => "jpg",
                    "png" => "png",
                    _ => extension_for_mime(&texture.mime_type()),
                };
                let entry = format!("textures/{}.{}", names.allocate(stem), ext);
                Some(PackedTexture { entry, bytes })
            }
            _ => {
                report.warn(format!("Texture '{}' could not be read and was not packaged", texture.name));
                None
            }
        })
        .collect()
}

fn build_layer(scene: &SceneModel, textures: &[Option<PackedTexture>], report: &mut WriteReport) -> String {
    let mut out = String::new();
    out.push_str("#usda 1.0\n(\n    defaultPrim = \"Root\"\n    metersPerUnit = 1\n    upAxis = \"Y\"\n)\n\n");
    out.push_str("def Xform \"Root\"\n{\n");

    let mut material_names = NameAllocator::default();
    let material_paths: Vec<String> = scene
        .materials
        .iter()
        .enumerate()
        .map(|(i, m)| material_names.allocate(sanitize_name(&m.name, &format!("material_{}", i))))
        .collect();

    if !scene.materials.is_empty() {
        out.push_str("    def Scope \"Materials\"\n    {\n");
        for (material, prim) in scene.materials.iter().zip(&material_paths) {
            write_material(&mut out, material, prim, textures, report);
        }
        out.push_str("    }\n");
    }

    let mut prim_names = NameAllocator::default();
    let mut visited = HashSet::new();
    for &root in &scene.roots {
        write_node(&mut out, scene, root, 1, &mut prim_names, &material_paths, &mut visited);
    }
    for (mesh_index, count) in scene.mesh_instance_counts().into_iter().enumerate() {
        if count == 0 {
            let name = prim_names.allocate(sanitize_name(&scene.meshes[mesh_index].name, "mesh"));
            write_mesh(&mut out, scene, mesh_index, &name, 1, &material_paths);
        }
    }

    out.push_str("}\n");
    out
}

fn indent(level: usize) -> String {
    "    ".repeat(level)
}

fn write_material(
    out: &mut String,
    material: &MaterialRecord,
    prim: &str,
    textures: &[Option<PackedTexture>],
    report: &mut WriteReport,
) {
    let base = format!("/Root/Materials/{}", prim);
    let surface = format!("{}/PreviewSurface", base);
    let mut inputs: Vec<String> = Vec::new();
    let mut shaders = String::new();
    let mut needs_st = false;

    let texture_entry = |channel: TextureChannel| bound_entry(material, textures, channel);
    let add_reader = |shaders: &mut String, name: &str, entry: &str, outputs: &[&str]| {
        write_texture_reader(shaders, &base, name, entry, outputs)
    };

    let [r, g, b, a] = material.base_color_factor;
    match texture_entry(TextureChannel::BaseColor) {
        Some(entry) => {
            add_reader(&mut shaders, "BaseColorTex", entry, &["rgb", "a"]);
            inputs.push(format!("color3f inputs:diffuseColor.connect = <{}/BaseColorTex.outputs:rgb>", base));
            needs_st = true;
        }
        None => inputs.push(format!("color3f inputs:diffuseColor = ({}, {}, {})", r, g, b)),
    }
    inputs.push(format!("float inputs:opacity = {}", a));

    let packed = texture_entry(TextureChannel::MetallicRoughness);
    if let Some(entry) = packed {
        add_reader(&mut shaders, "MetallicRoughnessTex", entry, &["g", "b"]);
        inputs.push(format!("float inputs:metallic.connect = <{}/MetallicRoughnessTex.outputs:b>", base));
        inputs.push(format!("float inputs:roughness.connect = <{}/MetallicRoughnessTex.outputs:g>", base));
        needs_st = true;
    } else {
        match texture_entry(TextureChannel::Metallic) {
            Some(entry) => {
                add_reader(&mut shaders, "MetallicTex", entry, &["r"]);
                inputs.push(format!("float inputs:metallic.connect = <{}/MetallicTex.outputs:r>", base));
                needs_st = true;
            }
            None => inputs.push(format!("float inputs:metallic = {}", material.metallic_factor)),
        }
        match texture_entry(TextureChannel::Roughness) {
            Some(entry) => {
                add_reader(&mut shaders, "RoughnessTex", entry, &["r"]);
                inputs.push(format!("float inputs:roughness.connect = <{}/RoughnessTex.outputs:r>", base));
                needs_st = true;
            }
            None => inputs.push(format!("float inputs:roughness = {}", material.roughness_factor)),
        }
    }

    if let Some(entry) = texture_entry(TextureChannel::Normal) {
        add_reader(&mut shaders, "NormalTex", entry, &["rgb"]);
        inputs.push(format!("normal3f inputs:normal.connect = <{}/NormalTex.outputs:rgb>", base));
        needs_st = true;
    }
    if let Some(entry) = texture_entry(TextureChannel::AmbientOcclusion) {
        add_reader(&mut shaders, "OcclusionTex", entry, &["r"]);
        inputs.push(format!("float inputs:occlusion.connect = <{}/OcclusionTex.outputs:r>", base));
        needs_st = true;
    }
    match texture_entry(TextureChannel::Emissive) {
        Some(entry) => {
            add_reader(&mut shaders, "EmissiveTex", entry, &["rgb"]);
            inputs.push(format!("color3f inputs:emissiveColor.connect = <{}/EmissiveTex.outputs:rgb>", base));
            needs_st = true;
        }
        None => {
            let [er, eg, eb] = material.emissive_factor;
            inputs.push(format!("color3f inputs:emissiveColor = ({}, {}, {})", er, eg, eb));
        }
    }
    if let Some(entry) = texture_entry(TextureChannel::Height) {
        add_reader(&mut shaders, "DisplacementTex", entry, &["r"]);
        inputs.push(format!("float inputs:displacement.connect = <{}/DisplacementTex.outputs:r>", base));
        needs_st = true;
    }

    for (channel, slot) in &material.bindings {
        if let TextureSlot::Missing(uri) = slot {
            report.warn(format!(
                "Material '{}' has an unresolved {} texture '{}'; binding dropped",
                material.name, channel, uri
            ));
        }
    }

    let _ = writeln!(out, "        def Material \"{}\"\n        {{", prim);
    let _ = writeln!(out, "            token outputs:surface.connect = <{}.outputs:surface>", surface);
    let _ = writeln!(out, "            def Shader \"PreviewSurface\"\n            {{");
    let _ = writeln!(out, "                uniform token info:id = \"UsdPreviewSurface\"");
    for input in &inputs {
        let _ = writeln!(out, "                {}", input);
    }
    let _ = writeln!(out, "                token outputs:surface\n            }}");
    if needs_st {
        let _ = writeln!(out, "            def Shader \"stReader\"\n            {{");
        let _ = writeln!(out, "                uniform token info:id = \"UsdPrimvarReader_float2\"");
        let _ = writeln!(out, "                string inputs:varname = \"st\"");
        let _ = writeln!(out, "                float2 outputs:result\n            }}");
    }
    out.push_str(&shaders);
    let _ = writeln!(out, "        }}");
}

fn bound_entry<'t>(
    material: &MaterialRecord,
    textures: &'t [Option<PackedTexture>],
    channel: TextureChannel,
) -> Option<&'t str> {
    match material.bindings.get(&channel)? {
        TextureSlot::Bound(index) => textures.get(*index)?.as_ref().map(|t| t.entry.as_str()),
        TextureSlot::Missing(_) => None,
    }
}

fn write_texture_reader(shaders: &mut String, material_path: &str, name: &str, entry: &str, outputs: &[&str]) {
    let _ = writeln!(shaders, "            def Shader \"{}\"\n            {{", name);
    let _ = writeln!(shaders, "                uniform token info:id = \"UsdUVTexture\"");
    let _ = writeln!(shaders, "                asset inputs:file = @{}@", entry);
    let _ = writeln!(
        shaders,
        "                float2 inputs:st.connect = <{}/stReader.outputs:result>",
        material_path
    );
    for output in outputs {
        let kind = if *output == "rgb" { "float3" } else { "float" };
        let _ = writeln!(shaders, "                {} outputs:{}", kind, output);
    }
    let _ = writeln!(shaders, "            }}");
}

fn write_node(
    out: &mut String,
    scene: &SceneModel,
    node_index: usize,
    level: usize,
    names: &mut NameAllocator,
    material_paths: &[String],
    visited: &mut HashSet<usize>,
) {
    let Some(node) = scene.nodes.get(node_index) else {
        return;
    };
    if !visited.insert(node_index) {
        return;
    }
    let pad = indent(level);
    let name = names.allocate(sanitize_name(&node.name, "node"));
    let _ = writeln!(out, "{}def Xform \"{}\"\n{}{{", pad, name, pad);
    if node.matrix != IDENTITY_MATRIX {
        let m = &node.matrix;
        let rows: Vec<String> = (0..4)
            .map(|c| format!("({}, {}, {}, {})", m[c * 4], m[c * 4 + 1], m[c * 4 + 2], m[c * 4 + 3]))
            .collect();
        let _ = writeln!(out, "{}    matrix4d xformOp:transform = ( {} )", pad, rows.join(", "));
        let _ = writeln!(out, "{}    uniform token[] xformOpOrder = [\"xformOp:transform\"]", pad);
    }
    for &mesh in &node.meshes {
        let mesh_name = names.allocate(sanitize_name(&scene.meshes[mesh].name, "mesh"));
        write_mesh(out, scene, mesh, &mesh_name, level + 1, material_paths);
    }
    for &child in &node.children {
        write_node(out, scene, child, level + 1, names, material_paths, visited);
    }
    let _ = writeln!(out, "{}}}", pad);
}

fn write_mesh(out: &mut String, scene: &SceneModel, mesh_index: usize, name: &str, level: usize, material_paths: &[String]) {
    let mesh = &scene.meshes[mesh_index];
    let Some(geometry) = &mesh.geometry else {
        return;
    };
    let pad = indent(level);
    let _ = writeln!(out, "{}def Mesh \"{}\"\n{}{{", pad, name, pad);
    write_geometry(out, geometry, &pad);
    if let Some(path) = mesh.material.and_then(|m| material_paths.get(m)) {
        let _ = writeln!(out, "{}    rel material:binding = </Root/Materials/{}>", pad, path);
    }
    let _ = writeln!(out, "{}}}", pad);
}

fn write_geometry(out: &mut String, geometry: &MeshGeometry, pad: &str) {
    let counts = vec!["3"; geometry.triangle_count()].join(", ");
    let indices: Vec<String> = geometry.indices.iter().map(u32::to_string).collect();
    let points: Vec<String> = geometry
        .positions
        .iter()
        .map(|p| format!("({}, {}, {})", p[0], p[1], p[2]))
        .collect();
    let _ = writeln!(out, "{}    int[] faceVertexCounts = [{}]", pad, counts);
    let _ = writeln!(out, "{}    int[] faceVertexIndices = [{}]", pad, indices.join(", "));
    let _ = writeln!(out, "{}    point3f[] points = [{}]", pad, points.join(", "));
    if !geometry.normals.is_empty() {
        let normals: Vec<String> = geometry
            .normals
            .iter()
            .map(|n| format!("({}, {}, {})", n[0], n[1], n[2]))
            .collect();
        let _ = writeln!(out, "{}    normal3f[] normals = [{}] (\n{}        interpolation = \"vertex\"\n{}    )", pad, normals.join(", "), pad, pad);
    }
    if !geometry.uvs.is_empty() {
        // USD texture space has V pointing up.
        let uvs: Vec<String> = geometry
            .uvs
            .iter()
            .map(|t| format!("({}, {})", t[0], 1.0 - t[1]))
            .collect();
        let _ = writeln!(out, "{}    texCoord2f[] primvars:st = [{}] (\n{}        interpolation = \"vertex\"\n{}    )", pad, uvs.join(", "), pad, pad);
    }
    let _ = writeln!(out, "{}    uniform token orientation = \"rightHanded\"", pad);
    let _ = writeln!(out, "{}    uniform token subdivisionScheme = \"none\"", pad);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshRecord, NodeRecord, TextureRecord};
    use crate::writer::{FileModelWriter, ModelWriter, WriteOptions};
    use std::io::Read;

    fn scene_with_texture() -> SceneModel {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("wood grain.png", vec![9; 100], "image/png"));
        scene.materials.push(
            MaterialRecord::new("Oak Wood")
                .with_texture(TextureChannel::BaseColor, 0)
                .with_texture(TextureChannel::MetallicRoughness, 0),
        );
        let geometry = MeshGeometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Vec::new(),
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        };
        scene.meshes.push(MeshRecord::new("plank", geometry).with_material(0));
        scene.nodes.push(NodeRecord::new("table").with_mesh(0));
        scene.roots.push(0);
        scene
    }

    #[test]
    fn test_usdz_package_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.usdz");
        let report = FileModelWriter
            .write(&scene_with_texture(), ModelFormat::Usdz, &path, &WriteOptions::default())
            .unwrap();
        assert!(report.warnings.is_empty());

        let file = std::fs::File::open(&path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 2);

        let mut layer = String::new();
        {
            let mut entry = archive.by_index(0).unwrap();
            assert_eq!(entry.name(), LAYER_NAME);
            assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
            assert_eq!(entry.data_start() % 64, 0);
            entry.read_to_string(&mut layer).unwrap();
        }
        assert!(layer.starts_with("#usda 1.0"));
        assert!(layer.contains("def Material \"Oak_Wood\""));
        assert!(layer.contains("UsdPreviewSurface"));
        assert!(layer.contains("@textures/wood_grain.png@"));
        assert!(layer.contains("MetallicRoughnessTex.outputs:b"));
        assert!(layer.contains("rel material:binding = </Root/Materials/Oak_Wood>"));

        let texture = archive.by_index(1).unwrap();
        assert_eq!(texture.name(), "textures/wood_grain.png");
        assert_eq!(texture.data_start() % 64, 0);
    }

    #[test]
    fn test_unreadable_texture_warns() {
        let mut scene = scene_with_texture();
        scene.textures[0] = TextureRecord::from_file("/nonexistent/pinnacle/wood.png");
        let dir = tempfile::tempdir().unwrap();
        let report = FileModelWriter
            .write(&scene, ModelFormat::Usdz, &dir.path().join("t.usdz"), &WriteOptions::default())
            .unwrap();
        assert_eq!(report.warnings.len(), 1);
    }
}
