//! In-memory scene model: meshes, materials, textures and the node graph.
//!
//! A [`SceneModel`] is produced by a [`crate::ModelLoader`], replaced
//! wholesale when a new file is opened, and mutated in place by the
//! optimizer. Texture reference counts are never stored; they are derived
//! by scanning the material list every time they are asked for.

use crate::error::EngineError;
use crate::format::ModelFormat;
use crate::geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Column-major 4x4 identity matrix.
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// PBR channels a material can bind a texture to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureChannel {
    BaseColor,
    Metallic,
    Roughness,
    MetallicRoughness,
    Normal,
    AmbientOcclusion,
    Emissive,
    Height,
}

impl TextureChannel {
    /// All channels in binding order.
    pub const ALL: [TextureChannel; 8] = [
        TextureChannel::BaseColor,
        TextureChannel::Metallic,
        TextureChannel::Roughness,
        TextureChannel::MetallicRoughness,
        TextureChannel::Normal,
        TextureChannel::AmbientOcclusion,
        TextureChannel::Emissive,
        TextureChannel::Height,
    ];

    /// Snake-case channel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureChannel::BaseColor => "base_color",
            TextureChannel::Metallic => "metallic",
            TextureChannel::Roughness => "roughness",
            TextureChannel::MetallicRoughness => "metallic_roughness",
            TextureChannel::Normal => "normal",
            TextureChannel::AmbientOcclusion => "ambient_occlusion",
            TextureChannel::Emissive => "emissive",
            TextureChannel::Height => "height",
        }
    }

    /// Parses a snake-case channel name.
    pub fn parse(name: &str) -> Option<TextureChannel> {
        TextureChannel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == name)
    }
}

impl fmt::Display for TextureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a material channel points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TextureSlot {
    /// Index into [`SceneModel::textures`].
    Bound(usize),
    /// The source referenced a texture that could not be resolved.
    Missing(String),
}

impl TextureSlot {
    /// Returns the bound texture index, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            TextureSlot::Bound(index) => Some(*index),
            TextureSlot::Missing(_) => None,
        }
    }
}

/// Derived mesh properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshFlags {
    pub has_normals: bool,
    pub has_tex_coords: bool,
    pub is_manifold: bool,
    pub is_watertight: bool,
}

/// Indexed triangle geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    pub positions: Vec<[f32; 3]>,
    /// Empty, or the same length as `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Empty, or the same length as `positions`.
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list; length is a multiple of three.
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterates over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Returns true if all indices address an existing vertex.
    pub fn indices_in_range(&self) -> bool {
        let count = self.positions.len();
        self.indices.iter().all(|&i| (i as usize) < count)
    }
}

/// One drawable mesh with a single material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord {
    pub name: String,
    /// Index into [`SceneModel::materials`].
    pub material: Option<usize>,
    /// Absent when the vertex buffers could not be read.
    pub geometry: Option<MeshGeometry>,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub flags: MeshFlags,
}

impl MeshRecord {
    /// Creates a mesh from geometry and computes its derived fields.
    pub fn new(name: impl Into<String>, geometry: MeshGeometry) -> Self {
        let mut mesh = Self {
            name: name.into(),
            material: None,
            geometry: Some(geometry),
            vertex_count: 0,
            triangle_count: 0,
            flags: MeshFlags::default(),
        };
        mesh.refresh_derived();
        mesh
    }

    /// Creates a mesh whose geometry is unavailable, keeping declared counts.
    pub fn without_geometry(name: impl Into<String>, vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            name: name.into(),
            material: None,
            geometry: None,
            vertex_count,
            triangle_count,
            flags: MeshFlags::default(),
        }
    }

    /// Builder method to set the material index.
    pub fn with_material(mut self, material: usize) -> Self {
        self.material = Some(material);
        self
    }

    /// Recomputes counts and flags from geometry.
    ///
    /// Must be called after any topology-changing edit. Meshes without
    /// geometry keep their declared counts and report every flag false.
    pub fn refresh_derived(&mut self) {
        let Some(geometry) = &self.geometry else {
            self.flags = MeshFlags::default();
            return;
        };
        self.vertex_count = geometry.vertex_count();
        self.triangle_count = geometry.triangle_count();

        let edges = geometry::edge_usage(geometry);
        self.flags = MeshFlags {
            has_normals: !geometry.normals.is_empty() && geometry.normals.len() == geometry.positions.len(),
            has_tex_coords: !geometry.uvs.is_empty() && geometry.uvs.len() == geometry.positions.len(),
            is_manifold: geometry.triangle_count() > 0 && geometry::is_manifold(&edges),
            is_watertight: geometry.triangle_count() > 0 && geometry::is_watertight(&edges),
        };
    }
}

/// A PBR metallic-roughness material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    /// At most one slot per channel.
    pub bindings: BTreeMap<TextureChannel, TextureSlot>,
}

impl MaterialRecord {
    /// Creates a material with glTF default factors and no textures.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0, 0.0, 0.0],
            bindings: BTreeMap::new(),
        }
    }

    /// Builder method to bind a texture index to a channel.
    pub fn with_texture(mut self, channel: TextureChannel, texture: usize) -> Self {
        self.bindings.insert(channel, TextureSlot::Bound(texture));
        self
    }

    /// Returns the texture index bound to a channel.
    pub fn texture(&self, channel: TextureChannel) -> Option<usize> {
        self.bindings.get(&channel).and_then(TextureSlot::index)
    }

    /// Returns true if the material binds the given texture on any channel.
    pub fn references(&self, texture: usize) -> bool {
        self.bindings
            .values()
            .any(|slot| slot.index() == Some(texture))
    }

    /// Returns true if both the separate metallic and the packed
    /// metallic-roughness channels are bound.
    pub fn has_metallic_conflict(&self) -> bool {
        self.bindings.contains_key(&TextureChannel::Metallic)
            && self.bindings.contains_key(&TextureChannel::MetallicRoughness)
    }
}

/// Where a texture's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSource {
    /// An image file on disk.
    File(PathBuf),
    /// Bytes carried inside the model (GLB buffer view or data URI).
    Embedded {
        #[serde(skip)]
        bytes: Vec<u8>,
        mime: String,
    },
}

/// One texture image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRecord {
    pub name: String,
    pub source: TextureSource,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    /// Lowercase encoding name, e.g. "png" or "jpeg".
    pub format: String,
}

impl TextureRecord {
    /// Creates a texture record pointing at a file, probing its size and
    /// dimensions when it exists.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = format_from_path(&path);
        let byte_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let (width, height) = image::image_dimensions(&path).unwrap_or((0, 0));
        Self {
            name,
            source: TextureSource::File(path),
            width,
            height,
            byte_size,
            format,
        }
    }

    /// Creates an embedded texture, decoding dimensions from its header.
    pub fn embedded(name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        let (width, height) = embedded_dimensions(&bytes);
        let format = mime
            .strip_prefix("image/")
            .unwrap_or(mime.as_str())
            .to_string();
        Self {
            name: name.into(),
            byte_size: bytes.len() as u64,
            source: TextureSource::Embedded { bytes, mime },
            width,
            height,
            format,
        }
    }

    /// File path, if the texture lives on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            TextureSource::File(path) => Some(path),
            TextureSource::Embedded { .. } => None,
        }
    }

    /// Returns true if the texture bytes are available.
    pub fn exists(&self) -> bool {
        match &self.source {
            TextureSource::File(path) => path.is_file(),
            TextureSource::Embedded { bytes, .. } => !bytes.is_empty(),
        }
    }

    /// Reads the encoded bytes from disk or the embedded buffer.
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            TextureSource::File(path) => std::fs::read(path),
            TextureSource::Embedded { bytes, .. } => Ok(bytes.clone()),
        }
    }

    /// MIME type derived from the encoding name.
    pub fn mime_type(&self) -> String {
        match &self.source {
            TextureSource::Embedded { mime, .. } => mime.clone(),
            TextureSource::File(_) => match self.format.as_str() {
                "jpg" | "jpeg" => "image/jpeg".to_string(),
                other => format!("image/{other}"),
            },
        }
    }

    /// Estimated decompressed RGBA8 size, falling back to the encoded size
    /// when dimensions are unknown.
    pub fn memory_estimate(&self) -> u64 {
        if self.width > 0 && self.height > 0 {
            self.width as u64 * self.height as u64 * 4
        } else {
            self.byte_size
        }
    }

    /// Returns true if both dimensions are powers of two.
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }
}

/// Lowercase encoding name from a file extension.
pub fn format_from_path(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" => "jpeg".to_string(),
        Some(ext) => ext,
        None => String::new(),
    }
}

fn embedded_dimensions(bytes: &[u8]) -> (u32, u32) {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .unwrap_or((0, 0))
}

/// A transform node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    /// Indices into [`SceneModel::meshes`].
    pub meshes: Vec<usize>,
    /// Indices into [`SceneModel::nodes`].
    pub children: Vec<usize>,
    /// Local transform, column-major.
    pub matrix: [f32; 16],
}

impl NodeRecord {
    /// Creates a node with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
            children: Vec::new(),
            matrix: IDENTITY_MATRIX,
        }
    }

    /// Builder method to attach a mesh.
    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Builder method to attach a child node.
    pub fn with_child(mut self, child: usize) -> Self {
        self.children.push(child);
        self
    }
}

/// A complete loaded asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    pub source_path: Option<PathBuf>,
    pub format: ModelFormat,
    pub meshes: Vec<MeshRecord>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<TextureRecord>,
    pub nodes: Vec<NodeRecord>,
    /// Root node indices.
    pub roots: Vec<usize>,
}

impl Default for SceneModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneModel {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self {
            source_path: None,
            format: ModelFormat::Unknown,
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Directory of the source file, used to resolve relative texture paths.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// Total vertices over all meshes.
    pub fn total_vertices(&self) -> usize {
        self.meshes.iter().map(|m| m.vertex_count).sum()
    }

    /// Total triangles over all meshes.
    pub fn total_triangles(&self) -> usize {
        self.meshes.iter().map(|m| m.triangle_count).sum()
    }

    /// Number of distinct materials binding the texture on any channel.
    pub fn reference_count(&self, texture: usize) -> usize {
        self.referencing_materials(texture).len()
    }

    /// Indices of materials that bind the texture on any channel.
    pub fn referencing_materials(&self, texture: usize) -> Vec<usize> {
        self.materials
            .iter()
            .enumerate()
            .filter(|(_, material)| material.references(texture))
            .map(|(index, _)| index)
            .collect()
    }

    /// Reference counts for every texture, in texture order.
    pub fn reference_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.textures.len()];
        for material in &self.materials {
            let distinct: BTreeSet<usize> = material.bindings.values().filter_map(TextureSlot::index).collect();
            for index in distinct {
                if let Some(count) = counts.get_mut(index) {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Number of node references to each mesh.
    pub fn mesh_instance_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.meshes.len()];
        for node in &self.nodes {
            for &mesh in &node.meshes {
                if let Some(count) = counts.get_mut(mesh) {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Maximum depth of the node hierarchy (roots are depth 1).
    ///
    /// Cycles are not followed; a cyclic graph reports the depth reached
    /// before the first revisit.
    pub fn max_hierarchy_depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack: Vec<(usize, usize)> = self.roots.iter().map(|&r| (r, 1)).collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((node, depth)) = stack.pop() {
            if node >= self.nodes.len() || visited[node] {
                continue;
            }
            visited[node] = true;
            max_depth = max_depth.max(depth);
            for &child in &self.nodes[node].children {
                stack.push((child, depth + 1));
            }
        }
        max_depth
    }

    /// Finds a node that participates in a cycle, if any.
    pub fn find_cycle(&self) -> Option<usize> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }
        let mut marks = vec![Mark::New; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] != Mark::New {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::Active;
            while let Some((node, next_child)) = stack.last().copied() {
                let children = &self.nodes[node].children;
                if next_child < children.len() {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    let child = children[next_child];
                    if child >= marks.len() {
                        continue;
                    }
                    match marks[child] {
                        Mark::Active => return Some(child),
                        Mark::New => {
                            marks[child] = Mark::Active;
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        None
    }

    /// World-space matrix of every node reachable from the roots.
    ///
    /// Unreachable nodes get `None`.
    pub fn world_matrices(&self) -> Vec<Option<glam::Mat4>> {
        let mut world = vec![None; self.nodes.len()];
        let mut stack: Vec<(usize, glam::Mat4)> = self.roots.iter().map(|&r| (r, glam::Mat4::IDENTITY)).collect();
        while let Some((node, parent)) = stack.pop() {
            if node >= self.nodes.len() || world[node].is_some() {
                continue;
            }
            let matrix = parent * glam::Mat4::from_cols_array(&self.nodes[node].matrix);
            world[node] = Some(matrix);
            for &child in &self.nodes[node].children {
                stack.push((child, matrix));
            }
        }
        world
    }

    /// Checks every cross-reference in the model.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        for material in &self.materials {
            for (channel, slot) in &material.bindings {
                if let TextureSlot::Bound(index) = slot {
                    if *index >= self.textures.len() {
                        return Err(EngineError::DanglingTexture {
                            material: material.name.clone(),
                            channel: channel.to_string(),
                            index: *index,
                            texture_count: self.textures.len(),
                        });
                    }
                }
            }
        }

        for mesh in &self.meshes {
            if let Some(index) = mesh.material {
                if index >= self.materials.len() {
                    return Err(EngineError::DanglingMaterial {
                        mesh: mesh.name.clone(),
                        index,
                        material_count: self.materials.len(),
                    });
                }
            }
            if let Some(geometry) = &mesh.geometry {
                let count = geometry.positions.len();
                if let Some(&bad) = geometry.indices.iter().find(|&&i| i as usize >= count) {
                    return Err(EngineError::IndexOutOfRange {
                        mesh: mesh.name.clone(),
                        index: bad,
                        vertex_count: count,
                    });
                }
                if geometry.indices.len() % 3 != 0 {
                    return Err(EngineError::AttributeMismatch {
                        mesh: mesh.name.clone(),
                        message: format!("{} indices is not a triangle list", geometry.indices.len()),
                    });
                }
                if !geometry.normals.is_empty() && geometry.normals.len() != count {
                    return Err(EngineError::AttributeMismatch {
                        mesh: mesh.name.clone(),
                        message: format!("{} normals for {} positions", geometry.normals.len(), count),
                    });
                }
                if !geometry.uvs.is_empty() && geometry.uvs.len() != count {
                    return Err(EngineError::AttributeMismatch {
                        mesh: mesh.name.clone(),
                        message: format!("{} uvs for {} positions", geometry.uvs.len(), count),
                    });
                }
            }
        }

        for node in &self.nodes {
            if let Some(&index) = node.meshes.iter().find(|&&m| m >= self.meshes.len()) {
                return Err(EngineError::DanglingNodeReference {
                    node: node.name.clone(),
                    what: "mesh",
                    index,
                });
            }
            if let Some(&index) = node.children.iter().find(|&&c| c >= self.nodes.len()) {
                return Err(EngineError::DanglingNodeReference {
                    node: node.name.clone(),
                    what: "child node",
                    index,
                });
            }
        }
        if let Some(&index) = self.roots.iter().find(|&&r| r >= self.nodes.len()) {
            return Err(EngineError::DanglingNodeReference {
                node: "<root>".to_string(),
                what: "node",
                index,
            });
        }
        if let Some(index) = self.find_cycle() {
            return Err(EngineError::HierarchyCycle { index });
        }
        Ok(())
    }

    /// Removes the given textures and renumbers every binding.
    ///
    /// Bindings pointing at a removed texture are dropped. Returns the
    /// number of records removed.
    pub fn remove_textures(&mut self, remove: &BTreeSet<usize>) -> usize {
        if remove.is_empty() {
            return 0;
        }
        let mut remap = Vec::with_capacity(self.textures.len());
        let mut next = 0usize;
        for index in 0..self.textures.len() {
            if remove.contains(&index) {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }

        for material in &mut self.materials {
            material.bindings.retain(|_, slot| match slot {
                TextureSlot::Bound(index) => remap.get(*index).copied().flatten().is_some(),
                TextureSlot::Missing(_) => true,
            });
            for slot in material.bindings.values_mut() {
                if let TextureSlot::Bound(index) = slot {
                    if let Some(Some(new_index)) = remap.get(*index) {
                        *index = *new_index;
                    }
                }
            }
        }

        let before = self.textures.len();
        let mut position = 0usize;
        self.textures.retain(|_| {
            let keep = !remove.contains(&position);
            position += 1;
            keep
        });
        before - self.textures.len()
    }

    /// Points every binding of `from` at `to`.
    pub fn repoint_texture(&mut self, from: usize, to: usize) -> usize {
        let mut changed = 0;
        for material in &mut self.materials {
            for slot in material.bindings.values_mut() {
                if *slot == TextureSlot::Bound(from) {
                    *slot = TextureSlot::Bound(to);
                    changed += 1;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quad() -> MeshGeometry {
        MeshGeometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: Vec::new(),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    fn textured_scene() -> SceneModel {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("a", vec![1, 2, 3], "image/png"));
        scene.textures.push(TextureRecord::embedded("b", vec![4, 5, 6], "image/png"));
        scene.textures.push(TextureRecord::embedded("c", vec![7, 8, 9], "image/png"));
        scene.materials.push(
            MaterialRecord::new("m0")
                .with_texture(TextureChannel::BaseColor, 0)
                .with_texture(TextureChannel::Emissive, 0),
        );
        scene.materials.push(MaterialRecord::new("m1").with_texture(TextureChannel::Normal, 2));
        scene
    }

    #[test]
    fn test_refresh_derived() {
        let mesh = MeshRecord::new("quad", quad());
        assert_eq!(mesh.vertex_count, 4);
        assert_eq!(mesh.triangle_count, 2);
        assert!(mesh.flags.has_normals);
        assert!(!mesh.flags.has_tex_coords);
        assert!(mesh.flags.is_manifold);
        assert!(!mesh.flags.is_watertight);
    }

    #[test]
    fn test_mesh_without_geometry_keeps_counts() {
        let mut mesh = MeshRecord::without_geometry("lost", 30, 10);
        mesh.refresh_derived();
        assert_eq!(mesh.vertex_count, 30);
        assert_eq!(mesh.triangle_count, 10);
        assert_eq!(mesh.flags, MeshFlags::default());
    }

    #[test]
    fn test_reference_count_counts_materials_not_channels() {
        let scene = textured_scene();
        assert_eq!(scene.reference_count(0), 1);
        assert_eq!(scene.reference_count(1), 0);
        assert_eq!(scene.reference_count(2), 1);
        assert_eq!(scene.reference_counts(), vec![1, 0, 1]);
    }

    #[test]
    fn test_remove_textures_reindexes_bindings() {
        let mut scene = textured_scene();
        let removed = scene.remove_textures(&BTreeSet::from([1]));
        assert_eq!(removed, 1);
        assert_eq!(scene.textures.len(), 2);
        assert_eq!(scene.materials[1].texture(TextureChannel::Normal), Some(1));
        assert_eq!(scene.textures[1].name, "c");
        assert!(scene.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_dangling_texture() {
        let mut scene = textured_scene();
        scene.materials[0]
            .bindings
            .insert(TextureChannel::Height, TextureSlot::Bound(9));
        assert!(matches!(
            scene.check_invariants(),
            Err(EngineError::DanglingTexture { index: 9, .. })
        ));
    }

    #[test]
    fn test_missing_slot_is_not_dangling() {
        let mut scene = textured_scene();
        scene.materials[0]
            .bindings
            .insert(TextureChannel::Height, TextureSlot::Missing("h.png".into()));
        assert!(scene.check_invariants().is_ok());
    }

    #[test]
    fn test_cycle_detection() {
        let mut scene = SceneModel::new();
        scene.nodes.push(NodeRecord::new("a").with_child(1));
        scene.nodes.push(NodeRecord::new("b").with_child(0));
        scene.roots.push(0);
        assert_eq!(scene.find_cycle(), Some(0));
        assert!(matches!(scene.check_invariants(), Err(EngineError::HierarchyCycle { .. })));
    }

    #[test]
    fn test_hierarchy_depth_and_world_matrices() {
        let mut scene = SceneModel::new();
        let mut child = NodeRecord::new("child");
        child.matrix = glam::Mat4::from_translation(glam::Vec3::new(0.0, 2.0, 0.0)).to_cols_array();
        let mut root = NodeRecord::new("root").with_child(1);
        root.matrix = glam::Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0)).to_cols_array();
        scene.nodes.push(root);
        scene.nodes.push(child);
        scene.roots.push(0);

        assert_eq!(scene.max_hierarchy_depth(), 2);
        let world = scene.world_matrices();
        let translation = world[1].unwrap().w_axis;
        assert_eq!((translation.x, translation.y), (1.0, 2.0));
    }

    #[test]
    fn test_repoint_texture() {
        let mut scene = textured_scene();
        let changed = scene.repoint_texture(0, 1);
        assert_eq!(changed, 2);
        assert_eq!(scene.reference_count(0), 0);
        assert_eq!(scene.reference_count(1), 1);
    }

    #[test]
    fn test_memory_estimate_falls_back_to_bytes() {
        let mut texture = TextureRecord::embedded("x", vec![0; 10], "image/png");
        assert_eq!(texture.memory_estimate(), 10);
        texture.width = 4;
        texture.height = 2;
        assert_eq!(texture.memory_estimate(), 32);
    }
}
