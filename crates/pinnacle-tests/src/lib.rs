//! Pinnacle end-to-end test infrastructure.
//!
//! Scene and file fixtures shared by the integration tests in `tests/`:
//!
//! - `batch_conversion`: batch classification, progress and cancellation
//! - `texture_cleanup`: unused and duplicate texture removal
//! - `optimization`: profiles, merging and idempotence
//! - `validation`: the rule catalog over real files
//! - `proptest_scene`: reference-count and severity-count properties
//!
//! ```bash
//! cargo test -p pinnacle-tests
//! ```

use pinnacle_scene::{
    FileModelWriter, MaterialRecord, MeshGeometry, MeshRecord, ModelFormat, ModelWriter, NodeRecord, SceneModel,
    TextureChannel, TextureRecord, WriteOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

/// A single right triangle in OBJ form.
pub const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

/// `triangles` disjoint triangles where the first vertex of triangles
/// 1..=`duplicates` repeats the second vertex of the triangle before it.
///
/// No triangle is degenerate, so merging removes exactly `duplicates`
/// vertices and no triangles.
pub fn soup_with_duplicates(triangles: usize, duplicates: usize) -> MeshGeometry {
    let mut positions = Vec::with_capacity(triangles * 3);
    for i in 0..triangles {
        let x = i as f32;
        let first = if i >= 1 && i <= duplicates {
            [x - 1.0, 1.0, 0.0]
        } else {
            [x, 0.0, 0.0]
        };
        positions.push(first);
        positions.push([x, 1.0, 0.0]);
        positions.push([x + 0.5, 0.5, 1.0]);
    }
    MeshGeometry {
        indices: (0..positions.len() as u32).collect(),
        positions,
        normals: Vec::new(),
        uvs: Vec::new(),
    }
}

/// One mesh under one root node, with a single plain material.
pub fn single_mesh_scene(geometry: MeshGeometry) -> SceneModel {
    let mut scene = SceneModel::new();
    scene.materials.push(MaterialRecord::new("paint"));
    scene.meshes.push(MeshRecord::new("mesh", geometry).with_material(0));
    scene.nodes.push(NodeRecord::new("root").with_mesh(0));
    scene.roots.push(0);
    scene
}

/// Unit quad with normals and UVs.
pub fn quad() -> MeshGeometry {
    MeshGeometry {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, bytes).expect("Failed to write fixture file");
    path
}

/// Writes `scene` as a model file of `format`.
pub fn write_model(scene: &SceneModel, format: ModelFormat, path: &Path) -> PathBuf {
    FileModelWriter
        .write(scene, format, path, &WriteOptions::default())
        .expect("Failed to write fixture model");
    path.to_path_buf()
}

/// A scene with four file textures in `dir`:
///
/// - `wood.png` and `wood_copy.png` have identical bytes and are bound by
///   materials 0 and 1 respectively
/// - `stone.png` is bound by material 1
/// - `orphan.png` is bound by nothing
pub fn textured_scene(dir: &Path) -> SceneModel {
    let wood = b"not really a png, but stable bytes".to_vec();
    let mut scene = single_mesh_scene(quad());
    scene.source_path = Some(dir.join("scene.gltf"));
    scene.format = ModelFormat::Gltf;

    for (name, bytes) in [
        ("wood.png", wood.clone()),
        ("wood_copy.png", wood),
        ("stone.png", b"stone".to_vec()),
        ("orphan.png", b"orphan".to_vec()),
    ] {
        let path = write_file(dir, name, &bytes);
        scene.textures.push(TextureRecord::from_file(path));
    }

    scene.materials[0] = MaterialRecord::new("paint").with_texture(TextureChannel::BaseColor, 0);
    scene.materials.push(
        MaterialRecord::new("trim")
            .with_texture(TextureChannel::BaseColor, 1)
            .with_texture(TextureChannel::Normal, 2),
    );
    scene
}
