//! Node hierarchy flattening and mesh merging.

use pinnacle_scene::geometry;
use pinnacle_scene::{MeshRecord, NodeRecord, SceneModel};
use std::collections::{BTreeMap, BTreeSet};

/// Makes every mesh-bearing node a root carrying its world matrix and drops
/// mesh-less nodes. Returns the number of nodes removed.
///
/// Nodes unreachable from the roots are dropped with their meshes left
/// uninstanced.
pub fn flatten(scene: &mut SceneModel) -> usize {
    let world = scene.world_matrices();
    let before = scene.nodes.len();
    let nodes: Vec<NodeRecord> = scene
        .nodes
        .iter()
        .zip(world)
        .filter(|(node, _)| !node.meshes.is_empty())
        .filter_map(|(node, matrix)| {
            matrix.map(|m| NodeRecord {
                name: node.name.clone(),
                meshes: node.meshes.clone(),
                children: Vec::new(),
                matrix: m.to_cols_array(),
            })
        })
        .collect();
    scene.roots = (0..nodes.len()).collect();
    scene.nodes = nodes;
    before - scene.nodes.len()
}

/// Merges meshes that are instanced exactly once and share a material and
/// vertex layout into one world-space mesh under a new root node.
///
/// Returns the number of meshes removed.
pub fn merge_meshes(scene: &mut SceneModel) -> usize {
    let world = scene.world_matrices();
    let instances = scene.mesh_instance_counts();

    // mesh index -> (owning node, world matrix)
    let mut placement = BTreeMap::new();
    for (node_index, node) in scene.nodes.iter().enumerate() {
        let Some(matrix) = world[node_index] else { continue };
        for &mesh in &node.meshes {
            if instances.get(mesh) == Some(&1) {
                placement.insert(mesh, (node_index, matrix));
            }
        }
    }

    let mut groups: BTreeMap<(Option<usize>, bool, bool), Vec<usize>> = BTreeMap::new();
    for &mesh_index in placement.keys() {
        let mesh = &scene.meshes[mesh_index];
        let Some(geometry) = &mesh.geometry else { continue };
        if !geometry.indices_in_range() {
            continue;
        }
        let key = (
            mesh.material,
            geometry.normals.len() == geometry.positions.len() && !geometry.normals.is_empty(),
            geometry.uvs.len() == geometry.positions.len() && !geometry.uvs.is_empty(),
        );
        groups.entry(key).or_default().push(mesh_index);
    }

    let mut removed = BTreeSet::new();
    let mut added = 0usize;
    for ((material, _, _), members) in groups {
        if members.len() < 2 {
            continue;
        }
        let mut merged = pinnacle_scene::MeshGeometry::default();
        for &mesh_index in &members {
            let (node_index, matrix) = placement[&mesh_index];
            if let Some(geometry) = &scene.meshes[mesh_index].geometry {
                let mut baked = geometry.clone();
                geometry::transform(&mut baked, matrix);
                if merged.positions.is_empty() {
                    merged = baked;
                } else {
                    geometry::append(&mut merged, &baked);
                }
            }
            scene.nodes[node_index].meshes.retain(|&m| m != mesh_index);
            removed.insert(mesh_index);
        }

        let label = material
            .and_then(|m| scene.materials.get(m))
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "default".to_string());
        let mut mesh = MeshRecord::new(format!("merged_{label}"), merged);
        mesh.material = material;
        scene.meshes.push(mesh);
        let node = NodeRecord::new(format!("merged_{label}")).with_mesh(scene.meshes.len() - 1);
        scene.nodes.push(node);
        scene.roots.push(scene.nodes.len() - 1);
        added += 1;
        log::debug!("Merged {} meshes into 'merged_{}'", members.len(), label);
    }

    remove_meshes(scene, &removed);
    removed.len() - added
}

/// Removes meshes and renumbers node references.
fn remove_meshes(scene: &mut SceneModel, remove: &BTreeSet<usize>) {
    if remove.is_empty() {
        return;
    }
    let mut remap = Vec::with_capacity(scene.meshes.len());
    let mut next = 0usize;
    for index in 0..scene.meshes.len() {
        if remove.contains(&index) {
            remap.push(None);
        } else {
            remap.push(Some(next));
            next += 1;
        }
    }
    for node in &mut scene.nodes {
        node.meshes = node.meshes.iter().filter_map(|&m| remap.get(m).copied().flatten()).collect();
    }
    let mut position = 0usize;
    scene.meshes.retain(|_| {
        let keep = !remove.contains(&position);
        position += 1;
        keep
    });
}
