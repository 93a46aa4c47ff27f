//! Shared mesh utilities used by the validator, the optimizer and the
//! converter.
//!
//! Topology queries work on welded positions: two vertices at the same
//! quantized position are the same topological vertex even if their normals
//! or UVs differ, so UV seams do not break watertightness.

use crate::scene::MeshGeometry;
use std::collections::HashMap;

/// Quantization step for vertex comparison.
pub const WELD_EPSILON: f32 = 1e-6;

/// Triangles with an area below this are degenerate.
pub const DEGENERATE_AREA: f32 = 1e-12;

/// Map from undirected edge to the number of triangles using it.
pub type EdgeUsage = HashMap<(u32, u32), u32>;

fn quantize(value: f32) -> i64 {
    (value / WELD_EPSILON).round() as i64
}

fn position_key(p: [f32; 3]) -> [i64; 3] {
    [quantize(p[0]), quantize(p[1]), quantize(p[2])]
}

/// Area of a triangle.
pub fn triangle_area(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> f32 {
    let a = glam::Vec3::from(a);
    let ab = glam::Vec3::from(b) - a;
    let ac = glam::Vec3::from(c) - a;
    ab.cross(ac).length() * 0.5
}

/// Maps every vertex to the first vertex sharing its quantized position.
pub fn welded_position_ids(geometry: &MeshGeometry) -> Vec<u32> {
    let mut first: HashMap<[i64; 3], u32> = HashMap::with_capacity(geometry.positions.len());
    geometry
        .positions
        .iter()
        .enumerate()
        .map(|(i, &p)| *first.entry(position_key(p)).or_insert(i as u32))
        .collect()
}

/// Counts how many triangles use each welded edge.
///
/// Triangles with out-of-range indices or collapsed edges are ignored.
pub fn edge_usage(geometry: &MeshGeometry) -> EdgeUsage {
    let ids = welded_position_ids(geometry);
    let mut edges = EdgeUsage::new();
    for tri in geometry.triangles() {
        let Some(w) = weld_triangle(&ids, tri) else {
            continue;
        };
        for (a, b) in [(w[0], w[1]), (w[1], w[2]), (w[2], w[0])] {
            if a == b {
                continue;
            }
            let edge = if a < b { (a, b) } else { (b, a) };
            *edges.entry(edge).or_insert(0) += 1;
        }
    }
    edges
}

fn weld_triangle(ids: &[u32], tri: [u32; 3]) -> Option<[u32; 3]> {
    Some([
        *ids.get(tri[0] as usize)?,
        *ids.get(tri[1] as usize)?,
        *ids.get(tri[2] as usize)?,
    ])
}

/// No edge is shared by more than two triangles.
pub fn is_manifold(edges: &EdgeUsage) -> bool {
    edges.values().all(|&count| count <= 2)
}

/// Every edge is shared by exactly two triangles.
pub fn is_watertight(edges: &EdgeUsage) -> bool {
    !edges.is_empty() && edges.values().all(|&count| count == 2)
}

/// Number of edges used by more than two triangles.
pub fn non_manifold_edge_count(edges: &EdgeUsage) -> usize {
    edges.values().filter(|&&count| count > 2).count()
}

/// Number of edges used by exactly one triangle.
pub fn boundary_edge_count(edges: &EdgeUsage) -> usize {
    edges.values().filter(|&&count| count == 1).count()
}

/// Indices of triangles that repeat a vertex or have near-zero area.
pub fn degenerate_triangles(geometry: &MeshGeometry) -> Vec<usize> {
    let ids = welded_position_ids(geometry);
    geometry
        .triangles()
        .enumerate()
        .filter(|(_, tri)| is_degenerate(geometry, &ids, *tri))
        .map(|(i, _)| i)
        .collect()
}

fn is_degenerate(geometry: &MeshGeometry, ids: &[u32], tri: [u32; 3]) -> bool {
    let Some(w) = weld_triangle(ids, tri) else {
        return false;
    };
    if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
        return true;
    }
    let p = &geometry.positions;
    triangle_area(p[tri[0] as usize], p[tri[1] as usize], p[tri[2] as usize]) < DEGENERATE_AREA
}

/// Removes degenerate triangles and returns how many were dropped.
pub fn remove_degenerate_triangles(geometry: &mut MeshGeometry) -> usize {
    let ids = welded_position_ids(geometry);
    let before = geometry.triangle_count();
    let kept: Vec<u32> = geometry
        .triangles()
        .filter(|tri| !is_degenerate(geometry, &ids, *tri))
        .flatten()
        .collect();
    geometry.indices = kept;
    before - geometry.triangle_count()
}

type VertexKey = ([i64; 3], Option<[i64; 3]>, Option<[i64; 2]>);

fn vertex_key(geometry: &MeshGeometry, i: usize) -> VertexKey {
    let normal = geometry.normals.get(i).map(|n| position_key(*n));
    let uv = geometry.uvs.get(i).map(|t| [quantize(t[0]), quantize(t[1])]);
    (position_key(geometry.positions[i]), normal, uv)
}

/// Number of vertices whose every attribute matches an earlier vertex.
pub fn duplicate_vertex_count(geometry: &MeshGeometry) -> usize {
    let mut seen: HashMap<VertexKey, ()> = HashMap::with_capacity(geometry.positions.len());
    (0..geometry.positions.len())
        .filter(|&i| seen.insert(vertex_key(geometry, i), ()).is_some())
        .count()
}

/// Merges vertices with identical attributes and returns how many
/// vertices were removed. Triangle count is unchanged.
pub fn merge_duplicate_vertices(geometry: &mut MeshGeometry) -> usize {
    let before = geometry.vertex_count();
    let mut canonical: HashMap<VertexKey, u32> = HashMap::with_capacity(before);
    let remap: Vec<u32> = (0..before)
        .map(|i| *canonical.entry(vertex_key(geometry, i)).or_insert(i as u32))
        .collect();
    for index in &mut geometry.indices {
        if let Some(&target) = remap.get(*index as usize) {
            *index = target;
        }
    }
    compact_vertices(geometry);
    before - geometry.vertex_count()
}

/// Drops unreferenced vertices and renumbers the rest in first-use order.
///
/// Running it twice changes nothing the second time. Returns the number of
/// vertices removed.
pub fn compact_vertices(geometry: &mut MeshGeometry) -> usize {
    let before = geometry.vertex_count();
    let mut remap: Vec<Option<u32>> = vec![None; before];
    let mut order: Vec<usize> = Vec::with_capacity(before);
    for index in &mut geometry.indices {
        let old = *index as usize;
        if old >= before {
            continue;
        }
        let new = *remap[old].get_or_insert_with(|| {
            order.push(old);
            (order.len() - 1) as u32
        });
        *index = new;
    }

    geometry.positions = order.iter().map(|&i| geometry.positions[i]).collect();
    if geometry.normals.len() == before {
        geometry.normals = order.iter().map(|&i| geometry.normals[i]).collect();
    }
    if geometry.uvs.len() == before {
        geometry.uvs = order.iter().map(|&i| geometry.uvs[i]).collect();
    }
    before - geometry.vertex_count()
}

/// Replaces normals with area-weighted smooth vertex normals.
pub fn generate_normals(geometry: &mut MeshGeometry) {
    let mut normals = vec![glam::Vec3::ZERO; geometry.positions.len()];
    for tri in geometry.triangles() {
        let [a, b, c] = tri.map(|i| i as usize);
        if a >= normals.len() || b >= normals.len() || c >= normals.len() {
            continue;
        }
        let pa = glam::Vec3::from(geometry.positions[a]);
        let face = (glam::Vec3::from(geometry.positions[b]) - pa).cross(glam::Vec3::from(geometry.positions[c]) - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    geometry.normals = normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(glam::Vec3::Y).to_array())
        .collect();
}

/// Transforms positions and normals by a matrix.
pub fn transform(geometry: &mut MeshGeometry, matrix: glam::Mat4) {
    let normal_matrix = glam::Mat3::from_mat4(matrix).inverse().transpose();
    for p in &mut geometry.positions {
        *p = matrix.transform_point3(glam::Vec3::from(*p)).to_array();
    }
    for n in &mut geometry.normals {
        *n = (normal_matrix * glam::Vec3::from(*n))
            .try_normalize()
            .unwrap_or(glam::Vec3::Y)
            .to_array();
    }
    if matrix.determinant() < 0.0 {
        flip_winding(geometry);
    }
}

/// Reverses triangle winding order.
pub fn flip_winding(geometry: &mut MeshGeometry) {
    for tri in geometry.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

/// Appends `other` to `target`, offsetting its indices.
///
/// Attributes present on only one side are dropped from the result.
pub fn append(target: &mut MeshGeometry, other: &MeshGeometry) {
    let offset = target.positions.len() as u32;
    let keep_normals = target.normals.len() == target.positions.len() && other.normals.len() == other.positions.len();
    let keep_uvs = target.uvs.len() == target.positions.len() && other.uvs.len() == other.positions.len();
    target.positions.extend_from_slice(&other.positions);
    if keep_normals {
        target.normals.extend_from_slice(&other.normals);
    } else {
        target.normals.clear();
    }
    if keep_uvs {
        target.uvs.extend_from_slice(&other.uvs);
    } else {
        target.uvs.clear();
    }
    target.indices.extend(other.indices.iter().map(|i| i + offset));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> MeshGeometry {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        MeshGeometry {
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            indices,
        }
    }

    #[test]
    fn test_cube_is_watertight() {
        let edges = edge_usage(&cube());
        assert!(is_manifold(&edges));
        assert!(is_watertight(&edges));
        assert_eq!(boundary_edge_count(&edges), 0);
    }

    #[test]
    fn test_open_cube_is_not_watertight() {
        let mut geometry = cube();
        geometry.indices.truncate(30);
        let edges = edge_usage(&geometry);
        assert!(is_manifold(&edges));
        assert!(!is_watertight(&edges));
        assert_eq!(boundary_edge_count(&edges), 4);
    }

    #[test]
    fn test_fan_edge_is_non_manifold() {
        let geometry = MeshGeometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: vec![0, 1, 2, 0, 1, 3, 0, 1, 4],
        };
        let edges = edge_usage(&geometry);
        assert!(!is_manifold(&edges));
        assert_eq!(non_manifold_edge_count(&edges), 1);
    }

    #[test]
    fn test_seam_vertices_still_watertight() {
        let mut geometry = cube();
        // Split vertex 0 into a seam copy used by the left face.
        geometry.positions.push([0.0, 0.0, 0.0]);
        for i in 24..30 {
            if geometry.indices[i] == 0 {
                geometry.indices[i] = 8;
            }
        }
        assert!(is_watertight(&edge_usage(&geometry)));
    }

    #[test]
    fn test_remove_degenerate_triangles() {
        let mut geometry = cube();
        geometry.indices.extend_from_slice(&[0, 0, 1, 0, 1, 2]);
        geometry.positions.push([0.5, 0.0, 0.0]);
        geometry.indices.extend_from_slice(&[0, 1, 8]);
        assert_eq!(degenerate_triangles(&geometry), vec![12, 14]);
        assert_eq!(remove_degenerate_triangles(&mut geometry), 2);
        assert_eq!(geometry.triangle_count(), 13);
    }

    #[test]
    fn test_merge_duplicates_keeps_triangles() {
        let mut geometry = cube();
        geometry.positions.push([1.0, 1.0, 1.0]);
        geometry.indices[8] = 8; // front face now uses a copy of vertex 6
        assert_eq!(duplicate_vertex_count(&geometry), 1);
        let removed = merge_duplicate_vertices(&mut geometry);
        assert_eq!(removed, 1);
        assert_eq!(geometry.vertex_count(), 8);
        assert_eq!(geometry.triangle_count(), 12);
        assert_eq!(duplicate_vertex_count(&geometry), 0);
    }

    #[test]
    fn test_different_uvs_are_not_duplicates() {
        let geometry = MeshGeometry {
            positions: vec![[0.0; 3], [0.0; 3]],
            normals: Vec::new(),
            uvs: vec![[0.0, 0.0], [1.0, 0.0]],
            indices: Vec::new(),
        };
        assert_eq!(duplicate_vertex_count(&geometry), 0);
    }

    #[test]
    fn test_compact_is_idempotent() {
        let mut geometry = cube();
        geometry.positions.push([5.0, 5.0, 5.0]);
        assert_eq!(compact_vertices(&mut geometry), 1);
        let snapshot = geometry.clone();
        assert_eq!(compact_vertices(&mut geometry), 0);
        assert_eq!(geometry, snapshot);
    }

    #[test]
    fn test_generate_normals_unit_length() {
        let mut geometry = cube();
        generate_normals(&mut geometry);
        assert_eq!(geometry.normals.len(), 8);
        for n in &geometry.normals {
            let len = glam::Vec3::from(*n).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mirror_transform_flips_winding() {
        let mut geometry = cube();
        let first = [geometry.indices[0], geometry.indices[1], geometry.indices[2]];
        transform(&mut geometry, glam::Mat4::from_scale(glam::Vec3::new(-1.0, 1.0, 1.0)));
        assert_eq!(geometry.indices[0..3], [first[0], first[2], first[1]]);
        assert_eq!(geometry.positions[1], [-1.0, 0.0, 0.0]);
    }
}
