//! Mesh topology and attribute rules.
//!
//! Rules that need vertex data skip meshes without geometry; the
//! `mesh/geometry-unavailable` rule reports those meshes once. When no mesh
//! at all has geometry the topology rules fail with
//! [`CheckError::MissingGeometry`].

use crate::report::{MeshValidationResult, Severity, ValidationCategory, ValidationIssue};
use crate::rules::{issue, CheckError, RuleContext, ValidationRule};
use pinnacle_scene::geometry;
use pinnacle_scene::{MeshGeometry, MeshRecord, SceneModel};

/// Meshes that carry geometry, or an error when none does.
fn with_geometry<'a>(scene: &'a SceneModel) -> Result<Vec<(&'a MeshRecord, &'a MeshGeometry)>, CheckError> {
    let meshes: Vec<_> = scene
        .meshes
        .iter()
        .filter_map(|m| m.geometry.as_ref().map(|g| (m, g)))
        .collect();
    if meshes.is_empty() && !scene.meshes.is_empty() {
        return Err(CheckError::MissingGeometry {
            mesh_count: scene.meshes.len(),
        });
    }
    Ok(meshes)
}

/// Per-mesh topology summary used by `validate_mesh` and the result's
/// `mesh_results`.
pub fn mesh_result(scene: &SceneModel, index: usize) -> Option<MeshValidationResult> {
    let mesh = scene.meshes.get(index)?;
    let mut result = MeshValidationResult {
        mesh_index: index,
        mesh_name: mesh.name.clone(),
        vertex_count: mesh.vertex_count,
        triangle_count: mesh.triangle_count,
        has_geometry: mesh.geometry.is_some(),
        has_normals: mesh.flags.has_normals,
        has_tex_coords: mesh.flags.has_tex_coords,
        is_manifold: mesh.flags.is_manifold,
        is_watertight: mesh.flags.is_watertight,
        non_manifold_edges: 0,
        boundary_edges: 0,
        degenerate_triangles: 0,
        duplicate_vertices: 0,
    };
    if let Some(geometry) = &mesh.geometry {
        let edges = geometry::edge_usage(geometry);
        result.non_manifold_edges = geometry::non_manifold_edge_count(&edges);
        result.boundary_edges = geometry::boundary_edge_count(&edges);
        result.degenerate_triangles = geometry::degenerate_triangles(geometry).len();
        result.duplicate_vertices = geometry::duplicate_vertex_count(geometry);
    }
    Some(result)
}

/// Meshes whose vertex buffers could not be read.
pub struct GeometryUnavailableRule;

impl ValidationRule for GeometryUnavailableRule {
    fn id(&self) -> &'static str {
        "mesh/geometry-unavailable"
    }

    fn description(&self) -> &'static str {
        "Reports meshes whose vertex data could not be read"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(ctx
            .scene
            .meshes
            .iter()
            .filter(|m| m.geometry.is_none())
            .map(|m| {
                issue(
                    self,
                    "Geometry unavailable",
                    format!(
                        "Mesh '{}' declares {} vertices but its buffers could not be read; topology checks were skipped",
                        m.name, m.vertex_count
                    ),
                )
                .with_mesh(&m.name)
            })
            .collect())
    }
}

/// Triangle indices pointing past the vertex buffer.
pub struct IndexRangeRule;

impl ValidationRule for IndexRangeRule {
    fn id(&self) -> &'static str {
        "mesh/index-range"
    }

    fn description(&self) -> &'static str {
        "Detects triangle indices outside the vertex buffer"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, geometry) in with_geometry(ctx.scene)? {
            let vertex_count = geometry.vertex_count();
            let bad = geometry.indices.iter().filter(|&&i| i as usize >= vertex_count).count();
            if bad > 0 {
                issues.push(
                    issue(
                        self,
                        "Index out of range",
                        format!(
                            "Mesh '{}' has {} indices beyond its {} vertices",
                            mesh.name, bad, vertex_count
                        ),
                    )
                    .with_mesh(&mesh.name)
                    .with_suggestion("Re-export the mesh; the index buffer is corrupt"),
                );
            }
            if geometry.indices.len() % 3 != 0 {
                issues.push(
                    issue(
                        self,
                        "Incomplete triangle",
                        format!(
                            "Mesh '{}' has {} indices, which is not a multiple of 3",
                            mesh.name,
                            geometry.indices.len()
                        ),
                    )
                    .with_mesh(&mesh.name),
                );
            }
        }
        Ok(issues)
    }
}

/// Detection: welded edge shared by more than 2 triangles.
pub struct NonManifoldRule;

impl ValidationRule for NonManifoldRule {
    fn id(&self) -> &'static str {
        "mesh/non-manifold"
    }

    fn description(&self) -> &'static str {
        "Detects non-manifold edges (edges shared by more than 2 triangles)"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, geometry) in with_geometry(ctx.scene)? {
            let edges = geometry::edge_usage(geometry);
            let count = geometry::non_manifold_edge_count(&edges);
            if count > 0 {
                issues.push(
                    issue(
                        self,
                        "Non-manifold geometry",
                        format!(
                            "Mesh '{}' has {} edge(s) shared by more than 2 triangles",
                            mesh.name, count
                        ),
                    )
                    .with_mesh(&mesh.name)
                    .with_suggestion("Remove duplicate faces or fix mesh topology"),
                );
            }
        }
        Ok(issues)
    }
}

/// Detection: welded edge used by exactly one triangle.
pub struct NotWatertightRule;

impl ValidationRule for NotWatertightRule {
    fn id(&self) -> &'static str {
        "mesh/not-watertight"
    }

    fn description(&self) -> &'static str {
        "Detects open meshes with boundary edges"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, geometry) in with_geometry(ctx.scene)? {
            let edges = geometry::edge_usage(geometry);
            let open = geometry::boundary_edge_count(&edges);
            if open > 0 {
                issues.push(
                    issue(
                        self,
                        "Mesh is not watertight",
                        format!("Mesh '{}' has {} boundary edge(s)", mesh.name, open),
                    )
                    .with_mesh(&mesh.name)
                    .with_suggestion("Close holes if the mesh is used for physics or 3D printing"),
                );
            }
        }
        Ok(issues)
    }
}

pub struct MissingNormalsRule;

impl ValidationRule for MissingNormalsRule {
    fn id(&self) -> &'static str {
        "mesh/missing-normals"
    }

    fn description(&self) -> &'static str {
        "Detects meshes without vertex normals"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        Ok(with_geometry(ctx.scene)?
            .into_iter()
            .filter(|(mesh, _)| !mesh.flags.has_normals)
            .map(|(mesh, _)| {
                issue(
                    self,
                    "Missing normals",
                    format!("Mesh '{}' has no vertex normals; lighting will be flat or undefined", mesh.name),
                )
                .with_mesh(&mesh.name)
                .with_suggestion("Generate smooth normals")
            })
            .collect())
    }
}

/// Missing texture coordinates; a warning when the mesh's material binds
/// textures, info otherwise.
pub struct MissingUvsRule;

impl ValidationRule for MissingUvsRule {
    fn id(&self) -> &'static str {
        "mesh/missing-uvs"
    }

    fn description(&self) -> &'static str {
        "Detects meshes without texture coordinates"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, _) in with_geometry(ctx.scene)? {
            if mesh.flags.has_tex_coords {
                continue;
            }
            let textured = mesh
                .material
                .and_then(|m| ctx.scene.materials.get(m))
                .is_some_and(|m| !m.bindings.is_empty());
            let mut found = issue(
                self,
                "Missing texture coordinates",
                format!("Mesh '{}' has no UV coordinates", mesh.name),
            )
            .with_mesh(&mesh.name);
            if textured {
                found = found.with_suggestion("Unwrap the mesh; its material samples textures");
            } else {
                found.severity = Severity::Info;
            }
            issues.push(found);
        }
        Ok(issues)
    }
}

pub struct DegenerateTrianglesRule;

impl ValidationRule for DegenerateTrianglesRule {
    fn id(&self) -> &'static str {
        "mesh/degenerate-triangles"
    }

    fn description(&self) -> &'static str {
        "Detects zero-area triangles and triangles repeating a vertex"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, geometry) in with_geometry(ctx.scene)? {
            let count = geometry::degenerate_triangles(geometry).len();
            if count > 0 {
                issues.push(
                    issue(
                        self,
                        "Degenerate triangles",
                        format!("Mesh '{}' has {} degenerate triangle(s)", mesh.name, count),
                    )
                    .with_mesh(&mesh.name)
                    .with_suggestion("Enable degenerate triangle removal in the optimizer"),
                );
            }
        }
        Ok(issues)
    }
}

pub struct DuplicateVerticesRule;

impl ValidationRule for DuplicateVerticesRule {
    fn id(&self) -> &'static str {
        "mesh/duplicate-vertices"
    }

    fn description(&self) -> &'static str {
        "Counts vertices identical to an earlier vertex in every attribute"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let mut issues = Vec::new();
        for (mesh, geometry) in with_geometry(ctx.scene)? {
            let count = geometry::duplicate_vertex_count(geometry);
            if count > 0 {
                issues.push(
                    issue(
                        self,
                        "Duplicate vertices",
                        format!(
                            "Mesh '{}' has {} duplicate vertices out of {}",
                            mesh.name,
                            count,
                            geometry.vertex_count()
                        ),
                    )
                    .with_mesh(&mesh.name)
                    .with_suggestion("Enable vertex merging in the optimizer"),
                );
            }
        }
        Ok(issues)
    }
}

/// Uses the declared count, so it also covers meshes without geometry.
pub struct VertexLimitRule;

impl ValidationRule for VertexLimitRule {
    fn id(&self) -> &'static str {
        "mesh/vertex-limit"
    }

    fn description(&self) -> &'static str {
        "Flags meshes above the per-mesh vertex limit"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let limit = ctx.options.max_vertices_per_mesh;
        Ok(ctx
            .scene
            .meshes
            .iter()
            .filter(|m| m.vertex_count > limit)
            .map(|m| {
                issue(
                    self,
                    "Too many vertices",
                    format!("Mesh '{}' has {} vertices (limit {})", m.name, m.vertex_count, limit),
                )
                .with_mesh(&m.name)
                .with_suggestion("Split the mesh or reduce its detail")
            })
            .collect())
    }
}

pub struct TriangleLimitRule;

impl ValidationRule for TriangleLimitRule {
    fn id(&self) -> &'static str {
        "mesh/triangle-limit"
    }

    fn description(&self) -> &'static str {
        "Flags meshes above the per-mesh triangle limit"
    }

    fn category(&self) -> ValidationCategory {
        ValidationCategory::Mesh
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, CheckError> {
        let limit = ctx.options.max_triangles_per_mesh;
        Ok(ctx
            .scene
            .meshes
            .iter()
            .filter(|m| m.triangle_count > limit)
            .map(|m| {
                issue(
                    self,
                    "Too many triangles",
                    format!("Mesh '{}' has {} triangles (limit {})", m.name, m.triangle_count, limit),
                )
                .with_mesh(&m.name)
                .with_suggestion("Decimate the mesh or add LODs")
            })
            .collect())
    }
}

/// Returns this category's rules in execution order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(GeometryUnavailableRule),
        Box::new(IndexRangeRule),
        Box::new(NonManifoldRule),
        Box::new(NotWatertightRule),
        Box::new(MissingNormalsRule),
        Box::new(MissingUvsRule),
        Box::new(DegenerateTrianglesRule),
        Box::new(DuplicateVerticesRule),
        Box::new(VertexLimitRule),
        Box::new(TriangleLimitRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ValidationOptions;
    use crate::test_support::{cube, quad, run, run_with};
    use pinnacle_scene::{MaterialRecord, TextureChannel};

    fn scene_with(geometry: MeshGeometry) -> SceneModel {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::new("mesh", geometry));
        scene
    }

    #[test]
    fn test_closed_cube_is_clean() {
        let scene = scene_with(cube());
        assert!(run(&NonManifoldRule, &scene).is_empty());
        assert!(run(&NotWatertightRule, &scene).is_empty());
        assert!(run(&DegenerateTrianglesRule, &scene).is_empty());
        assert!(run(&IndexRangeRule, &scene).is_empty());
    }

    #[test]
    fn test_open_quad_is_not_watertight() {
        let issues = run(&NotWatertightRule, &scene_with(quad()));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("4 boundary edge"));
        assert_eq!(issues[0].mesh_name.as_deref(), Some("mesh"));
    }

    #[test]
    fn test_non_manifold_fin() {
        let mut geometry = quad();
        geometry.positions.push([0.5, 0.5, 1.0]);
        geometry.normals.push([0.0, 0.0, 1.0]);
        geometry.uvs.push([0.0, 0.0]);
        // A third triangle on the diagonal edge 0-2.
        geometry.indices.extend_from_slice(&[0, 2, 4]);
        let issues = run(&NonManifoldRule, &scene_with(geometry));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_index_range() {
        let mut geometry = quad();
        geometry.indices.extend_from_slice(&[0, 1, 9]);
        let issues = run(&IndexRangeRule, &scene_with(geometry));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_missing_geometry_is_check_error() {
        let mut scene = SceneModel::new();
        scene.meshes.push(MeshRecord::without_geometry("lost", 10, 4));
        let err = run_with(&NonManifoldRule, &scene, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CheckError::MissingGeometry { mesh_count: 1 }));

        let issues = run(&GeometryUnavailableRule, &scene);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_missing_uvs_severity_depends_on_material() {
        let mut scene = scene_with(cube());
        let issues = run(&MissingUvsRule, &scene);
        assert_eq!(issues[0].severity, Severity::Info);

        scene.textures.push(pinnacle_scene::TextureRecord::embedded("t", vec![1], "image/png"));
        scene
            .materials
            .push(MaterialRecord::new("m").with_texture(TextureChannel::BaseColor, 0));
        scene.meshes[0].material = Some(0);
        let issues = run(&MissingUvsRule, &scene);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].suggestion.is_some());
    }

    #[test]
    fn test_missing_normals() {
        assert_eq!(run(&MissingNormalsRule, &scene_with(cube())).len(), 1);
        assert!(run(&MissingNormalsRule, &scene_with(quad())).is_empty());
    }

    #[test]
    fn test_degenerate_and_duplicates() {
        let mut geometry = quad();
        geometry.indices.extend_from_slice(&[0, 0, 1]);
        geometry.positions.push([0.0, 0.0, 0.0]);
        geometry.normals.push([0.0, 0.0, 1.0]);
        geometry.uvs.push([0.0, 0.0]);
        let scene = scene_with(geometry);
        assert_eq!(run(&DegenerateTrianglesRule, &scene).len(), 1);
        let dupes = run(&DuplicateVerticesRule, &scene);
        assert_eq!(dupes.len(), 1);
        assert!(dupes[0].message.contains("1 duplicate"));
    }

    #[test]
    fn test_limits_use_options() {
        let scene = scene_with(cube());
        let options = ValidationOptions {
            max_vertices_per_mesh: 4,
            max_triangles_per_mesh: 6,
            ..Default::default()
        };
        assert_eq!(run_with(&VertexLimitRule, &scene, &options).unwrap().len(), 1);
        assert_eq!(run_with(&TriangleLimitRule, &scene, &options).unwrap().len(), 1);
        assert!(run(&VertexLimitRule, &scene).is_empty());
    }

    #[test]
    fn test_mesh_result() {
        let scene = scene_with(quad());
        let result = mesh_result(&scene, 0).unwrap();
        assert_eq!(result.boundary_edges, 4);
        assert_eq!(result.non_manifold_edges, 0);
        assert!(result.has_normals);
        assert!(mesh_result(&scene, 1).is_none());
    }
}
