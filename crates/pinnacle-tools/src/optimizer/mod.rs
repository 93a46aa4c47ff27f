//! The optimizer.
//!
//! Operations run in the fixed order of [`OptimizationOperation::ALL`] on a
//! staged copy of the scene. A stage that fails or panics is rolled back and
//! recorded as a warning; the rest still run. The staged copy replaces the
//! scene only if it passes the invariant check.

mod hierarchy;
mod resize;
mod settings;

pub use hierarchy::{flatten, merge_meshes};
pub use resize::{fitted_dimensions, resized_path};
pub use settings::{OptimizationOperation, OptimizationSettings};

use crate::materials::{auto_fix_materials, validate_materials};
use crate::textures::{remove_duplicate_textures, remove_unused_textures, RemovalPolicy};
use pinnacle_lint::Severity;
use pinnacle_scene::geometry;
use pinnacle_scene::{CancellationToken, EngineError, PerformanceBudget, SceneModel, SceneStatistics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Before/after measurements of an optimization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStatistics {
    pub vertex_count_before: usize,
    pub triangle_count_before: usize,
    pub texture_size_before: u64,
    pub draw_calls_before: usize,

    pub vertex_count_after: usize,
    pub triangle_count_after: usize,
    pub texture_size_after: u64,
    pub draw_calls_after: usize,

    /// Positive when the count went down.
    pub vertex_reduction: i64,
    pub triangle_reduction: i64,
    pub texture_savings: i64,
    pub draw_call_reduction: i64,

    pub vertex_reduction_percent: f64,
    pub triangle_reduction_percent: f64,
    pub texture_savings_percent: f64,
    pub draw_call_reduction_percent: f64,

    pub materials_fixed: usize,
    pub textures_optimized: usize,
    pub meshes_optimized: usize,
    pub duplicates_removed: usize,
}

impl OptimizationStatistics {
    /// Compares two statistics snapshots.
    pub fn between(before: &SceneStatistics, after: &SceneStatistics) -> Self {
        let reduction = |b: u64, a: u64| b as i64 - a as i64;
        let percent = |b: u64, a: u64| {
            if b == 0 {
                0.0
            } else {
                (b as f64 - a as f64) / b as f64 * 100.0
            }
        };
        Self {
            vertex_count_before: before.total_vertices,
            triangle_count_before: before.total_triangles,
            texture_size_before: before.texture_memory,
            draw_calls_before: before.estimated_draw_calls,
            vertex_count_after: after.total_vertices,
            triangle_count_after: after.total_triangles,
            texture_size_after: after.texture_memory,
            draw_calls_after: after.estimated_draw_calls,
            vertex_reduction: reduction(before.total_vertices as u64, after.total_vertices as u64),
            triangle_reduction: reduction(before.total_triangles as u64, after.total_triangles as u64),
            texture_savings: reduction(before.texture_memory, after.texture_memory),
            draw_call_reduction: reduction(before.estimated_draw_calls as u64, after.estimated_draw_calls as u64),
            vertex_reduction_percent: percent(before.total_vertices as u64, after.total_vertices as u64),
            triangle_reduction_percent: percent(before.total_triangles as u64, after.total_triangles as u64),
            texture_savings_percent: percent(before.texture_memory, after.texture_memory),
            draw_call_reduction_percent: percent(
                before.estimated_draw_calls as u64,
                after.estimated_draw_calls as u64,
            ),
            ..Self::default()
        }
    }
}

/// Outcome of [`optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Every enabled operation ran.
    pub success: bool,
    pub statistics: OptimizationStatistics,
    /// Names of operations that ran, in order.
    pub optimizations_applied: Vec<String>,
    /// Skipped or partially applied operations.
    pub warnings: Vec<String>,
    pub cancelled: bool,
    pub processing_time: Duration,
}

/// Outcome of [`preview`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPreview {
    pub predicted_statistics: OptimizationStatistics,
    pub planned_optimizations: Vec<OptimizationOperation>,
    pub estimated_time: Duration,
    /// Problems the real run would report.
    pub warnings: Vec<String>,
}

/// Statistics of the scene under the settings' profile budget.
pub fn analyze_current_state(scene: &SceneModel, settings: &OptimizationSettings) -> SceneStatistics {
    SceneStatistics::compute(scene, &PerformanceBudget::for_profile(settings.profile))
}

/// Predicts what [`optimize`] would do without touching the scene or disk.
///
/// Geometry stages run for real on a copy; texture resizing only updates
/// dimensions.
pub fn preview(scene: &SceneModel, settings: &OptimizationSettings) -> OptimizationPreview {
    let mut staged = scene.clone();
    let outcome = run_stages(&mut staged, settings, &CancellationToken::new(), Mode::Preview);
    let budget = PerformanceBudget::for_profile(settings.profile);
    let before = SceneStatistics::compute(scene, &budget);
    let after = SceneStatistics::compute(&staged, &budget);

    let mut predicted = OptimizationStatistics::between(&before, &after);
    outcome.counters.apply(&mut predicted);

    let resized = if settings.enables(OptimizationOperation::ResizeTextures) {
        scene
            .textures
            .iter()
            .filter(|t| resize::needs_resize(t, settings.max_texture_resolution))
            .count()
    } else {
        0
    };
    let estimated_time =
        Duration::from_micros(before.total_triangles as u64) + Duration::from_millis(20 * resized as u64);

    OptimizationPreview {
        predicted_statistics: predicted,
        planned_optimizations: settings.planned_operations(),
        estimated_time,
        warnings: outcome.warnings,
    }
}

/// Applies the enabled operations to `scene`.
///
/// Returns an error, leaving `scene` untouched, only if the optimized copy
/// violates a scene invariant. Cancellation is checked between operations:
/// completed ones are kept and the rest are reported as skipped.
pub fn optimize(
    scene: &mut SceneModel,
    settings: &OptimizationSettings,
    token: &CancellationToken,
) -> Result<OptimizationResult, EngineError> {
    let start = Instant::now();
    let budget = PerformanceBudget::for_profile(settings.profile);
    let before = SceneStatistics::compute(scene, &budget);

    let mut staged = scene.clone();
    let outcome = run_stages(&mut staged, settings, token, Mode::Apply);

    if let Err(e) = staged.check_invariants() {
        log::warn!("Optimization discarded: {}", e);
        return Err(e);
    }
    *scene = staged;

    let after = SceneStatistics::compute(scene, &budget);
    let mut statistics = OptimizationStatistics::between(&before, &after);
    outcome.counters.apply(&mut statistics);

    let result = OptimizationResult {
        success: outcome.failed.is_empty() && !outcome.cancelled,
        statistics,
        optimizations_applied: outcome.applied.iter().map(|op| op.name().to_string()).collect(),
        warnings: outcome.warnings,
        cancelled: outcome.cancelled,
        processing_time: start.elapsed(),
    };
    log::info!(
        "Optimized with {} profile: {} operation(s), {} warning(s), triangles {} -> {}",
        settings.profile,
        result.optimizations_applied.len(),
        result.warnings.len(),
        result.statistics.triangle_count_before,
        result.statistics.triangle_count_after
    );
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Apply,
    Preview,
}

#[derive(Debug, Default)]
struct Counters {
    materials_fixed: usize,
    textures_optimized: usize,
    meshes_optimized: BTreeSet<String>,
    duplicates_removed: usize,
}

impl Counters {
    fn apply(&self, statistics: &mut OptimizationStatistics) {
        statistics.materials_fixed = self.materials_fixed;
        statistics.textures_optimized = self.textures_optimized;
        statistics.meshes_optimized = self.meshes_optimized.len();
        statistics.duplicates_removed = self.duplicates_removed;
    }
}

#[derive(Debug, Default)]
struct StageOutcome {
    applied: Vec<OptimizationOperation>,
    failed: Vec<OptimizationOperation>,
    warnings: Vec<String>,
    counters: Counters,
    cancelled: bool,
}

fn run_stages(
    scene: &mut SceneModel,
    settings: &OptimizationSettings,
    token: &CancellationToken,
    mode: Mode,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    let planned = settings.planned_operations();

    for (position, op) in planned.iter().enumerate() {
        if token.is_cancelled() {
            outcome.cancelled = true;
            for skipped in &planned[position..] {
                outcome.warnings.push(format!("{}: skipped (cancelled)", skipped));
            }
            log::warn!("Optimization cancelled before {}", op);
            break;
        }

        let mut stage = scene.clone();
        let mut warnings = Vec::new();
        let mut counters = Counters::default();
        let run = catch_unwind(AssertUnwindSafe(|| {
            run_operation(*op, &mut stage, settings, mode, &mut warnings, &mut counters)
        }));

        match run {
            Ok(Ok(())) => {
                *scene = stage;
                outcome.applied.push(*op);
                outcome.counters.materials_fixed += counters.materials_fixed;
                outcome.counters.textures_optimized += counters.textures_optimized;
                outcome.counters.duplicates_removed += counters.duplicates_removed;
                outcome.counters.meshes_optimized.extend(counters.meshes_optimized);
                outcome.warnings.extend(warnings.into_iter().map(|w| format!("{}: {}", op, w)));
            }
            Ok(Err(reason)) => {
                log::warn!("{} failed: {}", op, reason);
                outcome.failed.push(*op);
                outcome.warnings.push(format!("{}: skipped ({})", op, reason));
            }
            Err(_) => {
                log::warn!("{} aborted unexpectedly", op);
                outcome.failed.push(*op);
                outcome.warnings.push(format!("{}: skipped (aborted unexpectedly)", op));
            }
        }
    }
    outcome
}

fn run_operation(
    op: OptimizationOperation,
    scene: &mut SceneModel,
    settings: &OptimizationSettings,
    mode: Mode,
    warnings: &mut Vec<String>,
    counters: &mut Counters,
) -> Result<(), String> {
    match op {
        OptimizationOperation::FixMaterials => {
            counters.materials_fixed = auto_fix_materials(scene);
        }
        OptimizationOperation::ValidateMaterials => {
            let result = validate_materials(scene, settings.target_engine);
            for issue in result.issues.iter().filter(|i| i.severity >= Severity::Warning) {
                warnings.push(format!("material '{}': {}", issue.material_name, issue.message));
            }
        }
        OptimizationOperation::DeduplicateTextures => {
            counters.duplicates_removed = remove_duplicate_textures(scene).affected;
        }
        OptimizationOperation::ResizeTextures => {
            let max = settings.max_texture_resolution;
            for texture in scene.textures.iter_mut().filter(|t| resize::needs_resize(t, max)) {
                match mode {
                    Mode::Preview => resize::estimate_resize(texture, max),
                    Mode::Apply => {
                        if let Err(e) = resize::resize_texture(texture, max) {
                            warnings.push(e);
                            continue;
                        }
                    }
                }
                counters.textures_optimized += 1;
            }
        }
        OptimizationOperation::RemoveUnusedTextures => {
            remove_unused_textures(scene, RemovalPolicy::RecordsOnly);
        }
        OptimizationOperation::RemoveDegenerateTriangles => {
            for_each_geometry(scene, warnings, counters, geometry::remove_degenerate_triangles);
        }
        OptimizationOperation::MergeDuplicateVertices => {
            for_each_geometry(scene, warnings, counters, geometry::merge_duplicate_vertices);
        }
        OptimizationOperation::OptimizeMeshes => {
            for_each_geometry(scene, warnings, counters, geometry::compact_vertices);
            for mesh in &scene.meshes {
                if mesh.vertex_count > settings.max_vertices_per_mesh {
                    warnings.push(format!(
                        "mesh '{}' has {} vertices, above {}",
                        mesh.name, mesh.vertex_count, settings.max_vertices_per_mesh
                    ));
                }
                if mesh.triangle_count > settings.max_triangles_per_mesh {
                    warnings.push(format!(
                        "mesh '{}' has {} triangles, above {}",
                        mesh.name, mesh.triangle_count, settings.max_triangles_per_mesh
                    ));
                }
            }
        }
        OptimizationOperation::FlattenHierarchy => {
            if scene.find_cycle().is_some() {
                return Err("node hierarchy contains a cycle".to_string());
            }
            let removed = hierarchy::flatten(scene);
            log::debug!("Flatten removed {} node(s)", removed);
        }
        OptimizationOperation::OptimizeHierarchy => {
            if scene.find_cycle().is_some() {
                return Err("node hierarchy contains a cycle".to_string());
            }
            let merged = hierarchy::merge_meshes(scene);
            log::debug!("Hierarchy optimization merged away {} mesh(es)", merged);
            if scene.max_hierarchy_depth() > settings.max_hierarchy_depth {
                warnings.push(format!(
                    "hierarchy depth {} exceeds {}",
                    scene.max_hierarchy_depth(),
                    settings.max_hierarchy_depth
                ));
            }
        }
    }
    Ok(())
}

/// Runs a geometry pass over every mesh with usable geometry.
///
/// Meshes without geometry or with out-of-range indices are skipped with
/// one warning per pass.
fn for_each_geometry(
    scene: &mut SceneModel,
    warnings: &mut Vec<String>,
    counters: &mut Counters,
    pass: fn(&mut pinnacle_scene::MeshGeometry) -> usize,
) {
    let mut skipped = Vec::new();
    for mesh in &mut scene.meshes {
        let Some(geometry) = mesh.geometry.as_mut().filter(|g| g.indices_in_range()) else {
            skipped.push(mesh.name.clone());
            continue;
        };
        if pass(geometry) > 0 {
            mesh.refresh_derived();
            counters.meshes_optimized.insert(mesh.name.clone());
        }
    }
    if !skipped.is_empty() {
        warnings.push(format!("skipped {} mesh(es) without usable geometry: {}", skipped.len(), skipped.join(", ")));
    }
}
