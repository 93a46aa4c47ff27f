//! The application session: the one open scene and the operations on it.
//!
//! The scene sits behind a read/write lock. Statistics, previews,
//! analysis and validation share the read lock; anything that mutates the
//! scene holds the write lock for its whole duration. A `Session` is cheap
//! to clone, so a clone can be moved onto a [`Worker`](crate::worker::Worker).

use crate::error::SessionError;
use crate::optimizer::{self, OptimizationPreview, OptimizationResult, OptimizationSettings};
use crate::recent::RecentFiles;
use crate::textures::{self, RemovalPolicy, TextureAnalysisResult, TextureOperationResult};
use pinnacle_lint::{ModelValidationResult, ValidationOptions, Validator};
use pinnacle_scene::{
    CancellationToken, FileModelLoader, FileModelWriter, ModelFormat, ModelLoader, ModelWriter, OptimizationProfile,
    PerformanceBudget, SceneModel, SceneStatistics, WriteOptions, WriteReport,
};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone)]
pub struct Session {
    scene: Arc<RwLock<Option<SceneModel>>>,
    /// Scene as it was before the last successful optimization.
    undo: Arc<Mutex<Option<SceneModel>>>,
    recent: Arc<Mutex<Option<RecentFiles>>>,
    loader: Arc<dyn ModelLoader>,
    writer: Arc<dyn ModelWriter>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    /// Creates an empty session. Opened files are remembered in `recent`
    /// when given.
    pub fn new(recent: Option<RecentFiles>) -> Self {
        Self::with_io(recent, Arc::new(FileModelLoader), Arc::new(FileModelWriter))
    }

    pub fn with_io(recent: Option<RecentFiles>, loader: Arc<dyn ModelLoader>, writer: Arc<dyn ModelWriter>) -> Self {
        Self {
            scene: Arc::new(RwLock::new(None)),
            undo: Arc::new(Mutex::new(None)),
            recent: Arc::new(Mutex::new(recent)),
            loader,
            writer,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<SceneModel>>, SessionError> {
        self.scene.read().map_err(|_| SessionError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Option<SceneModel>>, SessionError> {
        self.scene.write().map_err(|_| SessionError::Poisoned)
    }

    /// Runs `f` against the open scene under the read lock.
    pub fn with_scene<R>(&self, f: impl FnOnce(&SceneModel) -> R) -> Result<R, SessionError> {
        let guard = self.read()?;
        guard.as_ref().map(f).ok_or(SessionError::NoScene)
    }

    /// Runs `f` against the open scene under the write lock.
    pub fn with_scene_mut<R>(&self, f: impl FnOnce(&mut SceneModel) -> R) -> Result<R, SessionError> {
        let mut guard = self.write()?;
        guard.as_mut().map(f).ok_or(SessionError::NoScene)
    }

    pub fn has_scene(&self) -> bool {
        self.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Loads `path`, replacing the open scene, and remembers it.
    ///
    /// A failure to update the recent-files store is logged, not returned.
    pub fn open(&self, path: &Path) -> Result<(), SessionError> {
        let scene = self.loader.load(path)?;
        log::info!(
            "Opened {} ({} meshes, {} materials, {} textures)",
            path.display(),
            scene.meshes.len(),
            scene.materials.len(),
            scene.textures.len()
        );
        self.replace(scene)?;

        if let Ok(mut recent) = self.recent.lock() {
            if let Some(recent) = recent.as_mut() {
                if let Err(e) = recent.push(path) {
                    log::warn!("Could not update recent files: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Installs an in-memory scene.
    pub fn replace(&self, scene: SceneModel) -> Result<(), SessionError> {
        *self.write()? = Some(scene);
        *self.undo.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }

    pub fn close(&self) -> Result<(), SessionError> {
        *self.write()? = None;
        *self.undo.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }

    /// Copy of the open scene.
    pub fn snapshot(&self) -> Result<SceneModel, SessionError> {
        self.with_scene(SceneModel::clone)
    }

    pub fn recent_files(&self) -> Vec<std::path::PathBuf> {
        self.recent
            .lock()
            .ok()
            .and_then(|r| r.as_ref().map(|r| r.paths().to_vec()))
            .unwrap_or_default()
    }

    pub fn statistics(&self, profile: OptimizationProfile) -> Result<SceneStatistics, SessionError> {
        let budget = PerformanceBudget::for_profile(profile);
        self.with_scene(|scene| SceneStatistics::compute(scene, &budget))
    }

    pub fn preview(&self, settings: &OptimizationSettings) -> Result<OptimizationPreview, SessionError> {
        self.with_scene(|scene| optimizer::preview(scene, settings))
    }

    pub fn analyze_textures(&self) -> Result<TextureAnalysisResult, SessionError> {
        self.with_scene(textures::analyze)
    }

    pub fn validate(
        &self,
        options: &ValidationOptions,
        token: &CancellationToken,
    ) -> Result<ModelValidationResult, SessionError> {
        let guard = self.read()?;
        let scene = guard.as_ref().ok_or(SessionError::NoScene)?;
        let mut validator = Validator::new();
        Ok(validator.validate_with_cancel(scene, options, token)?)
    }

    /// Optimizes the open scene. On success the previous scene becomes the
    /// undo snapshot; on an invariant violation the scene is unchanged.
    pub fn optimize(
        &self,
        settings: &OptimizationSettings,
        token: &CancellationToken,
    ) -> Result<OptimizationResult, SessionError> {
        let mut guard = self.write()?;
        let scene = guard.as_mut().ok_or(SessionError::NoScene)?;
        let before = scene.clone();
        let result = optimizer::optimize(scene, settings, token)?;
        *self.undo.lock().map_err(|_| SessionError::Poisoned)? = Some(before);
        Ok(result)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.lock().map(|u| u.is_some()).unwrap_or(false)
    }

    /// Restores the scene from before the last optimization.
    pub fn undo_optimization(&self) -> Result<(), SessionError> {
        let mut guard = self.write()?;
        if guard.is_none() {
            return Err(SessionError::NoScene);
        }
        let previous = self
            .undo
            .lock()
            .map_err(|_| SessionError::Poisoned)?
            .take()
            .ok_or(SessionError::NothingToUndo)?;
        *guard = Some(previous);
        log::info!("Restored scene from before optimization");
        Ok(())
    }

    pub fn remove_unused_textures(&self, policy: RemovalPolicy) -> Result<TextureOperationResult, SessionError> {
        self.with_scene_mut(|scene| textures::remove_unused_textures(scene, policy))
    }

    pub fn remove_duplicate_textures(&self) -> Result<TextureOperationResult, SessionError> {
        self.with_scene_mut(textures::remove_duplicate_textures)
    }

    /// Writes the open scene to `path`. Holds the write lock so no mutation
    /// interleaves with the export.
    pub fn export(&self, format: ModelFormat, path: &Path, options: &WriteOptions) -> Result<WriteReport, SessionError> {
        let guard = self.write()?;
        let scene = guard.as_ref().ok_or(SessionError::NoScene)?;
        scene.check_invariants()?;
        Ok(self.writer.write(scene, format, path, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Worker;
    use pinnacle_scene::{MaterialRecord, MeshGeometry, MeshRecord, NodeRecord, TextureChannel, TextureRecord};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn quad_soup() -> SceneModel {
        let mut positions = Vec::new();
        for [x, y] in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
            positions.push([x, y, 0.0]);
        }
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("used", vec![1], "image/png"));
        scene.textures.push(TextureRecord::embedded("spare", vec![2], "image/png"));
        scene
            .materials
            .push(MaterialRecord::new("m").with_texture(TextureChannel::BaseColor, 0));
        scene.meshes.push(
            MeshRecord::new(
                "quad",
                MeshGeometry {
                    positions,
                    normals: Vec::new(),
                    uvs: Vec::new(),
                    indices: (0..6).collect(),
                },
            )
            .with_material(0),
        );
        scene.nodes.push(NodeRecord::new("root").with_mesh(0));
        scene.roots.push(0);
        scene
    }

    fn merge_only() -> OptimizationSettings {
        let mut settings = OptimizationSettings::for_profile(OptimizationProfile::Custom);
        settings.merge_duplicate_vertices = true;
        settings
    }

    #[test]
    fn test_operations_need_a_scene() {
        let session = Session::default();
        assert!(matches!(session.statistics(OptimizationProfile::Desktop), Err(SessionError::NoScene)));
        assert!(matches!(session.undo_optimization(), Err(SessionError::NoScene)));
    }

    #[test]
    fn test_optimize_and_undo() {
        let session = Session::default();
        session.replace(quad_soup()).unwrap();
        assert!(!session.can_undo());

        let result = session.optimize(&merge_only(), &CancellationToken::new()).unwrap();
        assert!(result.success);
        assert_eq!(session.statistics(OptimizationProfile::Desktop).unwrap().total_vertices, 4);
        assert!(session.can_undo());

        session.undo_optimization().unwrap();
        assert_eq!(session.snapshot().unwrap(), quad_soup());
        assert!(matches!(session.undo_optimization(), Err(SessionError::NothingToUndo)));
    }

    #[test]
    fn test_texture_cleanup_through_session() {
        let session = Session::default();
        session.replace(quad_soup()).unwrap();
        assert_eq!(session.analyze_textures().unwrap().unused_textures, 1);
        let removed = session.remove_unused_textures(RemovalPolicy::RecordsOnly).unwrap();
        assert_eq!(removed.affected, 1);
        assert_eq!(session.with_scene(|s| s.textures.len()).unwrap(), 1);
    }

    #[test]
    fn test_open_remembers_path() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("tri.obj");
        std::fs::write(&model, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let recent = RecentFiles::with_path(dir.path().join("recent.json")).unwrap();

        let session = Session::new(Some(recent));
        session.open(&model).unwrap();
        assert!(session.has_scene());
        assert_eq!(session.recent_files(), vec![model.clone()]);

        assert!(matches!(
            session.open(&dir.path().join("missing.glb")),
            Err(SessionError::Load(_))
        ));
        assert!(session.has_scene(), "failed open keeps the previous scene");
    }

    #[test]
    fn test_optimize_on_worker() {
        let session = Session::default();
        session.replace(quad_soup()).unwrap();
        let worker_session = session.clone();
        let handle = Worker::spawn("optimize", move |token| worker_session.optimize(&merge_only(), token)).unwrap();
        let result = handle.join().unwrap().unwrap();
        assert!(result.success);
        assert!(session.can_undo());
    }

    #[test]
    fn test_validate_reads_scene() {
        let session = Session::default();
        session.replace(quad_soup()).unwrap();
        let result = session
            .validate(&ValidationOptions::default(), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.counts.total(), result.issues.len());
    }
}
