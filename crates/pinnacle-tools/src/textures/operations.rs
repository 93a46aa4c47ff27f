//! Mutating texture operations.
//!
//! Every operation here changes the scene and invalidates earlier
//! [`TextureAnalysisResult`](super::TextureAnalysisResult) snapshots.

use super::analyzer::analyze;
use crate::error::TextureError;
use pinnacle_scene::{SceneModel, TextureRecord, TextureSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What `remove_unused_textures` deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Drop the records and re-index bindings; files stay on disk.
    #[default]
    RecordsOnly,
    /// Also delete each removed record's file unless a remaining record
    /// still points at it. Not reversible.
    RecordsAndFiles,
}

/// Outcome of a texture operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureOperationResult {
    /// Records removed, repointed or fixed.
    pub affected: usize,
    /// Estimated texture memory before the operation.
    pub size_before: u64,
    /// Estimated texture memory after the operation.
    pub size_after: u64,
    pub warnings: Vec<String>,
}

impl TextureOperationResult {
    pub fn bytes_saved(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }
}

fn texture_memory(scene: &SceneModel) -> u64 {
    scene.textures.iter().map(TextureRecord::memory_estimate).sum()
}

/// Removes every texture no material references.
pub fn remove_unused_textures(scene: &mut SceneModel, policy: RemovalPolicy) -> TextureOperationResult {
    let size_before = texture_memory(scene);
    let unused: BTreeSet<usize> = scene
        .reference_counts()
        .into_iter()
        .enumerate()
        .filter(|(_, count)| *count == 0)
        .map(|(index, _)| index)
        .collect();

    let doomed_files: Vec<PathBuf> = unused
        .iter()
        .filter_map(|&i| scene.textures[i].path().map(Path::to_path_buf))
        .collect();

    let affected = scene.remove_textures(&unused);
    let mut warnings = Vec::new();

    if policy == RemovalPolicy::RecordsAndFiles {
        let still_used: BTreeSet<&Path> = scene.textures.iter().filter_map(TextureRecord::path).collect();
        let mut seen = BTreeSet::new();
        for path in &doomed_files {
            if still_used.contains(path.as_path()) || !seen.insert(path.clone()) || !path.is_file() {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => log::info!("Deleted unused texture file {}", path.display()),
                Err(e) => {
                    let message = format!("Failed to delete {}: {}", path.display(), e);
                    log::warn!("{}", message);
                    warnings.push(message);
                }
            }
        }
    }

    log::info!("Removed {} unused texture(s)", affected);
    TextureOperationResult {
        affected,
        size_before,
        size_after: texture_memory(scene),
        warnings,
    }
}

/// Collapses each group of byte-identical textures onto its lowest index.
///
/// Materials bound to a redundant copy are repointed to the canonical
/// texture before the copies are dropped.
pub fn remove_duplicate_textures(scene: &mut SceneModel) -> TextureOperationResult {
    let size_before = texture_memory(scene);
    let sets = analyze(scene).duplicate_sets;

    let mut redundant = BTreeSet::new();
    for set in &sets {
        let canonical = set[0];
        for &copy in &set[1..] {
            let rebound = scene.repoint_texture(copy, canonical);
            log::debug!(
                "Repointed {} binding(s) from '{}' to '{}'",
                rebound,
                scene.textures[copy].name,
                scene.textures[canonical].name
            );
            redundant.insert(copy);
        }
    }

    let affected = scene.remove_textures(&redundant);
    log::info!("Removed {} duplicate texture(s) in {} group(s)", affected, sets.len());
    TextureOperationResult {
        affected,
        size_before,
        size_after: texture_memory(scene),
        warnings: Vec::new(),
    }
}

/// Points texture `index` at a new file, keeping its name.
pub fn fix_texture_path(scene: &mut SceneModel, index: usize, path: &Path) -> Result<(), TextureError> {
    let count = scene.textures.len();
    let texture = scene
        .textures
        .get_mut(index)
        .ok_or(TextureError::NotFound { index, count })?;
    if !path.is_file() {
        return Err(TextureError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let name = std::mem::take(&mut texture.name);
    *texture = TextureRecord::from_file(path);
    texture.name = name;

    for material in &mut scene.materials {
        for slot in material.bindings.values_mut() {
            if let TextureSlot::Missing(uri) = slot {
                if file_name_matches(Path::new(uri.as_str()), path) {
                    *slot = TextureSlot::Bound(index);
                }
            }
        }
    }
    log::info!("Texture {} now points at {}", index, path.display());
    Ok(())
}

/// Finds a file named `name` under `dir`, ignoring ASCII case.
///
/// Only the file name of `name` is compared, so a stale absolute path works
/// as the search key.
pub fn search_for_missing_texture(name: &str, dir: &Path, recursive: bool) -> Option<PathBuf> {
    let wanted = Path::new(name).file_name()?.to_string_lossy().to_ascii_lowercase();
    let walker = WalkDir::new(dir)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();
    walker
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_string_lossy().to_ascii_lowercase() == wanted)
        .map(|entry| entry.into_path())
}

/// Searches `base_dir` recursively for every missing file texture.
///
/// `affected` counts the textures relinked; each texture still missing adds
/// a warning.
pub fn fix_all_texture_paths(scene: &mut SceneModel, base_dir: &Path) -> TextureOperationResult {
    let size_before = texture_memory(scene);
    let mut affected = 0;
    let mut warnings = Vec::new();

    let missing: Vec<(usize, PathBuf)> = scene
        .textures
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.exists())
        .filter_map(|(i, t)| t.path().map(|p| (i, p.to_path_buf())))
        .collect();

    for (index, old_path) in missing {
        let key = old_path.to_string_lossy().into_owned();
        match search_for_missing_texture(&key, base_dir, true) {
            Some(found) => match fix_texture_path(scene, index, &found) {
                Ok(()) => affected += 1,
                Err(e) => warnings.push(e.to_string()),
            },
            None => {
                let message = format!(
                    "Could not find '{}' under {}",
                    old_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    base_dir.display()
                );
                log::warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    TextureOperationResult {
        affected,
        size_before,
        size_after: texture_memory(scene),
        warnings,
    }
}

fn file_name_matches(a: &Path, b: &Path) -> bool {
    match (a.file_name(), b.file_name()) {
        (Some(a), Some(b)) => a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnacle_scene::{MaterialRecord, TextureChannel};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn scene() -> SceneModel {
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::embedded("a", vec![1, 2, 3], "image/png"));
        scene.textures.push(TextureRecord::embedded("unused", vec![5, 5], "image/png"));
        scene.textures.push(TextureRecord::embedded("a_copy", vec![1, 2, 3], "image/png"));
        scene.textures.push(TextureRecord::embedded("n", vec![7], "image/png"));
        scene
            .materials
            .push(MaterialRecord::new("m0").with_texture(TextureChannel::BaseColor, 0));
        scene.materials.push(
            MaterialRecord::new("m1")
                .with_texture(TextureChannel::BaseColor, 2)
                .with_texture(TextureChannel::Normal, 3),
        );
        scene
    }

    #[test]
    fn test_remove_unused_reindexes() {
        let mut scene = scene();
        let result = remove_unused_textures(&mut scene, RemovalPolicy::RecordsOnly);
        assert_eq!(result.affected, 1);
        assert_eq!(result.bytes_saved(), 2);
        assert_eq!(scene.textures.len(), 3);
        assert_eq!(scene.materials[1].texture(TextureChannel::BaseColor), Some(1));
        assert_eq!(scene.materials[1].texture(TextureChannel::Normal), Some(2));
        assert!(scene.check_invariants().is_ok());

        let again = remove_unused_textures(&mut scene, RemovalPolicy::RecordsOnly);
        assert_eq!(again.affected, 0);
    }

    #[test]
    fn test_remove_unused_deletes_files() {
        let dir = tempdir().unwrap();
        let orphan = dir.path().join("orphan.png");
        let kept = dir.path().join("kept.png");
        std::fs::write(&orphan, b"orphan").unwrap();
        std::fs::write(&kept, b"kept").unwrap();

        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::from_file(&orphan));
        scene.textures.push(TextureRecord::from_file(&kept));
        scene
            .materials
            .push(MaterialRecord::new("m").with_texture(TextureChannel::BaseColor, 1));

        let result = remove_unused_textures(&mut scene, RemovalPolicy::RecordsAndFiles);
        assert_eq!(result.affected, 1);
        assert!(result.warnings.is_empty());
        assert!(!orphan.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_records_only_keeps_files() {
        let dir = tempdir().unwrap();
        let orphan = dir.path().join("orphan.png");
        std::fs::write(&orphan, b"orphan").unwrap();
        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::from_file(&orphan));
        remove_unused_textures(&mut scene, RemovalPolicy::RecordsOnly);
        assert!(scene.textures.is_empty());
        assert!(orphan.exists());
    }

    #[test]
    fn test_remove_duplicates_repoints() {
        let mut scene = scene();
        let before = scene.reference_count(0) + scene.reference_count(2);
        let result = remove_duplicate_textures(&mut scene);
        assert_eq!(result.affected, 1);
        assert_eq!(scene.textures.len(), 3);
        assert_eq!(scene.reference_count(0), before);
        assert_eq!(scene.materials[1].texture(TextureChannel::BaseColor), Some(0));
        assert_eq!(scene.materials[1].texture(TextureChannel::Normal), Some(2));
        assert!(scene.check_invariants().is_ok());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("textures").join("wood");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("Albedo.PNG"), b"x").unwrap();

        let found = search_for_missing_texture("/old/place/albedo.png", dir.path(), true);
        assert_eq!(found, Some(nested.join("Albedo.PNG")));
        assert_eq!(search_for_missing_texture("albedo.png", dir.path(), false), None);
    }

    #[test]
    fn test_fix_texture_path_errors() {
        let mut scene = scene();
        assert!(matches!(
            fix_texture_path(&mut scene, 9, Path::new("x.png")),
            Err(TextureError::NotFound { index: 9, count: 4 })
        ));
        assert!(matches!(
            fix_texture_path(&mut scene, 0, Path::new("/nonexistent/x.png")),
            Err(TextureError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_fix_all_texture_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("maps")).unwrap();
        let real = dir.path().join("maps").join("wood.png");
        std::fs::write(&real, b"wood").unwrap();

        let mut scene = SceneModel::new();
        scene.textures.push(TextureRecord::from_file("/moved/away/wood.png"));
        scene.textures.push(TextureRecord::from_file("/moved/away/metal.png"));

        let result = fix_all_texture_paths(&mut scene, dir.path());
        assert_eq!(result.affected, 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(scene.textures[0].path(), Some(real.as_path()));
        assert_eq!(scene.textures[0].name, "wood.png");
        assert!(scene.textures[0].exists());
    }
}
