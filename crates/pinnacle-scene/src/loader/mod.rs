//! Model loading.

mod gltf_import;
mod obj_import;

use crate::error::{LoadError, LoadResult};
use crate::format::ModelFormat;
use crate::scene::SceneModel;
use std::path::Path;

/// Reads a model file into a [`SceneModel`].
pub trait ModelLoader: Send + Sync {
    /// Loads the model at `path`.
    fn load(&self, path: &Path) -> LoadResult<SceneModel>;
}

/// Loader for the formats this crate can parse from disk.
///
/// glTF and GLB go through the `gltf` crate, OBJ through `tobj`. USDZ and
/// FBX are recognized but rejected with [`LoadError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModelLoader;

impl ModelLoader for FileModelLoader {
    fn load(&self, path: &Path) -> LoadResult<SceneModel> {
        std::fs::metadata(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let format = ModelFormat::detect(path);
        log::debug!("Loading {} as {}", path.display(), format);

        let mut scene = match format {
            ModelFormat::Gltf | ModelFormat::Glb => gltf_import::load(path, format)?,
            ModelFormat::Obj => obj_import::load(path)?,
            ModelFormat::Usdz | ModelFormat::Fbx => {
                return Err(LoadError::UnsupportedFormat {
                    format,
                    path: path.to_path_buf(),
                })
            }
            ModelFormat::Unknown => {
                return Err(LoadError::UnknownFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        scene.source_path = Some(path.to_path_buf());
        scene.format = format;
        scene
            .check_invariants()
            .map_err(|e| LoadError::corrupt(format, path, e.to_string()))?;

        log::info!(
            "Loaded {}: {} meshes, {} materials, {} textures",
            path.display(),
            scene.meshes.len(),
            scene.materials.len(),
            scene.textures.len()
        );
        Ok(scene)
    }
}

/// Decodes `%XX` escapes in a relative URI.
pub(crate) fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
