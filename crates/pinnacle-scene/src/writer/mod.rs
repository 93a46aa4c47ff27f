//! Model writing.
//!
//! Writers never fail on features the target cannot express; they drop
//! them and record a warning in the [`WriteReport`]. Only an unwritable
//! destination, an unsupported target or an encoding failure is an error.

mod gltf_export;
mod obj_export;
mod usdz_export;

use crate::error::{WriteError, WriteResult};
use crate::format::ModelFormat;
use crate::scene::{SceneModel, TextureRecord, TextureSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options controlling how textures are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Embed texture bytes in the output instead of referencing files.
    pub embed_textures: bool,
    /// Copy referenced texture files next to the output.
    pub copy_textures: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            embed_textures: true,
            copy_textures: false,
        }
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    /// Primary output file.
    pub output_path: PathBuf,
    /// Every file written, including sidecars and copied textures.
    pub written_files: Vec<PathBuf>,
    /// Features dropped or approximated.
    pub warnings: Vec<String>,
}

impl WriteReport {
    fn new(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            written_files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Writes a [`SceneModel`] to a file.
pub trait ModelWriter: Send + Sync {
    /// Writes `scene` as `format` to `path`.
    fn write(&self, scene: &SceneModel, format: ModelFormat, path: &Path, options: &WriteOptions) -> WriteResult<WriteReport>;
}

/// Writer for glTF, GLB, USDZ and OBJ.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModelWriter;

impl ModelWriter for FileModelWriter {
    fn write(&self, scene: &SceneModel, format: ModelFormat, path: &Path, options: &WriteOptions) -> WriteResult<WriteReport> {
        let mut report = WriteReport::new(path);
        match format {
            ModelFormat::Gltf => gltf_export::write_gltf(scene, path, options, &mut report)?,
            ModelFormat::Glb => gltf_export::write_glb(scene, path, &mut report)?,
            ModelFormat::Usdz => usdz_export::write(scene, path, &mut report)?,
            ModelFormat::Obj => obj_export::write(scene, path, options, &mut report)?,
            ModelFormat::Fbx | ModelFormat::Unknown => return Err(WriteError::UnsupportedTarget { format }),
        }
        log::info!(
            "Wrote {} ({} files, {} warnings)",
            path.display(),
            report.written_files.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

/// Writes bytes and records the file in the report.
fn write_file(path: &Path, bytes: &[u8], report: &mut WriteReport) -> WriteResult<()> {
    std::fs::write(path, bytes).map_err(|source| WriteError::io(path, source))?;
    report.written_files.push(path.to_path_buf());
    Ok(())
}

/// How an exported document should reference a file texture.
///
/// Copies the file next to the output when asked to; otherwise produces a
/// path relative to the output directory when the texture lives beneath
/// it, and an absolute path as a last resort.
fn texture_reference(
    texture: &TextureRecord,
    output_dir: &Path,
    copy: bool,
    report: &mut WriteReport,
) -> WriteResult<Option<String>> {
    let TextureSource::File(source) = &texture.source else {
        return Ok(None);
    };
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| texture.name.clone());

    if copy && source.is_file() {
        let target = output_dir.join(&file_name);
        if target != *source {
            std::fs::copy(source, &target).map_err(|e| WriteError::io(&target, e))?;
            report.written_files.push(target);
        }
        return Ok(Some(file_name));
    }

    if let Ok(relative) = source.strip_prefix(output_dir) {
        return Ok(Some(relative.to_string_lossy().replace('\\', "/")));
    }
    Ok(Some(source.to_string_lossy().replace('\\', "/")))
}

/// File extension for an embedded image's MIME type.
fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/ktx2" => "ktx2",
        _ => "png",
    }
}

/// Replaces characters that are unsafe in file and prim names.
fn sanitize_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let cleaned = if cleaned.is_empty() { fallback.to_string() } else { cleaned };
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// Yields unique names by appending a counter to repeats.
#[derive(Default)]
struct NameAllocator {
    used: std::collections::HashSet<String>,
}

impl NameAllocator {
    fn allocate(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Body Mesh.001", "mesh"), "Body_Mesh_001");
        assert_eq!(sanitize_name("", "mesh"), "mesh");
        assert_eq!(sanitize_name("3d", "mesh"), "_3d");
    }

    #[test]
    fn test_name_allocator() {
        let mut names = NameAllocator::default();
        assert_eq!(names.allocate("a".into()), "a");
        assert_eq!(names.allocate("a".into()), "a_1");
        assert_eq!(names.allocate("a".into()), "a_2");
    }

    #[test]
    fn test_fbx_target_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileModelWriter
            .write(&SceneModel::new(), ModelFormat::Fbx, &dir.path().join("out.fbx"), &WriteOptions::default())
            .unwrap_err();
        assert!(matches!(err, WriteError::UnsupportedTarget { format: ModelFormat::Fbx }));
    }

    #[test]
    fn test_texture_reference_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tex")).unwrap();
        let path = dir.path().join("tex/albedo.png");
        std::fs::write(&path, b"png").unwrap();
        let texture = TextureRecord::from_file(&path);
        let mut report = WriteReport::default();
        let reference = texture_reference(&texture, dir.path(), false, &mut report).unwrap();
        assert_eq!(reference.as_deref(), Some("tex/albedo.png"));
        assert!(report.written_files.is_empty());
    }
}
