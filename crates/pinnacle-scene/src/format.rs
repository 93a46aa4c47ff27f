//! Model format detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// GLB container magic ("glTF").
const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Zip local-file header magic, used by USDZ packages.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// 3D model file formats known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Unknown,
    Gltf,
    Glb,
    Usdz,
    Obj,
    Fbx,
}

impl ModelFormat {
    /// All concrete formats, in display order.
    pub const ALL: [ModelFormat; 5] = [
        ModelFormat::Gltf,
        ModelFormat::Glb,
        ModelFormat::Usdz,
        ModelFormat::Obj,
        ModelFormat::Fbx,
    ];

    /// Detects the format of a file.
    ///
    /// The extension decides first; files with an unknown extension are
    /// sniffed for the GLB or zip magic.
    pub fn detect(path: &Path) -> ModelFormat {
        let by_ext = Self::from_extension(path);
        if by_ext != ModelFormat::Unknown {
            return by_ext;
        }
        Self::sniff(path).unwrap_or(ModelFormat::Unknown)
    }

    /// Maps a file extension (case-insensitive) to a format.
    pub fn from_extension(path: &Path) -> ModelFormat {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return ModelFormat::Unknown;
        };
        match ext.to_ascii_lowercase().as_str() {
            "gltf" => ModelFormat::Gltf,
            "glb" => ModelFormat::Glb,
            "usdz" => ModelFormat::Usdz,
            "obj" => ModelFormat::Obj,
            "fbx" => ModelFormat::Fbx,
            _ => ModelFormat::Unknown,
        }
    }

    fn sniff(path: &Path) -> Option<ModelFormat> {
        let mut file = std::fs::File::open(path).ok()?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).ok()?;
        if &magic == GLB_MAGIC {
            Some(ModelFormat::Glb)
        } else if &magic == ZIP_MAGIC {
            Some(ModelFormat::Usdz)
        } else {
            None
        }
    }

    /// Human-readable format name.
    pub fn name(&self) -> &'static str {
        match self {
            ModelFormat::Unknown => "Unknown",
            ModelFormat::Gltf => "glTF",
            ModelFormat::Glb => "GLB",
            ModelFormat::Usdz => "USDZ",
            ModelFormat::Obj => "OBJ",
            ModelFormat::Fbx => "FBX",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Unknown => "",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Glb => "glb",
            ModelFormat::Usdz => "usdz",
            ModelFormat::Obj => "obj",
            ModelFormat::Fbx => "fbx",
        }
    }

    /// Returns true if the loader can import this format.
    pub fn can_import(&self) -> bool {
        matches!(self, ModelFormat::Gltf | ModelFormat::Glb | ModelFormat::Obj)
    }

    /// Returns true if the writer can export this format.
    pub fn can_export(&self) -> bool {
        matches!(
            self,
            ModelFormat::Gltf | ModelFormat::Glb | ModelFormat::Usdz | ModelFormat::Obj
        )
    }

    /// Returns true if the format is recognized at all.
    pub fn is_supported(&self) -> bool {
        *self != ModelFormat::Unknown
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(ModelFormat::detect(Path::new("a/b/chair.GLB")), ModelFormat::Glb);
        assert_eq!(ModelFormat::detect(Path::new("scene.gltf")), ModelFormat::Gltf);
        assert_eq!(ModelFormat::detect(Path::new("toy.usdz")), ModelFormat::Usdz);
        assert_eq!(ModelFormat::detect(Path::new("cube.obj")), ModelFormat::Obj);
        assert_eq!(ModelFormat::detect(Path::new("rig.fbx")), ModelFormat::Fbx);
        assert_eq!(ModelFormat::detect(Path::new("missing.txt")), ModelFormat::Unknown);
    }

    #[test]
    fn test_sniff_glb_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.bin");
        std::fs::write(&path, b"glTF\x02\x00\x00\x00").unwrap();
        assert_eq!(ModelFormat::detect(&path), ModelFormat::Glb);
    }

    #[test]
    fn test_import_export_support() {
        assert!(ModelFormat::Glb.can_import());
        assert!(!ModelFormat::Usdz.can_import());
        assert!(ModelFormat::Usdz.can_export());
        assert!(!ModelFormat::Fbx.can_export());
        assert!(!ModelFormat::Unknown.is_supported());
    }
}
