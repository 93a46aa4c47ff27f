//! Scene transforms applied during conversion.

use glam::{Mat4, Vec4};
use image::{DynamicImage, ImageFormat};
use pinnacle_scene::geometry;
use pinnacle_scene::{NormalMapFormat, SceneModel, TextureChannel, TextureRecord, TextureSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

/// Axis convention of a target application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// glTF, Godot, three.js.
    #[default]
    YUpRightHanded,
    /// Unity.
    YUpLeftHanded,
    /// Blender, 3ds Max.
    ZUpRightHanded,
    /// Unreal.
    ZUpLeftHanded,
}

impl CoordinateSystem {
    pub const ALL: [CoordinateSystem; 4] = [
        CoordinateSystem::YUpRightHanded,
        CoordinateSystem::YUpLeftHanded,
        CoordinateSystem::ZUpRightHanded,
        CoordinateSystem::ZUpLeftHanded,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            CoordinateSystem::YUpRightHanded => "y_up_right_handed",
            CoordinateSystem::YUpLeftHanded => "y_up_left_handed",
            CoordinateSystem::ZUpRightHanded => "z_up_right_handed",
            CoordinateSystem::ZUpLeftHanded => "z_up_left_handed",
        }
    }

    /// Basis change from glTF's Y-up right-handed frame into this one.
    pub fn from_gltf_basis(&self) -> Mat4 {
        match self {
            CoordinateSystem::YUpRightHanded => Mat4::IDENTITY,
            CoordinateSystem::YUpLeftHanded => Mat4::from_scale(glam::Vec3::new(1.0, 1.0, -1.0)),
            // (x, y, z) -> (x, -z, y)
            CoordinateSystem::ZUpRightHanded => Mat4::from_cols(
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, 1.0, 0.0),
                Vec4::new(0.0, -1.0, 0.0, 0.0),
                Vec4::W,
            ),
            // (x, y, z) -> (x, z, y)
            CoordinateSystem::ZUpLeftHanded => Mat4::from_cols(
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, 1.0, 0.0),
                Vec4::new(0.0, 1.0, 0.0, 0.0),
                Vec4::W,
            ),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CoordinateSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        CoordinateSystem::ALL
            .into_iter()
            .find(|c| c.id() == wanted)
            .ok_or_else(|| format!("Unknown coordinate system '{}'", s))
    }
}

/// Re-expresses a glTF-frame scene in `target`.
///
/// Geometry is transformed by the basis change `C` and every node matrix
/// `M` becomes `C * M * C⁻¹`, so world placement is preserved for nodes at
/// any depth and for instanced meshes.
pub fn convert_coordinates(scene: &mut SceneModel, target: CoordinateSystem) {
    if target == CoordinateSystem::YUpRightHanded {
        return;
    }
    let basis = target.from_gltf_basis();
    let inverse = basis.inverse();
    for mesh in &mut scene.meshes {
        if let Some(geometry) = &mut mesh.geometry {
            geometry::transform(geometry, basis);
        }
        mesh.refresh_derived();
    }
    for node in &mut scene.nodes {
        let local = Mat4::from_cols_array(&node.matrix);
        node.matrix = (basis * local * inverse).to_cols_array();
    }
    log::debug!("Converted coordinates to {}", target);
}

/// Flips the green channel of every normal map when the target convention
/// differs from glTF's.
///
/// Embedded maps are re-encoded in place; file maps are written to
/// `<stem>_directx.<ext>` in `output_dir` and repointed.
/// Returns the number of maps converted; failures come back as warnings.
pub fn convert_normal_maps(
    scene: &mut SceneModel,
    target: NormalMapFormat,
    output_dir: &Path,
) -> (usize, Vec<String>) {
    if target == NormalMapFormat::OpenGl {
        return (0, Vec::new());
    }
    let normal_maps: BTreeSet<usize> = scene
        .materials
        .iter()
        .filter_map(|m| m.texture(TextureChannel::Normal))
        .collect();

    let mut converted = 0;
    let mut warnings = Vec::new();
    for index in normal_maps {
        let Some(texture) = scene.textures.get_mut(index) else { continue };
        match flip_green(texture, output_dir) {
            Ok(()) => converted += 1,
            Err(e) => warnings.push(e),
        }
    }
    (converted, warnings)
}

fn flip_green(texture: &mut TextureRecord, output_dir: &Path) -> Result<(), String> {
    let bytes = texture
        .read_bytes()
        .map_err(|e| format!("Cannot read normal map '{}': {}", texture.name, e))?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| format!("Cannot decode normal map '{}': {}", texture.name, e))?;
    let format = image::guess_format(&bytes).unwrap_or(ImageFormat::Png);

    let mut rgba = decoded.to_rgba8();
    for pixel in rgba.pixels_mut() {
        pixel[1] = 255 - pixel[1];
    }
    let flipped = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(rgba)
    };

    let mut encoded = Cursor::new(Vec::new());
    flipped
        .write_to(&mut encoded, format)
        .map_err(|e| format!("Cannot encode normal map '{}': {}", texture.name, e))?;
    let encoded = encoded.into_inner();

    match &texture.source {
        TextureSource::Embedded { mime, .. } => {
            let mime = mime.clone();
            let name = texture.name.clone();
            *texture = TextureRecord::embedded(name, encoded, mime);
        }
        TextureSource::File(path) => {
            let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let ext = format.extensions_str().first().copied().unwrap_or("png");
            let target = output_dir.join(format!("{stem}_directx.{ext}"));
            std::fs::write(&target, &encoded).map_err(|e| format!("Cannot write {}: {}", target.display(), e))?;
            let name = texture.name.clone();
            *texture = TextureRecord::from_file(target);
            texture.name = name;
        }
    }
    Ok(())
}
