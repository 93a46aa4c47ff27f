//! Texture downscaling.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use pinnacle_scene::{TextureRecord, TextureSource};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Dimensions after fitting the longer edge into `max`, keeping aspect.
pub fn fitted_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max || max == 0 {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (fit(width), fit(height))
}

/// Returns true if the texture has known dimensions above `max`.
pub fn needs_resize(texture: &TextureRecord, max: u32) -> bool {
    texture.width > 0 && texture.height > 0 && texture.width.max(texture.height) > max
}

/// Where a resized copy of a file texture is written.
pub fn resized_path(path: &Path, max: u32) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, max, ext.to_string_lossy()),
        None => format!("{}_{}", stem, max),
    };
    path.with_file_name(file_name)
}

/// Shrinks a texture so its longest edge is at most `max`.
///
/// Embedded textures are re-encoded in place. File textures are written to
/// a sibling `<stem>_<max>.<ext>` and the record is repointed; the source
/// file is left alone.
pub fn resize_texture(texture: &mut TextureRecord, max: u32) -> Result<(), String> {
    let (width, height) = fitted_dimensions(texture.width, texture.height, max);
    match &texture.source {
        TextureSource::Embedded { bytes, mime } => {
            let format = ImageFormat::from_mime_type(mime)
                .ok_or_else(|| format!("Cannot re-encode '{}': unsupported type {}", texture.name, mime))?;
            let decoded = image::load_from_memory_with_format(bytes, format)
                .map_err(|e| format!("Cannot decode '{}': {}", texture.name, e))?;
            let resized = shrink(&decoded, width, height, format);
            let mut encoded = Cursor::new(Vec::new());
            resized
                .write_to(&mut encoded, format)
                .map_err(|e| format!("Cannot encode '{}': {}", texture.name, e))?;
            let encoded = encoded.into_inner();
            let name = texture.name.clone();
            let mime = mime.clone();
            *texture = TextureRecord::embedded(name, encoded, mime);
        }
        TextureSource::File(path) => {
            let decoded = image::open(path).map_err(|e| format!("Cannot decode {}: {}", path.display(), e))?;
            let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
            let target = resized_path(path, max);
            shrink(&decoded, width, height, format)
                .save_with_format(&target, format)
                .map_err(|e| format!("Cannot write {}: {}", target.display(), e))?;
            let name = texture.name.clone();
            *texture = TextureRecord::from_file(target);
            texture.name = name;
        }
    }
    log::debug!("Resized '{}' to {}x{}", texture.name, texture.width, texture.height);
    Ok(())
}

fn shrink(image: &DynamicImage, width: u32, height: u32, format: ImageFormat) -> DynamicImage {
    let resized = image.resize_exact(width, height, FilterType::Triangle);
    if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    }
}

/// Records the dimensions a resize would produce without touching pixels.
pub fn estimate_resize(texture: &mut TextureRecord, max: u32) {
    let (width, height) = fitted_dimensions(texture.width, texture.height, max);
    texture.width = width;
    texture.height = height;
}
