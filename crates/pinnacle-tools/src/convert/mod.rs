//! Batch format conversion.
//!
//! Each input is loaded, adjusted and written independently. A file that
//! fails is recorded in its own [`FileConversionResult`]; only a batch that
//! cannot start returns [`ConvertError`].

mod transform;

pub use transform::{convert_coordinates, convert_normal_maps, CoordinateSystem};

use crate::error::ConvertError;
use crate::materials::{auto_fix_materials, validate_materials};
use crate::textures::fix_all_texture_paths;
use pinnacle_lint::Severity;
use pinnacle_scene::{
    CancellationToken, FileModelLoader, FileModelWriter, ModelFormat, ModelLoader, ModelWriter, NormalMapFormat,
    TargetEngine, WriteOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Output formats a batch can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionFormat {
    Gltf,
    #[default]
    Glb,
    Usdz,
    Obj,
    Fbx,
}

impl ConversionFormat {
    pub const ALL: [ConversionFormat; 5] = [
        ConversionFormat::Gltf,
        ConversionFormat::Glb,
        ConversionFormat::Usdz,
        ConversionFormat::Obj,
        ConversionFormat::Fbx,
    ];

    pub fn model_format(&self) -> ModelFormat {
        match self {
            ConversionFormat::Gltf => ModelFormat::Gltf,
            ConversionFormat::Glb => ModelFormat::Glb,
            ConversionFormat::Usdz => ModelFormat::Usdz,
            ConversionFormat::Obj => ModelFormat::Obj,
            ConversionFormat::Fbx => ModelFormat::Fbx,
        }
    }

    pub fn from_model_format(format: ModelFormat) -> Option<Self> {
        ConversionFormat::ALL.into_iter().find(|f| f.model_format() == format)
    }
}

impl fmt::Display for ConversionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_format().name())
    }
}

impl FromStr for ConversionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim_start_matches('.').to_ascii_lowercase();
        ConversionFormat::ALL
            .into_iter()
            .find(|f| f.model_format().extension() == wanted)
            .ok_or_else(|| format!("Unknown format '{}'", s))
    }
}

/// Detects a file's format from its extension or magic bytes.
pub fn detect_format(path: &Path) -> Option<ConversionFormat> {
    ConversionFormat::from_model_format(ModelFormat::detect(path))
}

pub fn file_extension_for_format(format: ConversionFormat) -> &'static str {
    format.model_format().extension()
}

/// Returns true if files in `from` can be converted to `to`.
pub fn can_convert(from: ConversionFormat, to: ConversionFormat) -> bool {
    from.model_format().can_import() && to.model_format().can_export()
}

/// Extensions the loader can read.
pub fn supported_input_extensions() -> Vec<&'static str> {
    ModelFormat::ALL
        .iter()
        .filter(|f| f.can_import())
        .map(ModelFormat::extension)
        .collect()
}

/// Lists files under `dir` whose extension is in `extensions`
/// (case-insensitive, leading dot optional), sorted by path.
pub fn discover_files(dir: &Path, recursive: bool, extensions: &[&str]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| wanted.contains(&ext.to_string_lossy().to_ascii_lowercase()))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    log::debug!("Discovered {} file(s) under {}", files.len(), dir.display());
    files
}

/// Options for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConversionOptions {
    pub target_format: ConversionFormat,
    pub embed_textures: bool,

    pub convert_coordinates: bool,
    pub target_coordinate_system: CoordinateSystem,

    pub fix_materials: bool,
    pub validate_materials: bool,
    pub target_engine: TargetEngine,

    pub convert_normal_maps: bool,
    pub normal_map_format: NormalMapFormat,

    /// Search the input's directory for missing textures.
    pub fix_texture_paths: bool,
    pub copy_textures: bool,

    /// Defaults to each input's own directory.
    pub output_directory: Option<PathBuf>,
    pub filename_suffix: String,
    pub overwrite_existing: bool,
}

impl Default for BatchConversionOptions {
    fn default() -> Self {
        Self {
            target_format: ConversionFormat::Glb,
            embed_textures: true,
            convert_coordinates: false,
            target_coordinate_system: CoordinateSystem::YUpRightHanded,
            fix_materials: true,
            validate_materials: true,
            target_engine: TargetEngine::GenericPbr,
            convert_normal_maps: false,
            normal_map_format: NormalMapFormat::OpenGl,
            fix_texture_paths: true,
            copy_textures: false,
            output_directory: None,
            filename_suffix: "_converted".to_string(),
            overwrite_existing: false,
        }
    }
}

impl BatchConversionOptions {
    /// Where `input` will be written.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let dir = self
            .output_directory
            .clone()
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        dir.join(format!(
            "{}{}.{}",
            stem,
            self.filename_suffix,
            file_extension_for_format(self.target_format)
        ))
    }

    fn check(&self) -> Result<(), ConvertError> {
        if !self.target_format.model_format().can_export() {
            return Err(ConvertError::InvalidOptions(format!(
                "{} output is not supported",
                self.target_format
            )));
        }
        if self.filename_suffix.contains(['/', '\\']) {
            return Err(ConvertError::InvalidOptions(
                "filename suffix must not contain path separators".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    /// Written, with non-fatal issues.
    Warning,
    Failed,
    Skipped,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Success => "success",
            ConversionStatus::Warning => "warning",
            ConversionStatus::Failed => "failed",
            ConversionStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConversionResult {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub status: ConversionStatus,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub processing_time: Duration,
    pub mesh_count: usize,
    pub material_count: usize,
    pub texture_count: usize,
    /// Material and texture-path problems repaired on the way.
    pub issues_fixed: usize,
}

impl FileConversionResult {
    fn new(input: &Path) -> Self {
        Self {
            input_path: input.to_path_buf(),
            output_path: None,
            status: ConversionStatus::Success,
            warnings: Vec::new(),
            error_message: None,
            processing_time: Duration::ZERO,
            mesh_count: 0,
            material_count: 0,
            texture_count: 0,
            issues_fixed: 0,
        }
    }

    fn skipped(input: &Path, message: impl Into<String>) -> Self {
        Self {
            status: ConversionStatus::Skipped,
            error_message: Some(message.into()),
            ..Self::new(input)
        }
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("Failed to convert {}: {}", self.input_path.display(), message);
        self.status = ConversionStatus::Failed;
        self.error_message = Some(message);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConversionResult {
    /// One entry per input, in input order.
    pub results: Vec<FileConversionResult>,
    pub total_files: usize,
    pub success_count: usize,
    pub warning_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub total_time: Duration,
    pub cancelled: bool,
}

impl BatchConversionResult {
    fn record(&mut self, result: FileConversionResult) {
        match result.status {
            ConversionStatus::Success => self.success_count += 1,
            ConversionStatus::Warning => self.warning_count += 1,
            ConversionStatus::Failed => self.failure_count += 1,
            ConversionStatus::Skipped => self.skipped_count += 1,
        }
        self.results.push(result);
    }
}

/// Converts model files with a pluggable loader and writer.
pub struct BatchConverter {
    loader: Box<dyn ModelLoader>,
    writer: Box<dyn ModelWriter>,
}

impl Default for BatchConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchConverter {
    pub fn new() -> Self {
        Self::with_io(Box::new(FileModelLoader), Box::new(FileModelWriter))
    }

    pub fn with_io(loader: Box<dyn ModelLoader>, writer: Box<dyn ModelWriter>) -> Self {
        Self { loader, writer }
    }

    /// Converts one file. Never fails: problems are reported in the result.
    pub fn convert_file(&self, input: &Path, options: &BatchConversionOptions) -> FileConversionResult {
        let start = Instant::now();
        let mut result = self.convert_inner(input, options);
        result.processing_time = start.elapsed();
        result
    }

    fn convert_inner(&self, input: &Path, options: &BatchConversionOptions) -> FileConversionResult {
        let mut result = FileConversionResult::new(input);
        let output = options.output_path_for(input);

        if output.exists() && !options.overwrite_existing {
            log::info!("Skipping {}: {} exists", input.display(), output.display());
            return FileConversionResult::skipped(input, format!("Output already exists: {}", output.display()));
        }
        if let Err(e) = options.check() {
            return result.fail(e.to_string());
        }

        let mut scene = match self.loader.load(input) {
            Ok(scene) => scene,
            Err(e) => return result.fail(e.to_string()),
        };

        if options.fix_texture_paths {
            if let Some(dir) = input.parent() {
                let fixed = fix_all_texture_paths(&mut scene, dir);
                result.issues_fixed += fixed.affected;
                result.warnings.extend(fixed.warnings);
            }
        }
        if options.fix_materials {
            result.issues_fixed += auto_fix_materials(&mut scene);
        }
        if options.validate_materials {
            let validation = validate_materials(&scene, options.target_engine);
            result.warnings.extend(
                validation
                    .issues
                    .iter()
                    .filter(|i| i.severity >= Severity::Error)
                    .map(|i| format!("Material '{}': {}", i.material_name, i.message)),
            );
        }
        if options.convert_coordinates {
            convert_coordinates(&mut scene, options.target_coordinate_system);
        }

        let Some(output_dir) = output.parent() else {
            return result.fail(format!("Invalid output path {}", output.display()));
        };
        if let Err(source) = std::fs::create_dir_all(output_dir) {
            let e = ConvertError::Io {
                path: output_dir.to_path_buf(),
                source,
            };
            return result.fail(e.to_string());
        }

        if options.convert_normal_maps {
            let (converted, warnings) = convert_normal_maps(&mut scene, options.normal_map_format, output_dir);
            log::debug!("Converted {} normal map(s)", converted);
            result.warnings.extend(warnings);
        }

        if let Err(e) = scene.check_invariants() {
            return result.fail(ConvertError::from(e).to_string());
        }

        let write_options = WriteOptions {
            embed_textures: options.embed_textures,
            copy_textures: options.copy_textures,
        };
        let report = match self
            .writer
            .write(&scene, options.target_format.model_format(), &output, &write_options)
        {
            Ok(report) => report,
            Err(e) => return result.fail(e.to_string()),
        };

        result.warnings.extend(report.warnings);
        result.output_path = Some(report.output_path);
        result.mesh_count = scene.meshes.len();
        result.material_count = scene.materials.len();
        result.texture_count = scene.textures.len();
        result.status = if result.warnings.is_empty() {
            ConversionStatus::Success
        } else {
            ConversionStatus::Warning
        };
        log::info!("Converted {} -> {} ({})", input.display(), output.display(), result.status);
        result
    }

    /// Converts every input in order.
    ///
    /// `progress` is called once per input, after it finishes, with the
    /// 1-based position, the total and the file name.
    pub fn convert_files<F>(
        &self,
        inputs: &[PathBuf],
        options: &BatchConversionOptions,
        progress: F,
    ) -> Result<BatchConversionResult, ConvertError>
    where
        F: FnMut(usize, usize, &str),
    {
        self.convert_files_with_cancel(inputs, options, progress, &CancellationToken::new())
    }

    /// Like [`convert_files`](Self::convert_files), checking `token` before
    /// each file. Files not started when cancellation is seen are reported
    /// as skipped with the message "cancelled".
    pub fn convert_files_with_cancel<F>(
        &self,
        inputs: &[PathBuf],
        options: &BatchConversionOptions,
        mut progress: F,
        token: &CancellationToken,
    ) -> Result<BatchConversionResult, ConvertError>
    where
        F: FnMut(usize, usize, &str),
    {
        if inputs.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        options.check()?;

        let start = Instant::now();
        let total = inputs.len();
        let mut batch = BatchConversionResult {
            total_files: total,
            ..Default::default()
        };
        log::info!("Converting {} file(s) to {}", total, options.target_format);

        for (position, input) in inputs.iter().enumerate() {
            let result = if token.is_cancelled() {
                batch.cancelled = true;
                FileConversionResult::skipped(input, "cancelled")
            } else {
                self.convert_file(input, options)
            };
            batch.record(result);

            let name = input.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            progress(position + 1, total, &name);
        }

        batch.total_time = start.elapsed();
        log::info!(
            "Batch finished: {} succeeded, {} with warnings, {} failed, {} skipped",
            batch.success_count,
            batch.warning_count,
            batch.failure_count,
            batch.skipped_count
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_format_helpers() {
        assert_eq!(detect_format(Path::new("a/b/chair.GLB")), Some(ConversionFormat::Glb));
        assert_eq!(detect_format(Path::new("notes.txt")), None);
        assert_eq!(file_extension_for_format(ConversionFormat::Usdz), "usdz");
        assert!(can_convert(ConversionFormat::Obj, ConversionFormat::Usdz));
        assert!(!can_convert(ConversionFormat::Usdz, ConversionFormat::Glb));
        assert!(!can_convert(ConversionFormat::Gltf, ConversionFormat::Fbx));
        assert_eq!(supported_input_extensions(), vec!["gltf", "glb", "obj"]);
        assert_eq!(".usdz".parse::<ConversionFormat>(), Ok(ConversionFormat::Usdz));
    }

    #[test]
    fn test_output_path() {
        let options = BatchConversionOptions {
            target_format: ConversionFormat::Usdz,
            ..Default::default()
        };
        assert_eq!(
            options.output_path_for(Path::new("/models/chair.obj")),
            PathBuf::from("/models/chair_converted.usdz")
        );
        let options = BatchConversionOptions {
            output_directory: Some(PathBuf::from("/out")),
            filename_suffix: String::new(),
            ..Default::default()
        };
        assert_eq!(
            options.output_path_for(Path::new("/models/chair.obj")),
            PathBuf::from("/out/chair.glb")
        );
    }

    #[test]
    fn test_discover_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.obj"), TRIANGLE_OBJ).unwrap();
        std::fs::write(dir.path().join("b.GLB"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("sub").join("c.obj"), TRIANGLE_OBJ).unwrap();

        let flat = discover_files(dir.path(), false, &["obj", ".glb"]);
        assert_eq!(flat, vec![dir.path().join("a.obj"), dir.path().join("b.GLB")]);
        let deep = discover_files(dir.path(), true, &["obj"]);
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_empty_and_invalid_batches() {
        let converter = BatchConverter::new();
        let err = converter
            .convert_files(&[], &BatchConversionOptions::default(), |_, _, _| {})
            .unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput));

        let options = BatchConversionOptions {
            target_format: ConversionFormat::Fbx,
            ..Default::default()
        };
        let err = converter
            .convert_files(&[PathBuf::from("a.obj")], &options, |_, _, _| {})
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidOptions(_)));
    }

    #[test]
    fn test_existing_output_is_skipped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tri.obj");
        std::fs::write(&input, TRIANGLE_OBJ).unwrap();
        std::fs::write(dir.path().join("tri_converted.glb"), b"old").unwrap();

        let converter = BatchConverter::new();
        let result = converter.convert_file(&input, &BatchConversionOptions::default());
        assert_eq!(result.status, ConversionStatus::Skipped);

        let overwrite = BatchConversionOptions {
            overwrite_existing: true,
            ..Default::default()
        };
        let result = converter.convert_file(&input, &overwrite);
        assert_eq!(result.status, ConversionStatus::Success, "{:?}", result);
        assert_eq!(result.mesh_count, 1);
    }

    #[test]
    fn test_cancelled_batch_skips_remaining() {
        let dir = tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("m{i}.obj"));
                std::fs::write(&path, TRIANGLE_OBJ).unwrap();
                path
            })
            .collect();

        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let batch = BatchConverter::new()
            .convert_files_with_cancel(
                &inputs,
                &BatchConversionOptions::default(),
                |i, total, _| {
                    seen.push((i, total));
                    if i == 1 {
                        token.cancel();
                    }
                },
                &token,
            )
            .unwrap();

        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        assert!(batch.cancelled);
        assert_eq!(batch.success_count, 1);
        assert_eq!(batch.skipped_count, 2);
        assert_eq!(batch.results[2].error_message.as_deref(), Some("cancelled"));
    }
}
