//! Plain-text report export.
//!
//! Every report is a title line, a block of aligned `key: value` lines and
//! one line per issue or file.

use crate::convert::BatchConversionResult;
use crate::optimizer::OptimizationResult;
use crate::textures::TextureAnalysisResult;
use pinnacle_lint::ModelValidationResult;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const KEY_WIDTH: usize = 24;

struct Report {
    out: String,
}

impl Report {
    fn new(title: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.len()));
        Self { out }
    }

    fn field(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.out, "{:<width$} {}", format!("{key}:"), value, width = KEY_WIDTH);
        self
    }

    fn section(&mut self, name: &str) -> &mut Self {
        let _ = writeln!(self.out, "\n{name}");
        self
    }

    fn line(&mut self, text: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.out, "  {text}");
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

fn save(path: &Path, text: String) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    log::info!("Wrote report {}", path.display());
    Ok(())
}

pub fn validation_report(result: &ModelValidationResult) -> String {
    let mut report = Report::new("Validation Report");
    let model = result
        .model_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());
    report
        .field("Model", model)
        .field("Format", result.model_format)
        .field("Valid", result.is_valid)
        .field("glTF compliant", result.is_gltf_compliant)
        .field("Critical", result.counts.critical)
        .field("Errors", result.counts.error)
        .field("Warnings", result.counts.warning)
        .field("Info", result.counts.info)
        .field("Performance score", format!("{:.1}", result.metrics.performance_score))
        .field("Validation time", format!("{} ms", result.validation_time_ms));

    if !result.issues.is_empty() {
        report.section("Issues");
        for issue in &result.issues {
            let object = issue.object_name.as_deref().map(|o| format!(" ({o})")).unwrap_or_default();
            report.line(format!(
                "[{}] {} {}: {}{}",
                issue.severity, issue.rule_id, issue.title, issue.message, object
            ));
        }
    }
    if !result.recommendations.is_empty() {
        report.section("Recommendations");
        for recommendation in &result.recommendations {
            report.line(format!("- {recommendation}"));
        }
    }
    report.finish()
}

pub fn texture_report(result: &TextureAnalysisResult) -> String {
    let mut report = Report::new("Texture Report");
    report
        .field("Textures", result.total_textures)
        .field("Missing", result.missing_textures)
        .field("Unused", result.unused_textures)
        .field("Duplicate groups", result.duplicate_groups)
        .field("Memory", format_bytes(result.total_memory_usage))
        .field("Potential savings", format_bytes(result.potential_savings));

    report.section("Textures");
    for info in &result.textures {
        report.line(format!(
            "#{} {} {}x{} {} refs={}{}",
            info.index,
            info.name,
            info.width,
            info.height,
            if info.format.is_empty() { "?" } else { &info.format },
            info.reference_count,
            if info.exists { "" } else { " MISSING" }
        ));
    }
    if !result.issues.is_empty() {
        report.section("Issues");
        for issue in &result.issues {
            report.line(format!(
                "[{}] #{} {}: {}",
                issue.severity,
                issue.texture_index,
                issue.kind.as_str(),
                issue.message
            ));
        }
    }
    report.finish()
}

pub fn optimization_report(result: &OptimizationResult) -> String {
    let stats = &result.statistics;
    let mut report = Report::new("Optimization Report");
    report
        .field("Success", result.success)
        .field("Cancelled", result.cancelled)
        .field(
            "Vertices",
            format!(
                "{} -> {} ({:.1}%)",
                stats.vertex_count_before, stats.vertex_count_after, stats.vertex_reduction_percent
            ),
        )
        .field(
            "Triangles",
            format!(
                "{} -> {} ({:.1}%)",
                stats.triangle_count_before, stats.triangle_count_after, stats.triangle_reduction_percent
            ),
        )
        .field(
            "Texture memory",
            format!(
                "{} -> {} ({:.1}%)",
                format_bytes(stats.texture_size_before),
                format_bytes(stats.texture_size_after),
                stats.texture_savings_percent
            ),
        )
        .field(
            "Draw calls",
            format!("{} -> {}", stats.draw_calls_before, stats.draw_calls_after),
        )
        .field("Materials fixed", stats.materials_fixed)
        .field("Textures optimized", stats.textures_optimized)
        .field("Meshes optimized", stats.meshes_optimized)
        .field("Duplicates removed", stats.duplicates_removed)
        .field("Processing time", format!("{} ms", result.processing_time.as_millis()));

    report.section("Applied");
    for name in &result.optimizations_applied {
        report.line(name);
    }
    if !result.warnings.is_empty() {
        report.section("Warnings");
        for warning in &result.warnings {
            report.line(warning);
        }
    }
    report.finish()
}

pub fn conversion_report(result: &BatchConversionResult) -> String {
    let mut report = Report::new("Conversion Report");
    report
        .field("Files", result.total_files)
        .field("Succeeded", result.success_count)
        .field("With warnings", result.warning_count)
        .field("Failed", result.failure_count)
        .field("Skipped", result.skipped_count)
        .field("Cancelled", result.cancelled)
        .field("Total time", format!("{} ms", result.total_time.as_millis()));

    report.section("Files");
    for file in &result.results {
        let target = file
            .output_path
            .as_ref()
            .map(|p| format!(" -> {}", p.display()))
            .unwrap_or_default();
        let detail = file.error_message.as_deref().map(|m| format!(": {m}")).unwrap_or_default();
        report.line(format!(
            "[{}] {}{}{}",
            file.status,
            file.input_path.display(),
            target,
            detail
        ));
        for warning in &file.warnings {
            report.line(format!("    warning: {warning}"));
        }
    }
    report.finish()
}

pub fn write_validation_report(result: &ModelValidationResult, path: &Path) -> io::Result<()> {
    save(path, validation_report(result))
}

pub fn write_texture_report(result: &TextureAnalysisResult, path: &Path) -> io::Result<()> {
    save(path, texture_report(result))
}

pub fn write_optimization_report(result: &OptimizationResult, path: &Path) -> io::Result<()> {
    save(path, optimization_report(result))
}

pub fn write_conversion_report(result: &BatchConversionResult, path: &Path) -> io::Result<()> {
    save(path, conversion_report(result))
}

/// Human-readable byte size.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConversionStatus, FileConversionResult};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(64 * 1024 * 1024), "64.0 MB");
    }

    #[test]
    fn test_conversion_report_lists_every_file() {
        let file = |name: &str, status| FileConversionResult {
            input_path: PathBuf::from(name),
            output_path: None,
            status,
            warnings: Vec::new(),
            error_message: None,
            processing_time: Duration::ZERO,
            mesh_count: 0,
            material_count: 0,
            texture_count: 0,
            issues_fixed: 0,
        };
        let result = BatchConversionResult {
            results: vec![
                file("a.obj", ConversionStatus::Success),
                file("b.fbx", ConversionStatus::Failed),
            ],
            total_files: 2,
            success_count: 1,
            failure_count: 1,
            ..Default::default()
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("convert.txt");
        write_conversion_report(&result, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.starts_with("Conversion Report\n=================\n"));
        assert!(text.contains("Files:                   2\n"));
        assert!(text.contains("  [success] a.obj\n"));
        assert!(text.contains("  [failed] b.fbx\n"));
    }

    #[test]
    fn test_texture_report_marks_missing() {
        let mut scene = pinnacle_scene::SceneModel::new();
        scene
            .textures
            .push(pinnacle_scene::TextureRecord::from_file("/nowhere/wood.png"));
        let text = texture_report(&crate::textures::analyze(&scene));
        assert!(text.contains("Missing:"));
        assert!(text.contains("#0 wood.png 0x0 png refs=0 MISSING"));
        assert!(text.contains("[error] #0 missing:"));
    }
}
