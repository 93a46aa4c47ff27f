//! Textures command implementation
//!
//! Prints the texture analysis and optionally cleans up, writing the
//! modified model to `--output`.

use super::common::{export_scene, open_session, print_json};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use pinnacle_lint::Severity;
use pinnacle_tools::report::{format_bytes, write_texture_report};
use pinnacle_tools::textures::fix_all_texture_paths;
use pinnacle_tools::{RemovalPolicy, TextureAnalysisResult, TextureOperationResult};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

pub struct TextureArgs<'a> {
    pub remove_unused: bool,
    pub delete_files: bool,
    pub remove_duplicates: bool,
    pub fix_paths: bool,
    pub output: Option<&'a Path>,
    pub report: Option<&'a Path>,
}

impl TextureArgs<'_> {
    fn modifies(&self) -> bool {
        self.remove_unused || self.remove_duplicates || self.fix_paths
    }
}

#[derive(Serialize)]
struct TexturesOutput {
    analysis: TextureAnalysisResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    operations: Vec<(String, TextureOperationResult)>,
}

pub fn run(input: &Path, args: &TextureArgs<'_>, json: bool) -> Result<ExitCode> {
    if args.modifies() && args.output.is_none() {
        bail!("--output is required with --remove-unused, --remove-duplicates or --fix-paths");
    }

    let session = open_session(input)?;
    let mut operations = Vec::new();

    if args.fix_paths {
        let base = input.parent().unwrap_or(Path::new("."));
        let fixed = session.with_scene_mut(|scene| fix_all_texture_paths(scene, base))?;
        operations.push(("fix_paths".to_string(), fixed));
    }
    if args.remove_duplicates {
        operations.push(("remove_duplicates".to_string(), session.remove_duplicate_textures()?));
    }
    if args.remove_unused {
        let policy = if args.delete_files {
            RemovalPolicy::RecordsAndFiles
        } else {
            RemovalPolicy::RecordsOnly
        };
        operations.push(("remove_unused".to_string(), session.remove_unused_textures(policy)?));
    }

    let analysis = session.analyze_textures()?;
    if let Some(path) = args.report {
        write_texture_report(&analysis, path).with_context(|| format!("Failed to write report: {}", path.display()))?;
    }
    if let Some(output) = args.output {
        let written = export_scene(&session, output)?;
        for warning in &written.warnings {
            log::warn!("{}", warning);
        }
    }

    let has_errors = analysis.issues.iter().any(|i| i.severity >= Severity::Error);
    if json {
        print_json(&TexturesOutput { analysis, operations })?;
    } else {
        print_human(input, &analysis, &operations, args.output);
    }

    Ok(if has_errors { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

fn print_human(
    input: &Path,
    analysis: &TextureAnalysisResult,
    operations: &[(String, TextureOperationResult)],
    output: Option<&Path>,
) {
    println!("{} {}", "Textures:".cyan().bold(), input.display());
    for info in &analysis.textures {
        let status = if info.exists { "ok".green() } else { "missing".red() };
        println!(
            "  #{:<3} {:<32} {:>5}x{:<5} {:<5} refs={} [{}]",
            info.index, info.name, info.width, info.height, info.format, info.reference_count, status
        );
    }
    for issue in &analysis.issues {
        let marker = match issue.severity {
            Severity::Critical | Severity::Error => "x".red(),
            Severity::Warning => "!".yellow(),
            Severity::Info => "i".blue(),
        };
        println!("  {} #{} {}", marker, issue.texture_index, issue.message);
    }
    println!(
        "\n{} textures, {} missing, {} unused, {} duplicate groups; {} in memory, {} reclaimable",
        analysis.total_textures,
        analysis.missing_textures,
        analysis.unused_textures,
        analysis.duplicate_groups,
        format_bytes(analysis.total_memory_usage),
        format_bytes(analysis.potential_savings)
    );

    for (name, result) in operations {
        println!(
            "{} {}: {} affected, {} saved",
            "Applied".green().bold(),
            name,
            result.affected,
            format_bytes(result.bytes_saved())
        );
        for warning in &result.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }
    if let Some(output) = output {
        println!("{} {}", "Wrote".green().bold(), output.display());
    }
}
