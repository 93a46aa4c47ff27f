//! Optimize command implementation

use super::common::{export_scene, open_session, parse_profile, print_json};
use anyhow::{Context, Result};
use colored::Colorize;
use pinnacle_scene::CancellationToken;
use pinnacle_tools::report::{format_bytes, write_optimization_report};
use pinnacle_tools::{OptimizationSettings, OptimizationStatistics, PinnacleConfig};
use std::path::Path;
use std::process::ExitCode;

pub struct OptimizeArgs<'a> {
    pub profile: Option<&'a str>,
    pub output: Option<&'a Path>,
    pub preview: bool,
    pub report: Option<&'a Path>,
}

pub fn run(input: &Path, args: &OptimizeArgs<'_>, config: &PinnacleConfig, json: bool) -> Result<ExitCode> {
    // An explicit profile replaces the configured settings wholesale.
    let settings = match args.profile {
        Some(name) => OptimizationSettings::for_profile(parse_profile(Some(name), config.optimization.profile)?),
        None => config.optimization.clone(),
    };
    let session = open_session(input)?;

    if args.preview {
        let preview = session.preview(&settings)?;
        if json {
            print_json(&preview)?;
        } else {
            println!("{} {} ({})", "Preview:".cyan().bold(), input.display(), settings.profile);
            for op in &preview.planned_optimizations {
                println!("  {} {}", "-".dimmed(), op);
            }
            print_statistics(&preview.predicted_statistics);
            for warning in &preview.warnings {
                println!("  {} {}", "!".yellow(), warning);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let result = session
        .optimize(&settings, &CancellationToken::new())
        .context("Optimization was discarded")?;
    if let Some(path) = args.report {
        write_optimization_report(&result, path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }
    if let Some(output) = args.output {
        let written = export_scene(&session, output)?;
        for warning in &written.warnings {
            log::warn!("{}", warning);
        }
    }

    if json {
        print_json(&result)?;
    } else {
        println!("{} {} ({})", "Optimized:".cyan().bold(), input.display(), settings.profile);
        for applied in &result.optimizations_applied {
            println!("  {} {}", "+".green(), applied);
        }
        for warning in &result.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
        print_statistics(&result.statistics);
        if let Some(output) = args.output {
            println!("{} {} ({} ms)", "Wrote".green().bold(), output.display(), result.processing_time.as_millis());
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn print_statistics(stats: &OptimizationStatistics) {
    println!(
        "  {:<16} {} -> {} ({:.1}%)",
        "Vertices", stats.vertex_count_before, stats.vertex_count_after, stats.vertex_reduction_percent
    );
    println!(
        "  {:<16} {} -> {} ({:.1}%)",
        "Triangles", stats.triangle_count_before, stats.triangle_count_after, stats.triangle_reduction_percent
    );
    println!(
        "  {:<16} {} -> {} ({:.1}%)",
        "Texture memory",
        format_bytes(stats.texture_size_before),
        format_bytes(stats.texture_size_after),
        stats.texture_savings_percent
    );
    println!(
        "  {:<16} {} -> {}",
        "Draw calls", stats.draw_calls_before, stats.draw_calls_after
    );
}
