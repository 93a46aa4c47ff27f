//! Stats command implementation

use super::common::{open_session, parse_profile, print_json};
use anyhow::Result;
use colored::Colorize;
use pinnacle_scene::{PerformanceRating, SceneStatistics};
use pinnacle_tools::report::format_bytes;
use pinnacle_tools::PinnacleConfig;
use std::path::Path;
use std::process::ExitCode;

pub fn run(input: &Path, profile: Option<&str>, config: &PinnacleConfig, json: bool) -> Result<ExitCode> {
    let profile = parse_profile(profile, config.optimization.profile)?;
    let session = open_session(input)?;
    let stats = session.statistics(profile)?;

    if json {
        print_json(&stats)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Model:".cyan().bold(), input.display());
    println!("{} {}", "Profile:".dimmed(), profile);
    print_statistics(&stats);
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn print_statistics(stats: &SceneStatistics) {
    println!("  {:<20} {}", "Meshes", stats.mesh_count);
    println!("  {:<20} {}", "Vertices", stats.total_vertices);
    println!("  {:<20} {}", "Triangles", stats.total_triangles);
    println!(
        "  {:<20} {} ({} in use)",
        "Materials", stats.material_count, stats.unique_materials
    );
    println!("  {:<20} {}", "Textures", stats.texture_count);
    println!("  {:<20} {}", "Texture memory", format_bytes(stats.texture_memory));
    println!("  {:<20} {}", "Nodes", stats.total_nodes);
    println!("  {:<20} {}", "Hierarchy depth", stats.max_hierarchy_depth);
    println!("  {:<20} {}", "Draw calls", stats.estimated_draw_calls);

    let rating = match stats.performance_rating {
        PerformanceRating::Excellent => stats.performance_rating.as_str().green(),
        PerformanceRating::Good => stats.performance_rating.as_str().cyan(),
        PerformanceRating::Fair => stats.performance_rating.as_str().yellow(),
        PerformanceRating::Poor => stats.performance_rating.as_str().red(),
    };
    println!(
        "  {:<20} {:.1} ({})",
        "Performance", stats.performance_score, rating
    );
}
