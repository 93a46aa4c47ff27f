//! Validate command implementation
//!
//! Runs the rule catalog over a model. Exits 1 when the model has blocking
//! issues.

use super::common::{open_session, parse_engine, parse_profile, print_json};
use anyhow::{Context, Result};
use colored::Colorize;
use pinnacle_lint::{Severity, Validator};
use pinnacle_tools::materials::recommended_settings;
use pinnacle_tools::report::write_validation_report;
use pinnacle_tools::PinnacleConfig;
use std::path::Path;
use std::process::ExitCode;

pub struct ValidateArgs<'a> {
    pub profile: Option<&'a str>,
    pub engine: Option<&'a str>,
    pub disable_rules: &'a [String],
    pub report: Option<&'a Path>,
}

pub fn run(input: &Path, args: &ValidateArgs<'_>, config: &PinnacleConfig, json: bool) -> Result<ExitCode> {
    let mut options = config.validation.clone();
    options.profile = parse_profile(args.profile, options.profile)?;
    options.target_engine = parse_engine(args.engine, options.target_engine)?;

    let mut validator = Validator::new();
    for rule in args.disable_rules {
        if !validator.registry().is_rule_enabled(rule) {
            log::warn!("Unknown or already disabled rule: {}", rule);
        }
        validator.registry_mut().disable_rule(rule);
    }

    let session = open_session(input)?;
    let mut result = session
        .with_scene(|scene| validator.validate(scene, &options))?
        .context("Validation did not complete")?;
    result.model_path = Some(input.to_path_buf());

    if let Some(path) = args.report {
        write_validation_report(&result, path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    if json {
        print_json(&result)?;
    } else {
        println!("{} {}", "Validating:".cyan().bold(), input.display());
        for issue in &result.issues {
            let marker = match issue.severity {
                Severity::Critical | Severity::Error => "x".red(),
                Severity::Warning => "!".yellow(),
                Severity::Info => "i".blue(),
            };
            let object = issue
                .object_name
                .as_deref()
                .map(|o| format!(" ({o})"))
                .unwrap_or_default();
            println!("  {} [{}]{}: {}", marker, issue.rule_id.dimmed(), object, issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      {} {}", "hint:".dimmed(), suggestion);
            }
        }
        for recommendation in &result.recommendations {
            println!("  {} {}", "*".cyan(), recommendation);
        }
        if args.engine.is_some() {
            let engine = recommended_settings(options.target_engine);
            println!(
                "  {} {}: {:?} normals, {:?}, max {} px{}",
                "*".cyan(),
                engine.engine.name(),
                engine.normal_map_format,
                engine.coordinate_system,
                engine.max_texture_resolution,
                if engine.packed_metallic_roughness { ", packed metallic/roughness" } else { "" }
            );
        }
        println!(
            "\n{} critical, {} errors, {} warnings, {} info ({} ms)",
            result.counts.critical, result.counts.error, result.counts.warning, result.counts.info,
            result.validation_time_ms
        );
        if result.is_valid {
            println!("{} Model is valid", "SUCCESS".green().bold());
        } else {
            println!("{} Model has blocking issues", "FAILED".red().bold());
        }
    }

    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
