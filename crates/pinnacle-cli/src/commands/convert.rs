//! Convert command implementation
//!
//! Directory inputs expand to the model files they contain. Exits 1 when
//! any file failed.

use super::common::{parse_engine, print_json};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use pinnacle_tools::convert::{discover_files, supported_input_extensions};
use pinnacle_tools::report::write_conversion_report;
use pinnacle_tools::{BatchConversionOptions, BatchConverter, ConversionStatus, CoordinateSystem, PinnacleConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub struct ConvertArgs<'a> {
    pub to: Option<&'a str>,
    pub output_dir: Option<PathBuf>,
    pub suffix: Option<String>,
    pub overwrite: bool,
    pub recursive: bool,
    pub coordinates: Option<&'a str>,
    pub engine: Option<&'a str>,
    pub report: Option<&'a Path>,
}

/// Layers command-line flags over the configured conversion defaults.
pub fn build_options(args: &ConvertArgs<'_>, config: &PinnacleConfig) -> Result<BatchConversionOptions> {
    let mut options = config.conversion.clone();
    if let Some(to) = args.to {
        options.target_format = to.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(dir) = &args.output_dir {
        options.output_directory = Some(dir.clone());
    }
    if let Some(suffix) = &args.suffix {
        options.filename_suffix = suffix.clone();
    }
    options.overwrite_existing |= args.overwrite;
    if let Some(coordinates) = args.coordinates {
        options.target_coordinate_system = coordinates.parse::<CoordinateSystem>().map_err(|e| anyhow!(e))?;
        options.convert_coordinates = true;
    }
    if args.engine.is_some() {
        options.target_engine = parse_engine(args.engine, options.target_engine)?;
        options.normal_map_format = options.target_engine.normal_map_format();
        options.convert_normal_maps = true;
    }
    Ok(options)
}

/// Expands directories into the model files beneath them.
pub fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let extensions = supported_input_extensions();
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(discover_files(input, recursive, &extensions));
        } else {
            files.push(input.clone());
        }
    }
    files
}

pub fn run(inputs: &[PathBuf], args: &ConvertArgs<'_>, config: &PinnacleConfig, json: bool) -> Result<ExitCode> {
    let options = build_options(args, config)?;
    let files = expand_inputs(inputs, args.recursive);

    let converter = BatchConverter::new();
    let result = converter
        .convert_files(&files, &options, |index, total, name| {
            if !json {
                println!("{} {}", format!("[{index}/{total}]").dimmed(), name);
            }
        })
        .context("Conversion could not start")?;

    if let Some(path) = args.report {
        write_conversion_report(&result, path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    if json {
        print_json(&result)?;
    } else {
        for file in &result.results {
            let status = match file.status {
                ConversionStatus::Success => "success".green(),
                ConversionStatus::Warning => "warning".yellow(),
                ConversionStatus::Failed => "failed".red(),
                ConversionStatus::Skipped => "skipped".dimmed(),
            };
            match (&file.output_path, &file.error_message) {
                (Some(out), _) => println!("  {} {} -> {}", status, file.input_path.display(), out.display()),
                (None, Some(message)) => println!("  {} {}: {}", status, file.input_path.display(), message),
                (None, None) => println!("  {} {}", status, file.input_path.display()),
            }
            for warning in &file.warnings {
                println!("      {} {}", "!".yellow(), warning);
            }
        }
        println!(
            "\n{} files: {} succeeded, {} with warnings, {} failed, {} skipped ({} ms)",
            result.total_files,
            result.success_count,
            result.warning_count,
            result.failure_count,
            result.skipped_count,
            result.total_time.as_millis()
        );
    }

    Ok(if result.failure_count > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
