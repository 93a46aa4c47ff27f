//! Pinnacle CLI - inspect, validate, optimize and convert 3D models.

mod cli_args;

use clap::Parser;
use cli_args::{Cli, Commands};
use pinnacle_cli::commands;
use std::process::ExitCode;

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match commands::common::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            return ExitCode::from(1);
        }
    };

    let result = match cli.command {
        Commands::Stats { input, profile, json } => commands::stats::run(&input, profile.as_deref(), &config, json),
        Commands::Validate {
            input,
            profile,
            engine,
            disable_rules,
            report,
            json,
        } => commands::validate::run(
            &input,
            &commands::validate::ValidateArgs {
                profile: profile.as_deref(),
                engine: engine.as_deref(),
                disable_rules: &disable_rules,
                report: report.as_deref(),
            },
            &config,
            json,
        ),
        Commands::Textures {
            input,
            remove_unused,
            delete_files,
            remove_duplicates,
            fix_paths,
            output,
            report,
            json,
        } => commands::textures::run(
            &input,
            &commands::textures::TextureArgs {
                remove_unused,
                delete_files,
                remove_duplicates,
                fix_paths,
                output: output.as_deref(),
                report: report.as_deref(),
            },
            json,
        ),
        Commands::Optimize {
            input,
            profile,
            output,
            preview,
            report,
            json,
        } => commands::optimize::run(
            &input,
            &commands::optimize::OptimizeArgs {
                profile: profile.as_deref(),
                output: output.as_deref(),
                preview,
                report: report.as_deref(),
            },
            &config,
            json,
        ),
        Commands::Convert {
            inputs,
            to,
            output_dir,
            suffix,
            overwrite,
            recursive,
            coordinates,
            engine,
            report,
            json,
        } => commands::convert::run(
            &inputs,
            &commands::convert::ConvertArgs {
                to: to.as_deref(),
                output_dir,
                suffix,
                overwrite,
                recursive,
                coordinates: coordinates.as_deref(),
                engine: engine.as_deref(),
                report: report.as_deref(),
            },
            &config,
            json,
        ),
        Commands::Recent { clear, json } => commands::recent::run(clear, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
