//! Argument definitions for the `pinnacle` command.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Pinnacle - 3D model inspection, validation, optimization and conversion
#[derive(Parser)]
#[command(name = "pinnacle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file with validation, optimization and conversion defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print scene statistics and a performance rating
    Stats {
        /// Model file (glTF, GLB or OBJ)
        input: PathBuf,

        /// Profile whose budget the scene is scored against
        #[arg(short, long)]
        profile: Option<String>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a model against the rule catalog
    Validate {
        /// Model file (glTF, GLB or OBJ)
        input: PathBuf,

        /// Profile whose budget performance rules use
        #[arg(short, long)]
        profile: Option<String>,

        /// Target engine for material checks (e.g. unity_urp, unreal, godot)
        #[arg(short, long)]
        engine: Option<String>,

        /// Rule IDs to skip (repeatable)
        #[arg(long = "disable-rule")]
        disable_rules: Vec<String>,

        /// Write a plain-text report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze textures and optionally clean them up
    Textures {
        /// Model file (glTF, GLB or OBJ)
        input: PathBuf,

        /// Remove textures no material references
        #[arg(long)]
        remove_unused: bool,

        /// With --remove-unused, also delete their files
        #[arg(long, requires = "remove_unused")]
        delete_files: bool,

        /// Collapse byte-identical textures
        #[arg(long)]
        remove_duplicates: bool,

        /// Search the model's directory for missing textures
        #[arg(long)]
        fix_paths: bool,

        /// Where to write the cleaned model (required when modifying)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a plain-text report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Optimize a model for a target profile
    Optimize {
        /// Model file (glTF, GLB or OBJ)
        input: PathBuf,

        /// Optimization profile (mobile, desktop, vr, ar, web, console, custom)
        #[arg(short, long)]
        profile: Option<String>,

        /// Where to write the optimized model
        #[arg(short, long, required_unless_present = "preview")]
        output: Option<PathBuf>,

        /// Predict the result without modifying anything
        #[arg(long)]
        preview: bool,

        /// Write a plain-text report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert model files to another format
    Convert {
        /// Files or directories to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target format (gltf, glb, usdz, obj)
        #[arg(short, long)]
        to: Option<String>,

        /// Output directory (default: next to each input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Appended to each output file stem
        #[arg(long)]
        suffix: Option<String>,

        /// Replace existing outputs instead of skipping them
        #[arg(long)]
        overwrite: bool,

        /// Descend into subdirectories of directory inputs
        #[arg(short, long)]
        recursive: bool,

        /// Target coordinate system (e.g. z_up_right_handed)
        #[arg(long)]
        coordinates: Option<String>,

        /// Target engine; also selects its normal map convention
        #[arg(short, long)]
        engine: Option<String>,

        /// Write a plain-text report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// List or clear recently opened files
    Recent {
        /// Forget all recent files
        #[arg(long)]
        clear: bool,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}
