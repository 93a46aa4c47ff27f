//! Asset tools for the Pinnacle pipeline.
//!
//! Texture analysis and cleanup, material fixing, the optimizer, batch
//! format conversion, and a [`Session`] that serializes mutation of the one
//! open scene.
//!
//! # Example
//!
//! ```no_run
//! use pinnacle_scene::{CancellationToken, OptimizationProfile};
//! use pinnacle_tools::{OptimizationSettings, Session};
//! use std::path::Path;
//!
//! let session = Session::default();
//! session.open(Path::new("chair.glb")).unwrap();
//!
//! let settings = OptimizationSettings::for_profile(OptimizationProfile::Mobile);
//! let result = session.optimize(&settings, &CancellationToken::new()).unwrap();
//! println!(
//!     "{} -> {} triangles",
//!     result.statistics.triangle_count_before, result.statistics.triangle_count_after
//! );
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod materials;
pub mod optimizer;
pub mod recent;
pub mod report;
pub mod session;
pub mod shader;
pub mod textures;
pub mod worker;

pub use config::PinnacleConfig;
pub use convert::{
    BatchConversionOptions, BatchConversionResult, BatchConverter, ConversionFormat, ConversionStatus,
    CoordinateSystem, FileConversionResult,
};
pub use error::{ConfigError, ConvertError, RecentFilesError, SessionError, TextureError, WorkerError};
pub use optimizer::{
    OptimizationOperation, OptimizationPreview, OptimizationResult, OptimizationSettings, OptimizationStatistics,
};
pub use recent::RecentFiles;
pub use session::Session;
pub use shader::{CompileReport, ShaderCompiler, ShaderHotReload};
pub use textures::{RemovalPolicy, TextureAnalysisResult, TextureOperationResult};
pub use worker::{JobHandle, Worker};
