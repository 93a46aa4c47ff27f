//! Scene model and model I/O for the Pinnacle asset pipeline.
//!
//! This crate holds the data every other pipeline stage works on:
//!
//! - [`SceneModel`] with its meshes, materials, textures and nodes
//! - [`ModelLoader`] / [`ModelWriter`] for glTF, GLB, USDZ and OBJ
//! - shared mesh utilities in [`geometry`]
//! - [`SceneStatistics`] and the profile-driven performance score
//!
//! # Example
//!
//! ```no_run
//! use pinnacle_scene::{FileModelLoader, ModelLoader, PerformanceBudget, SceneStatistics};
//! use std::path::Path;
//!
//! let scene = FileModelLoader.load(Path::new("chair.glb")).unwrap();
//! let stats = SceneStatistics::compute(&scene, &PerformanceBudget::mobile());
//! println!("{} triangles, rated {}", stats.total_triangles, stats.performance_rating);
//! ```

pub mod cancel;
pub mod engine;
pub mod error;
pub mod format;
pub mod geometry;
pub mod hash;
pub mod loader;
pub mod profile;
pub mod scene;
pub mod stats;
pub mod writer;

pub use cancel::CancellationToken;
pub use engine::{NormalMapFormat, TargetEngine};
pub use error::{EngineError, LoadError, LoadResult, WriteError, WriteResult};
pub use format::ModelFormat;
pub use loader::{FileModelLoader, ModelLoader};
pub use profile::{OptimizationProfile, PerformanceBudget};
pub use scene::{
    MaterialRecord, MeshFlags, MeshGeometry, MeshRecord, NodeRecord, SceneModel, TextureChannel, TextureRecord,
    TextureSlot, TextureSource, IDENTITY_MATRIX,
};
pub use stats::{PerformanceRating, SceneStatistics};
pub use writer::{FileModelWriter, ModelWriter, WriteOptions, WriteReport};
