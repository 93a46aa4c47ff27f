//! Texture analysis and cleanup.
//!
//! Duplicates are byte-identical: two textures are grouped only when the
//! BLAKE3 hashes of their encoded bytes match. Reference counts are always
//! recomputed from the material list.

mod analyzer;
mod operations;

pub use analyzer::{
    analyze, analyze_with_limit, TextureAnalysisResult, TextureInfo, TextureIssue, TextureIssueKind,
    DEFAULT_MAX_RESOLUTION,
};
pub use operations::{
    fix_all_texture_paths, fix_texture_path, remove_duplicate_textures, remove_unused_textures,
    search_for_missing_texture, RemovalPolicy, TextureOperationResult,
};
