//! Texture analysis.
//!
//! An analysis is a snapshot: every mutating operation invalidates it and
//! callers re-run [`analyze`] to see the new state.

use pinnacle_lint::Severity;
use pinnacle_scene::hash::texture_hash;
use pinnacle_scene::{SceneModel, TextureRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

/// Default largest edge before a texture counts as oversized.
pub const DEFAULT_MAX_RESOLUTION: u32 = 4096;

/// Encodings every consumer of the pipeline's output can read.
const PORTABLE_FORMATS: &[&str] = &["png", "jpeg"];

/// Snapshot of one texture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub index: usize,
    pub name: String,
    /// File path, absent for embedded textures.
    pub path: Option<PathBuf>,
    pub exists: bool,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    pub format: String,
    pub is_power_of_two: bool,
    /// Number of distinct materials binding this texture.
    pub reference_count: usize,
    pub material_indices: Vec<usize>,
    /// BLAKE3 of the encoded bytes; absent when the bytes are unavailable.
    pub content_hash: Option<String>,
    /// Estimated decompressed size.
    pub memory: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureIssueKind {
    Missing,
    AbsolutePath,
    WrongFormat,
    Oversized,
    Duplicate,
    Unused,
    NonPowerOfTwo,
}

impl TextureIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureIssueKind::Missing => "missing",
            TextureIssueKind::AbsolutePath => "absolute_path",
            TextureIssueKind::WrongFormat => "wrong_format",
            TextureIssueKind::Oversized => "oversized",
            TextureIssueKind::Duplicate => "duplicate",
            TextureIssueKind::Unused => "unused",
            TextureIssueKind::NonPowerOfTwo => "non_power_of_two",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureIssue {
    pub kind: TextureIssueKind,
    pub severity: Severity,
    pub texture_index: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// For duplicates, every texture in the group (canonical first).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_indices: Vec<usize>,
}

impl TextureIssue {
    fn new(kind: TextureIssueKind, severity: Severity, texture_index: usize, message: String) -> Self {
        Self {
            kind,
            severity,
            texture_index,
            message,
            suggestion: None,
            duplicate_indices: Vec::new(),
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureAnalysisResult {
    pub textures: Vec<TextureInfo>,
    pub issues: Vec<TextureIssue>,
    pub total_textures: usize,
    pub missing_textures: usize,
    pub unused_textures: usize,
    /// Number of duplicate groups with two or more members.
    pub duplicate_groups: usize,
    /// Groups of byte-identical textures, each sorted with the canonical
    /// (lowest) index first.
    pub duplicate_sets: Vec<Vec<usize>>,
    pub total_memory_usage: u64,
    /// Memory freed by removing unused textures and redundant duplicates.
    pub potential_savings: u64,
}

impl TextureAnalysisResult {
    pub fn issues_of(&self, kind: TextureIssueKind) -> impl Iterator<Item = &TextureIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// Analyzes every texture with the default resolution limit.
pub fn analyze(scene: &SceneModel) -> TextureAnalysisResult {
    analyze_with_limit(scene, DEFAULT_MAX_RESOLUTION)
}

/// Analyzes every texture, flagging edges above `max_resolution`.
pub fn analyze_with_limit(scene: &SceneModel, max_resolution: u32) -> TextureAnalysisResult {
    let textures: Vec<TextureInfo> = scene
        .textures
        .iter()
        .enumerate()
        .map(|(index, texture)| texture_info(scene, index, texture))
        .collect();

    let duplicate_sets = duplicate_sets(&textures);
    let mut issues = Vec::new();
    let base_dir = scene.base_dir();

    for info in &textures {
        if !info.exists {
            let location = info
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "embedded data".to_string());
            issues.push(
                TextureIssue::new(
                    TextureIssueKind::Missing,
                    Severity::Error,
                    info.index,
                    format!("Texture '{}' is missing ({})", info.name, location),
                )
                .with_suggestion("Search for the file and fix the path"),
            );
        }
        if let (Some(path), Some(base)) = (&info.path, base_dir) {
            if is_outside(path, base) {
                issues.push(
                    TextureIssue::new(
                        TextureIssueKind::AbsolutePath,
                        Severity::Warning,
                        info.index,
                        format!("Texture '{}' is referenced outside the model directory", info.name),
                    )
                    .with_suggestion("Copy textures next to the model when converting"),
                );
            }
        }
        if !info.format.is_empty() && !PORTABLE_FORMATS.contains(&info.format.as_str()) {
            issues.push(
                TextureIssue::new(
                    TextureIssueKind::WrongFormat,
                    Severity::Warning,
                    info.index,
                    format!("Texture '{}' is {}, not PNG or JPEG", info.name, info.format),
                )
                .with_suggestion("Re-encode as PNG or JPEG"),
            );
        }
        if info.width.max(info.height) > max_resolution {
            issues.push(
                TextureIssue::new(
                    TextureIssueKind::Oversized,
                    Severity::Warning,
                    info.index,
                    format!(
                        "Texture '{}' is {}x{}, above {} px",
                        info.name, info.width, info.height, max_resolution
                    ),
                )
                .with_suggestion(format!("Resize to {max_resolution} px")),
            );
        }
        if info.width > 0 && info.height > 0 && !info.is_power_of_two {
            issues.push(TextureIssue::new(
                TextureIssueKind::NonPowerOfTwo,
                Severity::Info,
                info.index,
                format!("Texture '{}' is {}x{}", info.name, info.width, info.height),
            ));
        }
        if info.reference_count == 0 {
            issues.push(
                TextureIssue::new(
                    TextureIssueKind::Unused,
                    Severity::Info,
                    info.index,
                    format!("Texture '{}' is not used by any material", info.name),
                )
                .with_suggestion("Remove unused textures"),
            );
        }
    }

    for set in &duplicate_sets {
        let canonical = set[0];
        for &index in &set[1..] {
            let mut issue = TextureIssue::new(
                TextureIssueKind::Duplicate,
                Severity::Warning,
                index,
                format!(
                    "Texture '{}' is identical to '{}'",
                    textures[index].name, textures[canonical].name
                ),
            )
            .with_suggestion("Remove duplicate textures");
            issue.duplicate_indices = set.clone();
            issues.push(issue);
        }
    }

    let redundant: BTreeSet<usize> = duplicate_sets.iter().flat_map(|s| s[1..].iter().copied()).collect();
    let potential_savings = textures
        .iter()
        .filter(|t| t.reference_count == 0 || redundant.contains(&t.index))
        .map(|t| t.memory)
        .sum();

    let result = TextureAnalysisResult {
        total_textures: textures.len(),
        missing_textures: textures.iter().filter(|t| !t.exists).count(),
        unused_textures: textures.iter().filter(|t| t.reference_count == 0).count(),
        duplicate_groups: duplicate_sets.len(),
        total_memory_usage: textures.iter().map(|t| t.memory).sum(),
        potential_savings,
        duplicate_sets,
        issues,
        textures,
    };
    log::info!(
        "Analyzed {} textures: {} missing, {} unused, {} duplicate groups",
        result.total_textures,
        result.missing_textures,
        result.unused_textures,
        result.duplicate_groups
    );
    result
}

fn texture_info(scene: &SceneModel, index: usize, texture: &TextureRecord) -> TextureInfo {
    let material_indices = scene.referencing_materials(index);
    TextureInfo {
        index,
        name: texture.name.clone(),
        path: texture.path().map(Path::to_path_buf),
        exists: texture.exists(),
        width: texture.width,
        height: texture.height,
        byte_size: texture.byte_size,
        format: texture.format.clone(),
        is_power_of_two: texture.is_power_of_two(),
        reference_count: material_indices.len(),
        material_indices,
        content_hash: texture_hash(texture),
        memory: texture.memory_estimate(),
    }
}

/// Groups textures sharing a content hash. Missing textures have no hash
/// and are never grouped.
fn duplicate_sets(textures: &[TextureInfo]) -> Vec<Vec<usize>> {
    let mut by_hash: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for info in textures {
        if let Some(hash) = &info.content_hash {
            by_hash.entry(hash.as_str()).or_default().push(info.index);
        }
    }
    let mut sets: Vec<Vec<usize>> = by_hash.into_values().filter(|s| s.len() >= 2).collect();
    sets.sort_by_key(|s| s[0]);
    sets
}

pub(crate) fn is_outside(path: &Path, base: &Path) -> bool {
    let escapes = path.components().any(|c| matches!(c, Component::ParentDir));
    escapes || (path.is_absolute() && base.is_absolute() && !path.starts_with(base))
}
