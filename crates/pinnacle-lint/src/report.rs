//! Validation result types.

use pinnacle_scene::{ModelFormat, SceneStatistics};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory, never blocks validity.
    Info,
    /// Likely problem, worth investigating.
    Warning,
    /// Broken for at least some consumers.
    Error,
    /// The scene data itself is inconsistent.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Whether an issue at this severity makes the model invalid.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area of the model a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationCategory {
    Format,
    Mesh,
    Material,
    Texture,
    Hierarchy,
    Animation,
    Performance,
    Compliance,
}

impl ValidationCategory {
    pub const ALL: [ValidationCategory; 8] = [
        ValidationCategory::Format,
        ValidationCategory::Mesh,
        ValidationCategory::Material,
        ValidationCategory::Texture,
        ValidationCategory::Hierarchy,
        ValidationCategory::Animation,
        ValidationCategory::Performance,
        ValidationCategory::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCategory::Format => "format",
            ValidationCategory::Mesh => "mesh",
            ValidationCategory::Material => "material",
            ValidationCategory::Texture => "texture",
            ValidationCategory::Hierarchy => "hierarchy",
            ValidationCategory::Animation => "animation",
            ValidationCategory::Performance => "performance",
            ValidationCategory::Compliance => "compliance",
        }
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Rule that produced the issue (e.g. "mesh/non-manifold").
    pub rule_id: String,
    pub category: ValidationCategory,
    pub severity: Severity,
    /// Short headline.
    pub title: String,
    pub message: String,
    /// Name of the affected mesh, material, texture or node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_name: Option<String>,
}

impl ValidationIssue {
    /// Creates an issue with the required fields.
    pub fn new(
        rule_id: impl Into<String>,
        category: ValidationCategory,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            severity,
            title: title.into(),
            message: message.into(),
            object_name: None,
            suggestion: None,
            texture_index: None,
            mesh_name: None,
        }
    }

    /// Builder method to set the affected object name.
    pub fn with_object(mut self, name: impl Into<String>) -> Self {
        self.object_name = Some(name.into());
        self
    }

    /// Builder method to set a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder method to correlate the issue with a texture.
    pub fn with_texture(mut self, index: usize) -> Self {
        self.texture_index = Some(index);
        self
    }

    /// Builder method to correlate the issue with a mesh. Also sets the
    /// object name when none is set.
    pub fn with_mesh(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.object_name.is_none() {
            self.object_name = Some(name.clone());
        }
        self.mesh_name = Some(name);
        self
    }
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.error + self.warning + self.info
    }
}

/// Topology summary for one mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshValidationResult {
    pub mesh_index: usize,
    pub mesh_name: String,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub has_geometry: bool,
    pub has_normals: bool,
    pub has_tex_coords: bool,
    pub is_manifold: bool,
    pub is_watertight: bool,
    pub non_manifold_edges: usize,
    pub boundary_edges: usize,
    pub degenerate_triangles: usize,
    pub duplicate_vertices: usize,
}

/// Complete outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelValidationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    pub model_format: ModelFormat,
    /// True iff there are no critical and no error issues.
    pub is_valid: bool,
    /// True iff no compliance issue is an error or critical.
    pub is_gltf_compliant: bool,
    pub counts: SeverityCounts,
    /// Issues in rule execution order.
    pub issues: Vec<ValidationIssue>,
    pub mesh_results: Vec<MeshValidationResult>,
    pub metrics: SceneStatistics,
    pub recommendations: Vec<String>,
    /// Wall-clock validation time in milliseconds.
    pub validation_time_ms: u64,
}

impl ModelValidationResult {
    /// Creates an empty result for a scene.
    pub fn new(model_path: Option<PathBuf>, model_format: ModelFormat, metrics: SceneStatistics) -> Self {
        Self {
            model_path,
            model_format,
            is_valid: true,
            is_gltf_compliant: true,
            counts: SeverityCounts::default(),
            issues: Vec::new(),
            mesh_results: Vec::new(),
            metrics,
            recommendations: Vec::new(),
            validation_time_ms: 0,
        }
    }

    /// Adds an issue and updates the counts and validity flags.
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.counts.record(issue.severity);
        if issue.severity.is_blocking() {
            self.is_valid = false;
            if issue.category == ValidationCategory::Compliance {
                self.is_gltf_compliant = false;
            }
        }
        self.issues.push(issue);
    }

    /// Issues at exactly `severity`.
    pub fn issues_with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Issues produced by one rule.
    pub fn issues_for_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues.iter().filter(move |i| i.rule_id == rule_id)
    }

    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.issues.iter().any(|i| i.rule_id == rule_id)
    }

    /// Serializes the result as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
