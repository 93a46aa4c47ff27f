//! Optimization profiles and their performance budgets.
//!
//! A profile names a target platform. Budgets are pure lookups keyed by
//! profile so the statistics engine, the validator and the optimizer all
//! agree on the same thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target platform preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationProfile {
    Mobile,
    #[default]
    Desktop,
    Vr,
    Ar,
    Web,
    Console,
    /// Independent toggles; budgets fall back to desktop.
    Custom,
}

impl OptimizationProfile {
    /// The six named presets.
    pub const PRESETS: [OptimizationProfile; 6] = [
        OptimizationProfile::Mobile,
        OptimizationProfile::Desktop,
        OptimizationProfile::Vr,
        OptimizationProfile::Ar,
        OptimizationProfile::Web,
        OptimizationProfile::Console,
    ];

    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationProfile::Mobile => "mobile",
            OptimizationProfile::Desktop => "desktop",
            OptimizationProfile::Vr => "vr",
            OptimizationProfile::Ar => "ar",
            OptimizationProfile::Web => "web",
            OptimizationProfile::Console => "console",
            OptimizationProfile::Custom => "custom",
        }
    }
}

impl fmt::Display for OptimizationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(OptimizationProfile::Mobile),
            "desktop" => Ok(OptimizationProfile::Desktop),
            "vr" => Ok(OptimizationProfile::Vr),
            "ar" => Ok(OptimizationProfile::Ar),
            "web" => Ok(OptimizationProfile::Web),
            "console" => Ok(OptimizationProfile::Console),
            "custom" => Ok(OptimizationProfile::Custom),
            other => Err(format!(
                "unknown profile '{}' (expected mobile, desktop, vr, ar, web, console or custom)",
                other
            )),
        }
    }
}

const MIB: u64 = 1024 * 1024;

/// Resource thresholds a scene is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBudget {
    /// Triangles across the whole scene.
    pub max_triangles: usize,
    /// Decompressed texture bytes.
    pub max_texture_memory: u64,
    /// Estimated draw calls.
    pub max_draw_calls: usize,
    /// Largest texture edge in pixels.
    pub max_texture_resolution: u32,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        Self::desktop()
    }
}

impl PerformanceBudget {
    /// Returns the budget for a profile.
    pub fn for_profile(profile: OptimizationProfile) -> Self {
        match profile {
            OptimizationProfile::Mobile => Self::mobile(),
            OptimizationProfile::Desktop | OptimizationProfile::Custom => Self::desktop(),
            OptimizationProfile::Vr => Self::vr(),
            OptimizationProfile::Ar => Self::ar(),
            OptimizationProfile::Web => Self::web(),
            OptimizationProfile::Console => Self::console(),
        }
    }

    /// Phones and tablets.
    pub fn mobile() -> Self {
        Self {
            max_triangles: 100_000,
            max_texture_memory: 64 * MIB,
            max_draw_calls: 100,
            max_texture_resolution: 1024,
        }
    }

    pub fn desktop() -> Self {
        Self {
            max_triangles: 1_000_000,
            max_texture_memory: 512 * MIB,
            max_draw_calls: 1_000,
            max_texture_resolution: 4096,
        }
    }

    /// Standalone headsets rendering two eyes at high frame rates.
    pub fn vr() -> Self {
        Self {
            max_triangles: 300_000,
            max_texture_memory: 256 * MIB,
            max_draw_calls: 250,
            max_texture_resolution: 2048,
        }
    }

    /// AR Quick Look style viewers.
    pub fn ar() -> Self {
        Self {
            max_triangles: 100_000,
            max_texture_memory: 64 * MIB,
            max_draw_calls: 50,
            max_texture_resolution: 2048,
        }
    }

    pub fn web() -> Self {
        Self {
            max_triangles: 200_000,
            max_texture_memory: 128 * MIB,
            max_draw_calls: 150,
            max_texture_resolution: 2048,
        }
    }

    pub fn console() -> Self {
        Self {
            max_triangles: 2_000_000,
            max_texture_memory: 1024 * MIB,
            max_draw_calls: 2_000,
            max_texture_resolution: 4096,
        }
    }
}
