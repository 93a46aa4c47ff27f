//! Target engines and their material conventions.

use crate::scene::TextureChannel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Green-channel convention of a tangent-space normal map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalMapFormat {
    /// Y+ (glTF, Unity, Godot, Blender).
    #[default]
    OpenGl,
    /// Y- (Unreal, DirectX tooling).
    DirectX,
}

/// Engine a converted or fixed asset is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEngine {
    UnityBuiltIn,
    UnityUrp,
    UnityHdrp,
    Unreal,
    Godot,
    #[default]
    GenericPbr,
}

impl TargetEngine {
    pub const ALL: [TargetEngine; 6] = [
        TargetEngine::UnityBuiltIn,
        TargetEngine::UnityUrp,
        TargetEngine::UnityHdrp,
        TargetEngine::Unreal,
        TargetEngine::Godot,
        TargetEngine::GenericPbr,
    ];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            TargetEngine::UnityBuiltIn => "Unity (Built-in)",
            TargetEngine::UnityUrp => "Unity URP",
            TargetEngine::UnityHdrp => "Unity HDRP",
            TargetEngine::Unreal => "Unreal Engine",
            TargetEngine::Godot => "Godot",
            TargetEngine::GenericPbr => "Generic PBR",
        }
    }

    /// Snake-case identifier.
    pub fn id(&self) -> &'static str {
        match self {
            TargetEngine::UnityBuiltIn => "unity_built_in",
            TargetEngine::UnityUrp => "unity_urp",
            TargetEngine::UnityHdrp => "unity_hdrp",
            TargetEngine::Unreal => "unreal",
            TargetEngine::Godot => "godot",
            TargetEngine::GenericPbr => "generic_pbr",
        }
    }

    /// Normal map convention the engine expects.
    pub fn normal_map_format(&self) -> NormalMapFormat {
        match self {
            TargetEngine::Unreal => NormalMapFormat::DirectX,
            _ => NormalMapFormat::OpenGl,
        }
    }

    /// Returns true if the engine's standard material has an input for the
    /// channel.
    pub fn supports_channel(&self, channel: TextureChannel) -> bool {
        match self {
            TargetEngine::UnityBuiltIn => !matches!(channel, TextureChannel::Roughness | TextureChannel::MetallicRoughness),
            TargetEngine::UnityUrp => !matches!(channel, TextureChannel::Roughness | TextureChannel::MetallicRoughness),
            TargetEngine::UnityHdrp => channel != TextureChannel::Roughness,
            TargetEngine::Unreal | TargetEngine::Godot | TargetEngine::GenericPbr => true,
        }
    }
}

impl fmt::Display for TargetEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        TargetEngine::ALL
            .into_iter()
            .find(|engine| engine.id() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = TargetEngine::ALL.iter().map(|e| e.id()).collect();
                format!("unknown engine '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
