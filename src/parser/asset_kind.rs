//! Scannable asset detection by file extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Structured-data asset types whose text can carry references.
///
/// Anything else (textures, meshes, scripts, audio) is dropped from a
/// changeset before any I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Scene,
    Prefab,
    ScriptableObject,
    Material,
    AnimatorController,
    AnimatorOverride,
    AnimationClip,
    AvatarMask,
    PhysicsMaterial,
    RenderTexture,
    Timeline,
    AudioMixer,
    SpriteAtlas,
    TerrainLayer,
    LightingSettings,
    GuiSkin,
    FontSettings,
}

impl AssetKind {
    /// Detect the asset kind from a file extension (case-sensitive, as on disk).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "unity" => Some(AssetKind::Scene),
            "prefab" => Some(AssetKind::Prefab),
            "asset" => Some(AssetKind::ScriptableObject),
            "mat" => Some(AssetKind::Material),
            "controller" => Some(AssetKind::AnimatorController),
            "overrideController" => Some(AssetKind::AnimatorOverride),
            "anim" => Some(AssetKind::AnimationClip),
            "mask" => Some(AssetKind::AvatarMask),
            "physicMaterial" | "physicsMaterial2D" => Some(AssetKind::PhysicsMaterial),
            "renderTexture" => Some(AssetKind::RenderTexture),
            "playable" => Some(AssetKind::Timeline),
            "mixer" => Some(AssetKind::AudioMixer),
            "spriteatlas" => Some(AssetKind::SpriteAtlas),
            "terrainlayer" => Some(AssetKind::TerrainLayer),
            "lighting" => Some(AssetKind::LightingSettings),
            "guiskin" => Some(AssetKind::GuiSkin),
            "fontsettings" => Some(AssetKind::FontSettings),
            _ => None,
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Scene => "Scene",
            AssetKind::Prefab => "Prefab",
            AssetKind::ScriptableObject => "ScriptableObject",
            AssetKind::Material => "Material",
            AssetKind::AnimatorController => "AnimatorController",
            AssetKind::AnimatorOverride => "AnimatorOverrideController",
            AssetKind::AnimationClip => "AnimationClip",
            AssetKind::AvatarMask => "AvatarMask",
            AssetKind::PhysicsMaterial => "PhysicsMaterial",
            AssetKind::RenderTexture => "RenderTexture",
            AssetKind::Timeline => "Timeline",
            AssetKind::AudioMixer => "AudioMixer",
            AssetKind::SpriteAtlas => "SpriteAtlas",
            AssetKind::TerrainLayer => "TerrainLayer",
            AssetKind::LightingSettings => "LightingSettings",
            AssetKind::GuiSkin => "GUISkin",
            AssetKind::FontSettings => "FontSettings",
        }
    }
}
