//! Scene configuration (window, graphics, assets, effect toggles). Loaded from config.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assets::TextureSlot;

/// Where a texture comes from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TextureSource {
    /// Generated at startup by `procgen`.
    #[default]
    Procedural,
    /// Image file, relative to `asset_dir` unless absolute.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextureSources {
    #[serde(default)]
    pub detail_noise: TextureSource,
    #[serde(default)]
    pub flow_map: TextureSource,
    #[serde(default)]
    pub smoke: TextureSource,
    #[serde(default)]
    pub leaf_one: TextureSource,
    #[serde(default)]
    pub leaf_two: TextureSource,
    #[serde(default)]
    pub bark: TextureSource,
}

impl TextureSources {
    pub fn source(&self, slot: TextureSlot) -> &TextureSource {
        match slot {
            TextureSlot::DetailNoise => &self.detail_noise,
            TextureSlot::FlowMap => &self.flow_map,
            TextureSlot::Smoke => &self.smoke,
            TextureSlot::LeafOne => &self.leaf_one,
            TextureSlot::LeafTwo => &self.leaf_two,
            TextureSlot::Bark => &self.bark,
        }
    }
}

/// Model files, relative to `asset_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPaths {
    #[serde(default = "default_tree_model")]
    pub tree: PathBuf,
    #[serde(default = "default_homespace_model")]
    pub homespace: PathBuf,
    #[serde(default = "default_island_model")]
    pub islands: PathBuf,
}

fn default_tree_model() -> PathBuf {
    PathBuf::from("tree.glb")
}
fn default_homespace_model() -> PathBuf {
    PathBuf::from("homespace.glb")
}
fn default_island_model() -> PathBuf {
    PathBuf::from("island.glb")
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            tree: default_tree_model(),
            homespace: default_homespace_model(),
            islands: default_island_model(),
        }
    }
}

/// Per-effect switches. A disabled effect is never built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectToggles {
    #[serde(default = "default_true")]
    pub cloud: bool,
    #[serde(default = "default_true")]
    pub fog: bool,
    #[serde(default = "default_true")]
    pub trees: bool,
    #[serde(default = "default_true")]
    pub islands: bool,
    #[serde(default = "default_true")]
    pub homespace: bool,
}

impl Default for EffectToggles {
    fn default() -> Self {
        Self {
            cloud: true,
            fog: true,
            trees: true,
            islands: true,
            homespace: true,
        }
    }
}

/// Persistent scene settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Enable vsync (recommended to avoid tearing).
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Start in fullscreen.
    #[serde(default)]
    pub fullscreen: bool,
    /// Mouse sensitivity multiplier (1.0 = default).
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Fly speed in units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Device pixel ratio for the cloud depth target. `None` uses the window's scale factor.
    #[serde(default)]
    pub pixel_ratio: Option<f32>,
    /// Seed for fog, islands and procedural textures. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Grid segments per side of the cloud plane.
    #[serde(default = "default_cloud_subdivisions")]
    pub cloud_subdivisions: u32,
    /// Position of the scene's directional light.
    #[serde(default = "default_sun_position")]
    pub sun_position: [f32; 3],
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    #[serde(default)]
    pub models: ModelPaths,
    #[serde(default)]
    pub textures: TextureSources,
    #[serde(default)]
    pub effects: EffectToggles,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}
fn default_sensitivity() -> f32 {
    1.0
}
fn default_move_speed() -> f32 {
    20.0
}
fn default_cloud_subdivisions() -> u32 {
    512
}
fn default_sun_position() -> [f32; 3] {
    [50.0, 100.0, 50.0]
}
fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            vsync: default_true(),
            fullscreen: false,
            sensitivity: default_sensitivity(),
            move_speed: default_move_speed(),
            pixel_ratio: None,
            seed: None,
            cloud_subdivisions: default_cloud_subdivisions(),
            sun_position: default_sun_position(),
            asset_dir: default_asset_dir(),
            models: ModelPaths::default(),
            textures: TextureSources::default(),
            effects: EffectToggles::default(),
        }
    }
}

impl SceneConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match ron::from_str(&data) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Invalid config at {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::warn!("No config at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Resolve an asset path against `asset_dir`.
    pub fn asset_path(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.asset_dir.join(relative)
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let c: SceneConfig = ron::from_str("()").unwrap();
        assert_eq!(c.window_width, 1280);
        assert_eq!(c.cloud_subdivisions, 512);
        assert!(c.effects.cloud && c.effects.fog && c.effects.trees);
        assert_eq!(c.textures.smoke, TextureSource::Procedural);
        assert_eq!(c.pixel_ratio, None);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let c: SceneConfig = ron::from_str(
            r#"(
                seed: Some(7),
                pixel_ratio: Some(2.0),
                effects: (fog: false),
                textures: (smoke: File("textures/Smoke18.png")),
            )"#,
        )
        .unwrap();
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.pixel_ratio, Some(2.0));
        assert!(!c.effects.fog);
        assert!(c.effects.cloud);
        assert_eq!(c.textures.smoke, TextureSource::File(PathBuf::from("textures/Smoke18.png")));
        assert_eq!(c.textures.bark, TextureSource::Procedural);
        assert_eq!(c.textures.source(TextureSlot::Smoke), &c.textures.smoke);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let c = SceneConfig::load_from(Path::new("/definitely/not/here/config.ron"));
        assert_eq!(c.window_height, 720);
    }

    #[test]
    fn asset_paths_resolve_against_asset_dir() {
        let c = SceneConfig::default();
        assert_eq!(c.asset_path(Path::new("tree.glb")), PathBuf::from("assets/tree.glb"));
        assert_eq!(c.asset_path(Path::new("/abs/x.png")), PathBuf::from("/abs/x.png"));
    }

    #[test]
    fn config_round_trips_through_ron() {
        let mut c = SceneConfig::default();
        c.seed = Some(42);
        let text = ron::ser::to_string_pretty(&c, ron::ser::PrettyConfig::default()).unwrap();
        let back: SceneConfig = ron::from_str(&text).unwrap();
        assert_eq!(back.seed, Some(42));
        assert_eq!(back.models, c.models);
    }
}
