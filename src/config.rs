use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{WaveformError, WaveformResult};
use crate::render::raster::RenderStyle;
use crate::waveform::column::AggregateKind;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub waveform: WaveformConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub encode: EncodeConfig,
}

#[derive(Debug, Deserialize)]
pub struct WaveformConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_small_width")]
    pub small_width: usize,
    #[serde(default)]
    pub aggregate: AggregateKind,
}

#[derive(Debug, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_foreground")]
    pub foreground: [u8; 3],
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    #[serde(default)]
    pub normalize: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct EncodeConfig {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub bitrate: Option<String>,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            small_width: default_small_width(),
            aggregate: AggregateKind::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            height: default_height(),
            foreground: default_foreground(),
            background: default_background(),
            normalize: false,
        }
    }
}

impl ImageConfig {
    pub fn style(&self) -> RenderStyle {
        RenderStyle {
            foreground: self.foreground,
            background: self.background,
            normalize: self.normalize,
        }
    }
}

pub fn default_width() -> usize { 1800 }
pub fn default_small_width() -> usize { 800 }
pub fn default_height() -> u32 { 140 }
fn default_foreground() -> [u8; 3] { RenderStyle::default().foreground }
fn default_background() -> [u8; 3] { RenderStyle::default().background }

pub fn load_config(path: &Path) -> WaveformResult<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WaveformError::Config(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| WaveformError::Config(format!("{}: {}", path.display(), e)))
}

/// `./waveformgen.toml`, then `~/.config/waveformgen/config.toml`, then the
/// platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("waveformgen.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("waveformgen").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("waveformgen").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
