use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::shader::ShaderQuality;

/// Player defaults persisted as JSON in the user config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Initial volume, 0..=100.
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub looped: bool,
    #[serde(default)]
    pub shader_quality: ShaderQuality,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    #[serde(default = "default_synthetic_fps")]
    pub synthetic_fps: f64,
}

fn default_version() -> u32 { 1 }
fn default_volume() -> u8 { 100 }
fn default_ffmpeg() -> String { "ffmpeg".to_string() }
fn default_ffprobe() -> String { "ffprobe".to_string() }
fn default_synthetic_fps() -> f64 { 30.0 }

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            version: 1,
            volume: 100,
            looped: false,
            shader_quality: ShaderQuality::Fast,
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            synthetic_fps: 30.0,
        }
    }
}

impl MovieConfig {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("movie-sprite").join("movie.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, falling back to defaults when missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(mut config) => {
                    config.volume = config.volume.min(100);
                    log::info!("Loaded movie config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse movie config: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No movie config found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize movie config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write movie config {}", path.display()))?;
        log::debug!("Saved movie config to {}", path.display());
        Ok(())
    }
}
