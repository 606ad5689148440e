use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    /// Initial parameter values, applied after the first successful load.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_width() -> u32 { 1024 }
fn default_height() -> u32 { 768 }
fn default_fps() -> u32 { 60 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_debounce_ms() -> u64 { 50 }

/// `./shaderdeck.toml`, then `~/.config/shaderdeck/config.toml`, then the
/// platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("shaderdeck.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("shaderdeck").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("shaderdeck").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config: {}", err);
            None
        }
    }
}
