use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_IGNORE_TAGS: &[&str] = &["SCRIPT", "STYLE", "TEXTAREA", "INPUT", "CODE", "PRE"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    /// Grace period before the tooltip hides after the pointer leaves
    pub hide_delay_ms: u64,
    /// How long the "copied" confirmation stays up
    pub copy_feedback_ms: u64,
    /// Distance between the label and the tooltip, in pixels
    pub gap_px: f64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            hide_delay_ms: 300,
            copy_feedback_ms: 2000,
            gap_px: 8.0,
        }
    }
}

impl TooltipConfig {
    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }
}

/// Resource identifiers for the images the page features render
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub label: String,
    pub copy: String,
    pub copied: String,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            label: "icons/icon16.png".to_string(),
            copy: "icons/copy.svg".to_string(),
            copied: "icons/copied.svg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Elements whose text is never rewritten
    pub ignore_tags: Vec<String>,

    pub tooltip: TooltipConfig,

    pub icons: IconConfig,

    /// Overrides the default nickname database location
    pub store_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "addrlabel=debug")
    pub log: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_tags: DEFAULT_IGNORE_TAGS.iter().map(|s| s.to_string()).collect(),
            tooltip: TooltipConfig::default(),
            icons: IconConfig::default(),
            store_path: None,
            log: None,
        }
    }
}

impl Config {
    pub fn nicknames_db_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("nicknames.sqlite3")))
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_from(&path)
}

pub fn load_from(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    parse(&content)
}

pub fn parse(content: &str) -> Config {
    match toml::from_str::<Config>(content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("ignoring malformed config: {err}");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ADDRLABEL_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("addrlabel").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("addrlabel").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "addrlabel", "addrlabel")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("addrlabel"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("addrlabel"));
    }
    directories::ProjectDirs::from("io", "addrlabel", "addrlabel")
        .map(|dirs| dirs.data_dir().to_path_buf())
}
