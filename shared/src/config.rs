use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment override for the backend base URL, the only environment
/// variable the client reads.
pub const BACKEND_URL_ENV: &str = "SIGNBRIDGE_BACKEND_URL";

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    pub backend: Option<BackendConfig>,
    pub camera: Option<CameraConfig>,
    pub ui: Option<UiConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    pub index: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
}

impl Config {
    pub fn base_url(&self) -> String {
        self.backend
            .as_ref()
            .and_then(|b| b.base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn camera_index(&self) -> i32 {
        self.camera.as_ref().and_then(|c| c.index).unwrap_or(0)
    }

    pub fn camera_width(&self) -> u32 {
        self.camera.as_ref().and_then(|c| c.width).unwrap_or(640)
    }

    pub fn camera_height(&self) -> u32 {
        self.camera.as_ref().and_then(|c| c.height).unwrap_or(480)
    }

    pub fn window_width(&self) -> f32 {
        self.ui
            .as_ref()
            .and_then(|ui| ui.window_width)
            .unwrap_or(1100.0)
    }

    pub fn window_height(&self) -> f32 {
        self.ui
            .as_ref()
            .and_then(|ui| ui.window_height)
            .unwrap_or(760.0)
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("signbridge").join("config.toml"))
        .unwrap_or_default()
}

pub fn load_config() -> Config {
    if let Ok(content) = fs::read_to_string(config_path()) {
        toml::from_str(&content).unwrap_or_default()
    } else {
        Config::default()
    }
}

/// Flag beats environment beats config file beats default.
pub fn resolve_base_url(flag: Option<String>, config: &Config) -> String {
    flag.or_else(|| std::env::var(BACKEND_URL_ENV).ok())
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| config.base_url())
}
