#![allow(dead_code)]

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http::auth::UserGroup;

/// The fixed `-size:<0-7>` resolution table. Index 7 is the
/// largest entry; `-size:8`/`-size:9` are out of range and rejected by the
/// CLI parser rather than silently clamped.
pub const RESOLUTIONS: [(u32, u32); 8] = [
    (160, 120),
    (320, 240),
    (432, 240),
    (640, 480),
    (800, 448),
    (1024, 576),
    (1280, 720),
    (1920, 1080),
];

pub fn resolution_for_index(index: u8) -> Option<(u32, u32)> {
    RESOLUTIONS.get(index as usize).copied()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CamwebConfig {
    pub camera: CameraConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Index into [`RESOLUTIONS`].
    #[serde(default = "default_size_index")]
    pub size_index: u8,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Overlay title burned into frames when set.
    #[serde(default)]
    pub title: Option<String>,

    /// Device path for the GStreamer backend, e.g. `/dev/video0`.
    #[serde(default = "default_device")]
    pub device: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_admin_port")]
    pub admin_port: u16,

    /// Static file root served for any path not otherwise claimed by a
    /// handler.
    #[serde(default)]
    pub web_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_realm")]
    pub realm: String,

    /// `-htpass:<path>` user file.
    #[serde(default)]
    pub htpasswd_path: Option<PathBuf>,

    #[serde(default = "default_viewer_group")]
    pub viewer_group: String,

    #[serde(default = "default_config_group")]
    pub config_group: String,
}

impl AuthConfig {
    pub fn viewer_group(&self) -> UserGroup {
        parse_group(&self.viewer_group)
    }

    pub fn config_group(&self) -> UserGroup {
        parse_group(&self.config_group)
    }
}

fn parse_group(raw: &str) -> UserGroup {
    match raw {
        "user" => UserGroup::User,
        "admin" => UserGroup::Admin,
        _ => UserGroup::Anyone,
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilesConfig {
    /// `-fcfg:<path>`: where camera property state is persisted between
    /// runs.
    #[serde(default)]
    pub camera_config_path: Option<PathBuf>,
}

fn default_size_index() -> u8 {
    3
}
fn default_fps() -> u32 {
    15
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_device() -> String {
    "/dev/video0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_admin_port() -> u16 {
    8081
}
fn default_realm() -> String {
    "camweb".to_string()
}
fn default_viewer_group() -> String {
    "any".to_string()
}
fn default_config_group() -> String {
    "admin".to_string()
}

impl Default for CamwebConfig {
    fn default() -> Self {
        CamwebConfig {
            camera: CameraConfig {
                size_index: default_size_index(),
                fps: default_fps(),
                jpeg_quality: default_jpeg_quality(),
                title: None,
                device: default_device(),
            },
            http: HttpConfig {
                port: default_port(),
                admin_port: default_admin_port(),
                web_root: None,
            },
            auth: AuthConfig {
                realm: default_realm(),
                htpasswd_path: None,
                viewer_group: default_viewer_group(),
                config_group: default_config_group(),
            },
            files: FilesConfig {
                camera_config_path: None,
            },
        }
    }
}

impl CamwebConfig {
    /// Layer a TOML file (if present) and `CAMWEB_*` environment variables
    /// over the built-in defaults.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        debug!("loading configuration, base file: {path}");
        let builder = Config::builder()
            .add_source(Config::try_from(&CamwebConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CAMWEB").separator("__"));
        let config = builder.build()?;
        let parsed: CamwebConfig = config.try_deserialize()?;
        info!(
            "configuration resolved (size_index={}, fps={}, port={})",
            parsed.camera.size_index, parsed.camera.fps, parsed.http.port
        );
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if resolution_for_index(self.camera.size_index).is_none() {
            return Err(ConfigError::Message(format!(
                "size index {} is out of range (0-7)",
                self.camera.size_index
            )));
        }
        if !(1..=30).contains(&self.camera.fps) {
            return Err(ConfigError::Message(format!(
                "fps {} out of range (1-30)",
                self.camera.fps
            )));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "jpeg quality {} out of range (1-100)",
                self.camera.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(CamwebConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_size_index_fails_validation() {
        let mut config = CamwebConfig::default();
        config.camera.size_index = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn group_strings_parse_to_user_group() {
        let mut auth = CamwebConfig::default().auth;
        auth.viewer_group = "admin".to_string();
        assert_eq!(auth.viewer_group(), UserGroup::Admin);
        auth.viewer_group = "bogus".to_string();
        assert_eq!(auth.viewer_group(), UserGroup::Anyone);
    }
}
