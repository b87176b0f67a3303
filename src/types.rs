use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::platform;

/// Raw release feed as published by the Flutter infrastructure bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseFeed {
    pub base_url: String,
    pub current_release: CurrentRelease,
    pub releases: Vec<FeedRelease>,
}

/// Hashes of the release each channel currently points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CurrentRelease {
    #[serde(default)]
    pub beta: Option<String>,
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub stable: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedRelease {
    pub hash: String,
    pub channel: String,
    pub version: String,
    #[serde(default)]
    pub dart_sdk_version: Option<String>,
    #[serde(default)]
    pub dart_sdk_arch: Option<String>,
    pub release_date: String,
    pub archive: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlutterverSettings {
    #[serde(default = "default_install_root")]
    pub install_root: String,
    #[serde(default = "default_alias_path")]
    pub alias_path: String,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
}

fn data_home() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flutterver")
}

fn default_install_root() -> String {
    data_home().join("versions").to_string_lossy().to_string()
}
fn default_alias_path() -> String {
    data_home().join("current").to_string_lossy().to_string()
}
fn default_feed_url() -> String {
    platform::default_feed_url()
}

impl Default for FlutterverSettings {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            alias_path: default_alias_path(),
            feed_url: default_feed_url(),
        }
    }
}

impl FlutterverSettings {
    /// Relative settings are taken from the working directory.
    pub fn install_root(&self) -> PathBuf {
        absolute(&self.install_root)
    }

    pub fn alias_path(&self) -> PathBuf {
        absolute(&self.alias_path)
    }
}

fn absolute(path: &str) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path))
}

/// The last successful `use`, kept for `current`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivationRecord {
    pub version: String,
    pub switched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlutterverConfig {
    #[serde(default)]
    pub settings: FlutterverSettings,
    #[serde(default)]
    pub active: Option<ActivationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
}
