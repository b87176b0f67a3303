use crate::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "flutterver";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const CONFIG_ENV: &str = "FLUTTERVER_CONFIG";
pub const ROOT_ENV: &str = "FLUTTERVER_ROOT";
pub const ALIAS_ENV: &str = "FLUTTERVER_ALIAS";
pub const FEED_URL_ENV: &str = "FLUTTERVER_FEED_URL";

pub const SETTING_KEYS: [&str; 3] = ["install_root", "alias_path", "feed_url"];

pub fn get_config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(APP_NAME)
        .join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn load_config() -> Result<FlutterverConfig> {
    let config_path = get_config_file_path()?;

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file at {}", config_path.display()))?;
        serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")?
    } else {
        FlutterverConfig::default()
    };

    apply_env_overrides(&mut config.settings);
    Ok(config)
}

fn apply_env_overrides(settings: &mut FlutterverSettings) {
    if let Ok(root) = std::env::var(ROOT_ENV) {
        settings.install_root = root;
    }
    if let Ok(alias) = std::env::var(ALIAS_ENV) {
        settings.alias_path = alias;
    }
    if let Ok(url) = std::env::var(FEED_URL_ENV) {
        settings.feed_url = url;
    }
}

pub fn save_config(config: &FlutterverConfig) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)
        .with_context(|| format!("Could not write config file at {}", config_path.display()))?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &FlutterverSettings, key: &str) -> Option<String> {
    match normalize_key(key).as_str() {
        "install_root" => Some(settings.install_root.clone()),
        "alias_path" => Some(settings.alias_path.clone()),
        "feed_url" => Some(settings.feed_url.clone()),
        _ => None,
    }
}

/// Set (or with `None`, reset to default) a setting. Returns false for unknown keys.
pub fn set_setting(settings: &mut FlutterverSettings, key: &str, value: Option<&str>) -> bool {
    let defaults = FlutterverSettings::default();
    let slot = match normalize_key(key).as_str() {
        "install_root" => (&mut settings.install_root, defaults.install_root),
        "alias_path" => (&mut settings.alias_path, defaults.alias_path),
        "feed_url" => (&mut settings.feed_url, defaults.feed_url),
        _ => return false,
    };
    *slot.0 = value.map(str::to_string).unwrap_or(slot.1);
    true
}
