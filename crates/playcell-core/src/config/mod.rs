//! Player settings persistence and environment overrides.
//!
//! Settings live in a small JSON file under the platform data directory.
//! Unreadable or malformed files fall back to defaults so a broken settings
//! file never prevents a row from rendering.

use std::path::{Path, PathBuf};

use crate::models::PlayerSettings;
use crate::util::{normalize_text_option, parse_bool_flag};
use crate::{Error, Result};

const SETTINGS_FILE: &str = "player-settings.json";
const CACHE_DIR_NAME: &str = "audio-cache";
const ENV_STREAM_MEDIA: &str = "PLAYCELL_STREAM_MEDIA";
const ENV_CACHE_DIR: &str = "PLAYCELL_CACHE_DIR";

/// Where the effective value of `stream_media` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    SettingsFile,
    Environment,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub settings: PlayerSettings,
    pub source: SettingsSource,
}

fn data_root() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playcell")
}

pub fn default_settings_path() -> PathBuf {
    data_root().join(SETTINGS_FILE)
}

pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map_or_else(data_root, |dir| dir.join("playcell"))
        .join(CACHE_DIR_NAME)
}

pub fn load_settings_from_path(path: &Path) -> PlayerSettings {
    if !path.exists() {
        return PlayerSettings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<PlayerSettings>(&content) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    "Failed to parse player settings at {}: {}",
                    path.display(),
                    error
                );
                PlayerSettings::default()
            }
        },
        Err(error) => {
            tracing::warn!(
                "Failed to read player settings at {}: {}",
                path.display(),
                error
            );
            PlayerSettings::default()
        }
    }
}

pub fn save_settings_to_path(settings: &PlayerSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load settings from `path` and apply environment overrides.
pub fn resolve_settings(path: &Path) -> Result<ResolvedSettings> {
    resolve_settings_with(path, |key| std::env::var(key).ok())
}

/// Same as [`resolve_settings`] with an injectable environment lookup.
pub fn resolve_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSettings> {
    let mut settings = load_settings_from_path(path);
    let mut source = if path.exists() {
        SettingsSource::SettingsFile
    } else {
        SettingsSource::Default
    };

    if let Some(raw) = normalize_text_option(lookup(ENV_STREAM_MEDIA)) {
        settings.stream_media = parse_bool_flag(&raw).ok_or_else(|| {
            Error::Config(format!("{ENV_STREAM_MEDIA} must be a boolean, got '{raw}'"))
        })?;
        source = SettingsSource::Environment;
    }

    if let Some(dir) = normalize_text_option(lookup(ENV_CACHE_DIR)) {
        settings.cache_dir = Some(PathBuf::from(dir));
    }

    Ok(ResolvedSettings { settings, source })
}

/// Effective cache directory for `settings`.
pub fn cache_dir_for(settings: &PlayerSettings) -> PathBuf {
    settings
        .cache_dir
        .clone()
        .unwrap_or_else(default_cache_dir)
}
