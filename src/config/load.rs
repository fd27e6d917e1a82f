use crate::config::types::{Config, MediaTypeTable, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 編譯時嵌入的媒體類型表（不需要外部檔案）
const MEDIA_TYPE_TABLE_JSON: &str = include_str!("../data/media_types.json");

pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let media_type_table = Self::load_embedded_media_type_table()?;
        let settings = match Self::load_settings(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("讀取設定失敗，改用預設值: {e:#}");
                UserSettings::default()
            }
        };

        Ok(Self {
            media_type_table,
            settings,
        })
    }

    pub fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: UserSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        let errors = settings.validation_errors();
        if !errors.is_empty() {
            anyhow::bail!("Invalid settings in {}: {}", path.display(), errors.join("; "));
        }

        Ok(settings)
    }

    /// 從編譯時嵌入的 JSON 載入媒體類型表
    fn load_embedded_media_type_table() -> Result<MediaTypeTable> {
        serde_json::from_str(MEDIA_TYPE_TABLE_JSON).context("無法解析嵌入的媒體類型設定")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Config::load_settings(&dir.path().join("settings.json")).unwrap();
        assert!((settings.slideshow.seconds_per_photo - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_settings_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"slideshow":{"seconds_per_photo":-1}}"#).unwrap();
        assert!(Config::load_settings(&path).is_err());
    }

    #[test]
    fn test_embedded_table_parses() {
        let table = Config::load_embedded_media_type_table().unwrap();
        assert!(table.is_image_file(Path::new("a.jpeg")));
        assert!(table.is_audio_file(Path::new("a.mp3")));
    }
}
