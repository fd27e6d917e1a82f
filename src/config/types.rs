use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 5;

/// 單次匯出可選取的照片上限
pub const MAX_PHOTOS: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTypeTable {
    #[serde(rename = "IMAGE_FILE")]
    pub image_file: Vec<String>,
    #[serde(rename = "AUDIO_FILE")]
    pub audio_file: Vec<String>,
}

impl MediaTypeTable {
    fn extension_matches(extensions: &[String], path: &Path) -> bool {
        let wanted: HashSet<String> = extensions.iter().map(|ext| ext.to_lowercase()).collect();
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| wanted.contains(&format!(".{}", ext.to_lowercase())))
    }

    #[must_use]
    pub fn is_image_file(&self, path: &Path) -> bool {
        Self::extension_matches(&self.image_file, path)
    }

    #[must_use]
    pub fn is_audio_file(&self, path: &Path) -> bool {
        Self::extension_matches(&self.audio_file, path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 播放節奏設定，預覽與匯出共用同一份
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideshowSettings {
    pub seconds_per_photo: f64,
    pub final_frame_seconds: f64,
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            seconds_per_photo: 3.0,
            final_frame_seconds: 0.1,
        }
    }
}

/// 影片輸出與 ffmpeg 參數設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// 音訊比影片多留的秒數，避免封裝時音訊不足
    pub audio_padding_seconds: f64,
    pub background_audio: String,
    pub work_directory: PathBuf,
    pub library_root: PathBuf,
    pub collection_name: String,
    pub output_prefix: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub ffplay_path: String,
    /// 超過此時數的殘留中間檔會在下次匯出時清除
    pub stale_artifact_hours: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            frame_rate: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            audio_padding_seconds: 1.0,
            background_audio: "assets/audio/background-music.mp3".to_string(),
            work_directory: PathBuf::from("slideshow_work"),
            library_root: PathBuf::from("library"),
            collection_name: "Downloads".to_string(),
            output_prefix: "slideshow".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            ffplay_path: "ffplay".to_string(),
            stale_artifact_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub slideshow: SlideshowSettings,
    pub export: ExportSettings,
    pub recent_paths: Vec<String>,
}

impl UserSettings {
    /// 回傳所有不合法的設定項目，空集合代表設定有效
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let slideshow = &self.slideshow;
        let export = &self.export;

        if !(slideshow.seconds_per_photo.is_finite() && slideshow.seconds_per_photo > 0.0) {
            errors.push(format!(
                "seconds_per_photo must be positive, got {}",
                slideshow.seconds_per_photo
            ));
        }
        if !(slideshow.final_frame_seconds.is_finite() && slideshow.final_frame_seconds > 0.0) {
            errors.push(format!(
                "final_frame_seconds must be positive, got {}",
                slideshow.final_frame_seconds
            ));
        }
        if export.width == 0 || export.height == 0 || export.width % 2 != 0 || export.height % 2 != 0
        {
            errors.push(format!(
                "resolution must be non-zero and even, got {}x{}",
                export.width, export.height
            ));
        }
        if export.frame_rate == 0 {
            errors.push("frame_rate must be positive".to_string());
        }
        if !(export.audio_padding_seconds.is_finite() && export.audio_padding_seconds >= 1.0) {
            errors.push(format!(
                "audio_padding_seconds must be at least 1, got {}",
                export.audio_padding_seconds
            ));
        }
        if export.collection_name.trim().is_empty() {
            errors.push("collection_name must not be empty".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub media_type_table: MediaTypeTable,
    pub settings: UserSettings,
}
