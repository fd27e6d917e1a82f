//! concat demuxer 使用的編輯腳本
//!
//! 每張照片輸出兩行：
//! ```text
//! file '<locator>'
//! duration <seconds>
//! ```
//! 最後再重複一次最後一張照片，長度為 `final_frame_seconds`，
//! 否則 concat demuxer 會截掉最後一張的停留時間。

use crate::config::SlideshowSettings;
use crate::error::{ComposeError, ComposeResult};
use crate::tools::PhotoRef;
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

const FILE_SCHEME: &str = "file://";

static REGEX_URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideDurationPolicy {
    pub seconds_per_photo: f64,
    pub final_frame_seconds: f64,
}

impl SlideDurationPolicy {
    pub fn new(seconds_per_photo: f64, final_frame_seconds: f64) -> ComposeResult<Self> {
        for (name, value) in [
            ("seconds_per_photo", seconds_per_photo),
            ("final_frame_seconds", final_frame_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ComposeError::invalid_input(format!(
                    "{name} 必須為正數: {value}"
                )));
            }
        }
        Ok(Self {
            seconds_per_photo,
            final_frame_seconds,
        })
    }
}

impl Default for SlideDurationPolicy {
    fn default() -> Self {
        Self {
            seconds_per_photo: 3.0,
            final_frame_seconds: 0.1,
        }
    }
}

impl TryFrom<&SlideshowSettings> for SlideDurationPolicy {
    type Error = ComposeError;

    fn try_from(settings: &SlideshowSettings) -> ComposeResult<Self> {
        Self::new(settings.seconds_per_photo, settings.final_frame_seconds)
    }
}

/// 去除 `file://` 前綴並檢查位置字串能否安全寫入腳本或命令列
pub fn normalize_locator(locator: &str) -> ComposeResult<String> {
    let stripped = locator.strip_prefix(FILE_SCHEME).unwrap_or(locator);

    if stripped.is_empty() {
        return Err(ComposeError::unsupported_locator(locator, "位置為空"));
    }
    if REGEX_URI_SCHEME.is_match(stripped) {
        return Err(ComposeError::unsupported_locator(
            locator,
            "只支援本機檔案路徑",
        ));
    }
    if stripped.contains('\'') {
        return Err(ComposeError::unsupported_locator(locator, "包含單引號"));
    }
    if stripped.chars().any(char::is_control) {
        return Err(ComposeError::unsupported_locator(
            locator,
            "包含換行或控制字元",
        ));
    }
    if stripped.starts_with('-') {
        return Err(ComposeError::unsupported_locator(
            locator,
            "開頭為 '-' 會被當成參數",
        ));
    }

    Ok(stripped.to_string())
}

/// 寫進腳本的位置一律是絕對路徑
///
/// concat demuxer 以腳本所在資料夾解析相對路徑，而腳本放在工作資料夾內。
fn script_locator(source: &str) -> ComposeResult<String> {
    let local = normalize_locator(source)?;
    if Path::new(&local).is_absolute() {
        return Ok(local);
    }
    let absolute = std::path::absolute(&local)
        .map_err(|e| ComposeError::preparation(format!("無法解析照片路徑 {local}"), e))?;
    normalize_path(&absolute)
}

pub fn normalize_path(path: &Path) -> ComposeResult<String> {
    let text = path.to_str().ok_or_else(|| {
        ComposeError::unsupported_locator(path.to_string_lossy(), "路徑不是有效的 UTF-8")
    })?;
    normalize_locator(text)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditEntry {
    pub locator: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditScript {
    entries: Vec<EditEntry>,
    exact_duration: f64,
}

impl EditScript {
    pub fn build(sequence: &[PhotoRef], policy: &SlideDurationPolicy) -> ComposeResult<Self> {
        let Some(last) = sequence.last() else {
            return Err(ComposeError::invalid_input("照片序列不可為空"));
        };

        let mut entries = sequence
            .iter()
            .map(|photo| {
                Ok(EditEntry {
                    locator: script_locator(&photo.source)?,
                    duration: policy.seconds_per_photo,
                })
            })
            .collect::<ComposeResult<Vec<_>>>()?;

        entries.push(EditEntry {
            locator: script_locator(&last.source)?,
            duration: policy.final_frame_seconds,
        });

        let exact_duration =
            sequence.len() as f64 * policy.seconds_per_photo + policy.final_frame_seconds;

        Ok(Self {
            entries,
            exact_duration,
        })
    }

    /// 含結尾 sentinel 的所有項目
    #[must_use]
    pub fn entries(&self) -> &[EditEntry] {
        &self.entries
    }

    /// 實際照片數（不含 sentinel）
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.entries.len() - 1
    }

    /// 後續所有階段都以此長度為準
    #[must_use]
    pub const fn exact_duration(&self) -> f64 {
        self.exact_duration
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut script = String::new();
        for entry in &self.entries {
            let _ = writeln!(script, "file '{}'", entry.locator);
            let _ = writeln!(script, "duration {}", entry.duration);
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(names: &[&str]) -> Vec<PhotoRef> {
        names.iter().map(|n| PhotoRef::from_source(*n)).collect()
    }

    #[test]
    fn test_entries_and_sentinel() {
        let policy = SlideDurationPolicy::default();
        let script = EditScript::build(&sequence(&["/p/a.jpg", "/p/b.jpg", "/p/a.jpg"]), &policy)
            .unwrap();

        assert_eq!(script.entries().len(), 4);
        assert_eq!(script.slide_count(), 3);
        for entry in &script.entries()[..3] {
            assert!((entry.duration - 3.0).abs() < 1e-9);
        }
        let sentinel = script.entries().last().unwrap();
        assert_eq!(sentinel.locator, "/p/a.jpg");
        assert!((sentinel.duration - 0.1).abs() < 1e-9);

        let total: f64 = script.entries().iter().map(|e| e.duration).sum();
        assert!((total - script.exact_duration()).abs() < 1e-6);
        assert!((script.exact_duration() - 9.1).abs() < 1e-6);
    }

    #[test]
    fn test_single_photo_duration() {
        let script =
            EditScript::build(&sequence(&["/p/a.jpg"]), &SlideDurationPolicy::default()).unwrap();
        assert!((script.exact_duration() - 3.1).abs() < 1e-6);
    }

    #[test]
    fn test_render_format() {
        let policy = SlideDurationPolicy::new(2.5, 0.1).unwrap();
        let script =
            EditScript::build(&sequence(&["file:///p/a.jpg", "/p/b.jpg"]), &policy).unwrap();
        assert_eq!(
            script.render(),
            "file '/p/a.jpg'\nduration 2.5\n\
             file '/p/b.jpg'\nduration 2.5\n\
             file '/p/b.jpg'\nduration 0.1\n"
        );
    }

    #[test]
    fn test_relative_locators_become_absolute() {
        let script =
            EditScript::build(&sequence(&["photos/a.jpg"]), &SlideDurationPolicy::default())
                .unwrap();
        let expected = std::env::current_dir().unwrap().join("photos/a.jpg");

        for entry in script.entries() {
            assert!(Path::new(&entry.locator).is_absolute(), "{}", entry.locator);
            assert_eq!(Path::new(&entry.locator), expected);
        }
    }

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(matches!(
            EditScript::build(&[], &SlideDurationPolicy::default()),
            Err(ComposeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unsafe_locators_rejected() {
        let policy = SlideDurationPolicy::default();
        for bad in [
            "/p/it's.jpg",
            "/p/a\nfile '/etc/passwd'",
            "content://media/external/images/1",
            "https://example.com/a.jpg",
            "file://",
            "-i.jpg",
        ] {
            assert!(
                matches!(
                    EditScript::build(&sequence(&[bad]), &policy),
                    Err(ComposeError::UnsupportedLocator { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_normalize_locator_keeps_windows_paths() {
        assert_eq!(
            normalize_locator(r"C:\Users\me\a.jpg").unwrap(),
            r"C:\Users\me\a.jpg"
        );
        assert_eq!(normalize_locator("file:///tmp/x.png").unwrap(), "/tmp/x.png");
    }

    #[test]
    fn test_policy_validation() {
        assert!(SlideDurationPolicy::new(0.0, 0.1).is_err());
        assert!(SlideDurationPolicy::new(3.0, -0.1).is_err());
        assert!(SlideDurationPolicy::new(f64::INFINITY, 0.1).is_err());
        assert!(SlideDurationPolicy::new(3.0, 0.1).is_ok());
    }
}
