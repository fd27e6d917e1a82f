use crate::config::MediaTypeTable;
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 使用者選取的一張照片
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhotoRef {
    pub id: String,
    pub source: String,
}

impl PhotoRef {
    /// 以來源位置的 blake3 摘要作為穩定識別碼
    #[must_use]
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let digest = blake3::hash(source.as_bytes()).to_hex();
        Self {
            id: digest[..16].to_string(),
            source,
        }
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::from_source(path.to_string_lossy().into_owned())
    }

    /// 顯示用名稱（檔名）
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.source
            .rsplit(['/', '\\'])
            .find(|part| !part.is_empty())
            .unwrap_or(&self.source)
    }
}

/// 掃描資料夾內的圖片，依檔名排序（不分大小寫）
pub fn scan_photo_files(directory: &Path, table: &MediaTypeTable) -> Result<Vec<PathBuf>> {
    let mut photos: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| table.is_image_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    photos.sort_by_key(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table() -> MediaTypeTable {
        MediaTypeTable {
            image_file: vec![".jpg".to_string(), ".png".to_string()],
            audio_file: vec![".mp3".to_string()],
        }
    }

    #[test]
    fn test_photo_id_is_stable() {
        let a = PhotoRef::from_source("/photos/a.jpg");
        let b = PhotoRef::from_source("/photos/a.jpg");
        let c = PhotoRef::from_source("/photos/c.jpg");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(PhotoRef::from_source("/photos/a.jpg").display_name(), "a.jpg");
        assert_eq!(
            PhotoRef::from_source("file:///sdcard/DCIM/b.png").display_name(),
            "b.png"
        );
    }

    #[test]
    fn test_scan_photo_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.JPG"), b"b").unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        fs::write(dir.path().join("song.mp3"), b"s").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.jpg"), b"c").unwrap();

        let photos = scan_photo_files(dir.path(), &table()).unwrap();
        let names: Vec<_> = photos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG"]);
    }
}
