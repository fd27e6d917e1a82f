//! 將完成的影片放入使用者可瀏覽的收藏集

use super::edit_script::normalize_locator;
use crate::error::{ComposeError, ComposeResult};
use crate::tools::{ensure_directory_exists, remove_file_if_exists};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 收藏集（相簿／資料夾）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub location: PathBuf,
}

pub trait MediaLibrary {
    /// 將素材參照轉成實際可讀的檔案路徑
    fn materialize(&self, asset: &str) -> ComposeResult<PathBuf>;

    /// 收藏集不存在時建立，否則沿用
    fn ensure_collection(&self, name: &str) -> ComposeResult<Collection>;

    /// 將檔案放入收藏集，回傳最終路徑
    fn commit(&self, file: &Path, collection: &Collection) -> ComposeResult<PathBuf>;
}

impl<L: MediaLibrary + ?Sized> MediaLibrary for &L {
    fn materialize(&self, asset: &str) -> ComposeResult<PathBuf> {
        (**self).materialize(asset)
    }

    fn ensure_collection(&self, name: &str) -> ComposeResult<Collection> {
        (**self).ensure_collection(name)
    }

    fn commit(&self, file: &Path, collection: &Collection) -> ComposeResult<PathBuf> {
        (**self).commit(file, collection)
    }
}

/// 以本機資料夾實作的媒體庫：收藏集即子資料夾
pub struct DirectoryLibrary {
    root: PathBuf,
    asset_root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>, asset_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            asset_root: asset_root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_writable(dir: &Path) -> ComposeResult<()> {
        let metadata = fs::metadata(dir)
            .map_err(|e| ComposeError::from_storage_io(format!("無法讀取 {}", dir.display()), &e))?;
        if metadata.permissions().readonly() {
            return Err(ComposeError::PermissionDenied(format!(
                "收藏集為唯讀: {}",
                dir.display()
            )));
        }
        Ok(())
    }

    /// 目標檔名已存在時加上數字後綴，不覆蓋既有影片
    fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
        let candidate = dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");
        let extension = path.extension().and_then(|s| s.to_str());

        (1..)
            .map(|n| match extension {
                Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
                None => dir.join(format!("{stem} ({n})")),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }

    fn move_file(from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                // 跨檔案系統時 rename 會失敗，改用複製後刪除
                warn!("rename 失敗，改用複製: {rename_err}");
                Self::copy_then_remove(from, to, |path| fs::remove_file(path))
            }
        }
    }

    /// 複製失敗時刪除不完整的目標檔；
    /// 複製完成後來源刪不掉只記錄，影片已經在收藏集內
    fn copy_then_remove(
        from: &Path,
        to: &Path,
        remove_source: impl FnOnce(&Path) -> io::Result<()>,
    ) -> io::Result<()> {
        if let Err(copy_err) = fs::copy(from, to) {
            if let Err(e) = remove_file_if_exists(to) {
                warn!("無法刪除不完整的檔案 {}: {e}", to.display());
            }
            return Err(copy_err);
        }

        if let Err(e) = remove_source(from) {
            warn!("已複製到 {}，但無法刪除來源 {}: {e}", to.display(), from.display());
        }
        Ok(())
    }
}

impl MediaLibrary for DirectoryLibrary {
    fn materialize(&self, asset: &str) -> ComposeResult<PathBuf> {
        let local = normalize_locator(asset)?;
        let path = Path::new(&local);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        };

        if !resolved.is_file() {
            return Err(ComposeError::invalid_input(format!(
                "找不到音訊素材: {}",
                resolved.display()
            )));
        }
        Ok(resolved)
    }

    fn ensure_collection(&self, name: &str) -> ComposeResult<Collection> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed == ".." {
            return Err(ComposeError::Persistence(format!("不合法的收藏集名稱: {name:?}")));
        }

        let location = self.root.join(trimmed);
        ensure_directory_exists(&location).map_err(|e| {
            ComposeError::from_storage_io(format!("無法建立收藏集 {}", location.display()), &e)
        })?;
        Self::check_writable(&location)?;

        Ok(Collection {
            name: trimmed.to_string(),
            location,
        })
    }

    fn commit(&self, file: &Path, collection: &Collection) -> ComposeResult<PathBuf> {
        let file_name = file
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ComposeError::Persistence(format!("無法取得檔案名稱: {}", file.display())))?;

        if !file.is_file() {
            return Err(ComposeError::Persistence(format!(
                "輸出檔案不存在: {}",
                file.display()
            )));
        }
        Self::check_writable(&collection.location)?;

        let destination = Self::unique_destination(&collection.location, file_name);
        Self::move_file(file, &destination).map_err(|e| {
            ComposeError::from_storage_io(format!("無法存入 {}", destination.display()), &e)
        })?;

        info!("已存入收藏集 {}: {}", collection.name, destination.display());
        Ok(destination)
    }
}
