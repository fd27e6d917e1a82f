use log::{debug, warn};
use std::fs;
use std::io;
use std::path::Path;

/// 冪等刪除檔案：檔案不存在時回傳 `Ok(false)`
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("已刪除檔案: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// 盡力刪除一組檔案，失敗只記錄警告，回傳失敗數量
pub fn remove_files_best_effort<'a, I>(paths: I) -> usize
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut failures = 0;
    for path in paths {
        if let Err(e) = remove_file_if_exists(path) {
            warn!("無法刪除檔案 {}: {e}", path.display());
            failures += 1;
        }
    }
    failures
}
