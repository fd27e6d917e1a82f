//! 由預覽經過時間重建實際播放過的照片序列

use crate::error::{ComposeError, ComposeResult};
use crate::tools::PhotoRef;

/// 重建預覽期間依序顯示過的照片
///
/// 預覽以固定停留時間循環播放，因此：
/// 1. 完整循環數 = floor(經過時間 / 循環長度)
/// 2. 未完成循環中已出現的照片數 = ceil(餘數 / 每張秒數)
/// 3. 總數至少為 1（剛開始預覽時已顯示第一張）
///
/// 停留時間先取整到毫秒，之後全部以整數運算，循環邊界不受浮點誤差影響。
pub fn reconstruct_sequence(
    photos: &[PhotoRef],
    seconds_per_photo: f64,
    elapsed_ms: u64,
) -> ComposeResult<Vec<PhotoRef>> {
    let count = slide_count(photos.len(), seconds_per_photo, elapsed_ms)?;
    Ok(photos.iter().cycle().take(count).cloned().collect())
}

/// 只計算序列長度，不複製照片
pub fn slide_count(
    photo_count: usize,
    seconds_per_photo: f64,
    elapsed_ms: u64,
) -> ComposeResult<usize> {
    if photo_count == 0 {
        return Err(ComposeError::invalid_input("照片清單不可為空"));
    }
    if !(seconds_per_photo.is_finite() && seconds_per_photo > 0.0) {
        return Err(ComposeError::invalid_input(format!(
            "每張照片秒數必須為正數: {seconds_per_photo}"
        )));
    }

    let photo_ms = dwell_ms(seconds_per_photo);
    let cycle_ms = photo_ms.saturating_mul(photo_count as u64);

    let full_cycles = elapsed_ms / cycle_ms;
    let extra_photos = (elapsed_ms % cycle_ms).div_ceil(photo_ms);

    let total = full_cycles as usize * photo_count + extra_photos as usize;
    Ok(total.max(1))
}

/// 預覽在指定時間點顯示的照片索引
pub fn current_index(photo_count: usize, seconds_per_photo: f64, elapsed_ms: u64) -> usize {
    if photo_count == 0 || !(seconds_per_photo.is_finite() && seconds_per_photo > 0.0) {
        return 0;
    }
    let slot = elapsed_ms / dwell_ms(seconds_per_photo);
    (slot % photo_count as u64) as usize
}

/// 每張停留的毫秒數，四捨五入到整數毫秒（至少 1 ms）
fn dwell_ms(seconds_per_photo: f64) -> u64 {
    ((seconds_per_photo * 1000.0).round() as u64).max(1)
}
