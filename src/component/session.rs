use crate::tools::PhotoRef;

/// 最近一次預覽的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewReport {
    /// 實際播放的毫秒數（不含暫停時間）
    pub elapsed_ms: u64,
    pub slides_shown: usize,
}

/// 一次編輯工作階段：選取的照片與最近一次預覽
#[derive(Debug, Default, Clone)]
pub struct SlideshowSession {
    pub photos: Vec<PhotoRef>,
    pub last_preview: Option<PreviewReport>,
}

impl SlideshowSession {
    /// 換照片後舊的預覽時間就不再對應
    pub fn replace_photos(&mut self, photos: Vec<PhotoRef>) {
        self.photos = photos;
        self.last_preview = None;
    }

    #[must_use]
    pub fn has_photos(&self) -> bool {
        !self.photos.is_empty()
    }
}
