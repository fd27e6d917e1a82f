//! 幻燈片預覽元件
//!
//! 在終端機輪播已選照片並播放背景音樂，記錄實際播放時間

mod main;
mod playback_clock;
mod preview_audio;

pub use main::SlideshowPreview;
pub use playback_clock::PlaybackClock;
pub use preview_audio::PreviewAudio;
