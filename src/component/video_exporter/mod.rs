//! 幻燈片影片匯出元件
//!
//! 由預覽經過時間重建播放序列，再透過 ffmpeg 三階段產生影片

mod compositor;
mod edit_script;
mod engine;
mod ffmpeg_command;
mod main;
mod media_library;
mod sequence;

pub use compositor::{CompositorPipeline, EncodeJob, ExportOutcome};
pub use edit_script::{
    EditEntry, EditScript, SlideDurationPolicy, normalize_locator, normalize_path,
};
pub use engine::{EncodingEngine, EngineOutcome, FfmpegEngine};
pub use ffmpeg_command::{
    FfmpegCommand, MuxParams, RenderVideoParams, Resolution, SynthesizeAudioParams,
};
pub use main::VideoExporter;
pub use media_library::{Collection, DirectoryLibrary, MediaLibrary};
pub use sequence::{current_index, reconstruct_sequence, slide_count};
