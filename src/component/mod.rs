//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod photo_selector;
pub mod session;
pub mod slideshow_preview;
pub mod video_exporter;

pub use photo_selector::PhotoSelector;
pub use session::{PreviewReport, SlideshowSession};
pub use slideshow_preview::SlideshowPreview;
pub use video_exporter::VideoExporter;
