//! 照片選擇元件

mod main;

pub use main::PhotoSelector;
