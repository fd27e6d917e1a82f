pub mod load;
pub mod save;
pub mod types;

pub use types::{
    Config, ExportSettings, Language, MAX_PHOTOS, MAX_RECENT_PATHS, MediaTypeTable,
    SlideshowSettings, UserSettings,
};
