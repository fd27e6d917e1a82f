mod ffprobe_info;
mod file_tools;
mod path_validator;
mod photo;

pub use ffprobe_info::{MediaInfo, VideoStream, get_media_info};
pub use file_tools::{remove_file_if_exists, remove_files_best_effort};
pub use path_validator::{ensure_directory_exists, validate_directory_exists};
pub use photo::{PhotoRef, scan_photo_files};
