//! E2E 測試：以真正的 ffmpeg 產生幻燈片影片
//!
//! 系統未安裝 ffmpeg / ffprobe 時自動跳過

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use slideshow_composer::component::video_exporter::{
    CompositorPipeline, DirectoryLibrary, ExportOutcome, FfmpegEngine, SlideDurationPolicy,
};
use slideshow_composer::config::ExportSettings;
use slideshow_composer::tools::{PhotoRef, get_media_info};

fn tool_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

fn pick_video_codec() -> &'static str {
    let has_x264 = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .is_ok_and(|output| String::from_utf8_lossy(&output.stdout).contains("libx264"));
    if has_x264 { "libx264" } else { "mpeg4" }
}

fn generate(args: &[&str], output: &Path) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(args)
        .arg(output)
        .status()
        .unwrap();
    assert!(status.success(), "無法產生測試素材 {}", output.display());
}

#[test]
fn test_slideshow_export_with_real_ffmpeg() {
    if !tool_available("ffmpeg") || !tool_available("ffprobe") {
        println!("跳過測試：找不到 ffmpeg / ffprobe");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let photo_dir = root.join("photos");
    let asset_dir = root.join("assets");
    fs::create_dir_all(&photo_dir).unwrap();
    fs::create_dir_all(&asset_dir).unwrap();

    let mut photos = Vec::new();
    for (name, color) in [("a.png", "red"), ("b.png", "blue")] {
        let path = photo_dir.join(name);
        // 故意使用與輸出不同的長寬比，驗證補黑邊
        generate(
            &["-f", "lavfi", "-i", &format!("color=c={color}:s=200x300"), "-frames:v", "1"],
            &path,
        );
        photos.push(PhotoRef::from_path(&path));
    }
    generate(
        &["-f", "lavfi", "-i", "sine=frequency=440:duration=2", "-c:a", "aac"],
        &asset_dir.join("music.m4a"),
    );

    let settings = ExportSettings {
        width: 320,
        height: 240,
        frame_rate: 10,
        video_codec: pick_video_codec().to_string(),
        background_audio: "music.m4a".to_string(),
        work_directory: root.join("work"),
        library_root: root.join("library"),
        ..ExportSettings::default()
    };
    let policy = SlideDurationPolicy::new(1.0, 0.1).unwrap();
    let engine = FfmpegEngine::new(Arc::new(AtomicBool::new(false)));
    let library = DirectoryLibrary::new(root.join("library"), &asset_dir);
    let pipeline = CompositorPipeline::new(engine, &library, settings)
        .unwrap()
        .with_output_probe("ffprobe");

    // 2.5 秒、每張 1 秒：[A, B, A]，總長 3.1 秒
    let outcome = pipeline.export_session(&photos, &policy, 2500);
    let path = match outcome {
        ExportOutcome::Success(path) => path,
        other => panic!("匯出失敗: {other:?}"),
    };

    assert!(path.starts_with(root.join("library").join("Downloads")));

    let info = get_media_info("ffprobe", &path).unwrap();
    assert!(info.has_audio, "輸出應包含音訊");
    let video = info.video.expect("輸出應包含影像");
    assert_eq!((video.width, video.height), (320, 240));
    assert!(
        (info.duration_seconds - 3.1).abs() < 0.35,
        "長度 {} 與預期 3.1 秒相差過多",
        info.duration_seconds
    );

    let leftovers: Vec<_> = fs::read_dir(root.join("work"))
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert!(leftovers.is_empty(), "工作資料夾應已清空");
}
