use super::playback_clock::PlaybackClock;
use super::preview_audio::PreviewAudio;
use crate::component::session::{PreviewReport, SlideshowSession};
use crate::component::video_exporter::{
    DirectoryLibrary, MediaLibrary, current_index, slide_count,
};
use crate::config::Config;
use crate::tools::{PhotoRef, get_media_info};
use anyhow::Result;
use console::{Key, Term, style};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const RENDER_INTERVAL: Duration = Duration::from_millis(200);

/// 終端機內的幻燈片預覽
///
/// 以與匯出相同的每張秒數輪播，結束時把實際播放時間記錄到工作階段，
/// 匯出時據此重建序列。
pub struct SlideshowPreview {
    config: Config,
}

impl SlideshowPreview {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, term: &Term, session: &mut SlideshowSession) -> Result<()> {
        println!("{}", style("=== 幻燈片預覽 ===").cyan().bold());

        if !session.has_photos() {
            println!("{}", style("尚未選擇照片").yellow());
            return Ok(());
        }

        println!(
            "{}",
            style("空白鍵：暫停／繼續　Enter 或 q：結束預覽").dim()
        );

        let seconds_per_photo = self.config.settings.slideshow.seconds_per_photo;
        let mut audio = self.open_audio();
        let clock = Arc::new(Mutex::new(PlaybackClock::new()));
        let stop_render = Arc::new(AtomicBool::new(false));

        if let Some(player) = audio.as_mut() {
            if let Err(e) = player.start() {
                warn!("背景音樂無法播放，改為靜音預覽: {e:#}");
                audio = None;
            }
        }
        if let Ok(mut clock) = clock.lock() {
            clock.start();
        }

        let renderer = Self::spawn_renderer(
            term.clone(),
            session.photos.clone(),
            seconds_per_photo,
            Arc::clone(&clock),
            Arc::clone(&stop_render),
        );

        let key_result = Self::handle_keys(term, &clock, audio.as_mut());

        stop_render.store(true, Ordering::SeqCst);
        let _ = renderer.join();
        if let Some(mut player) = audio.take() {
            player.stop_and_release();
        }
        let elapsed_ms = clock.lock().map_or(0, |mut clock| {
            clock.stop();
            clock.elapsed_ms()
        });
        key_result?;

        let slides_shown = slide_count(session.photos.len(), seconds_per_photo, elapsed_ms)?;
        session.last_preview = Some(PreviewReport {
            elapsed_ms,
            slides_shown,
        });

        println!();
        println!(
            "{}",
            style(format!(
                "預覽結束：播放 {:.1} 秒，共顯示 {slides_shown} 張投影片",
                elapsed_ms as f64 / 1000.0
            ))
            .green()
        );
        info!("預覽結束: {elapsed_ms} ms, {slides_shown} 張");
        Ok(())
    }

    /// 背景音樂與匯出使用同一份素材
    fn open_audio(&self) -> Option<PreviewAudio> {
        let export = &self.config.settings.export;
        let library = DirectoryLibrary::new(&export.library_root, ".");
        match library.materialize(&export.background_audio) {
            Ok(source) => {
                let loop_length = get_media_info(&export.ffprobe_path, &source)
                    .map(|info| info.duration_seconds)
                    .ok();
                Some(PreviewAudio::new(&export.ffplay_path, &source, loop_length))
            }
            Err(e) => {
                warn!("找不到背景音樂，改為靜音預覽: {e}");
                None
            }
        }
    }

    fn handle_keys(
        term: &Term,
        clock: &Mutex<PlaybackClock>,
        mut audio: Option<&mut PreviewAudio>,
    ) -> Result<()> {
        loop {
            match term.read_key()? {
                Key::Char(' ' | 'p' | 'P') => {
                    let Ok(mut clock) = clock.lock() else {
                        continue;
                    };
                    if clock.is_running() {
                        clock.pause();
                        if let Some(player) = audio.as_deref_mut() {
                            player.pause();
                        }
                    } else {
                        clock.resume();
                        if let Some(player) = audio.as_deref_mut() {
                            if let Err(e) = player.resume() {
                                warn!("背景音樂無法繼續播放: {e:#}");
                            }
                        }
                    }
                }
                Key::Enter | Key::Escape | Key::Char('q' | 'Q') => return Ok(()),
                _ => {}
            }
        }
    }

    fn spawn_renderer(
        term: Term,
        photos: Vec<PhotoRef>,
        seconds_per_photo: f64,
        clock: Arc<Mutex<PlaybackClock>>,
        stop: Arc<AtomicBool>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let mut rendered = false;
            while !stop.load(Ordering::SeqCst) {
                let snapshot = clock.lock().map(|clock| *clock).unwrap_or_default();
                let elapsed_ms = snapshot.elapsed_ms();
                let index = current_index(photos.len(), seconds_per_photo, elapsed_ms);
                let status = if snapshot.is_running() { "▶" } else { "⏸" };

                let line = format!(
                    "{status} {:>7.1}s  [{}/{}]  {}",
                    elapsed_ms as f64 / 1000.0,
                    index + 1,
                    photos.len(),
                    photos[index].display_name()
                );

                if rendered {
                    let _ = term.clear_last_lines(1);
                }
                let _ = term.write_line(&line);
                rendered = true;

                thread::sleep(RENDER_INTERVAL);
            }
        })
    }
}
