use super::compositor::{CompositorPipeline, ExportOutcome};
use super::edit_script::SlideDurationPolicy;
use super::engine::FfmpegEngine;
use super::media_library::DirectoryLibrary;
use crate::component::session::SlideshowSession;
use crate::config::Config;
use crate::error::Stage;
use anyhow::Result;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct VideoExporter {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl VideoExporter {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self, session: &SlideshowSession) -> Result<()> {
        println!("{}", style("=== 匯出幻燈片影片 ===").cyan().bold());

        if !session.has_photos() {
            println!("{}", style("尚未選擇照片").yellow());
            return Ok(());
        }

        let settings = &self.config.settings;
        let policy = SlideDurationPolicy::try_from(&settings.slideshow)?;

        let Some(elapsed_ms) = self.resolve_elapsed_ms(session, &policy)? else {
            return Ok(());
        };

        // 上一次 Ctrl-C 留下的旗標不能影響這次匯出
        self.shutdown_signal.store(false, Ordering::SeqCst);

        let progress_bar = Self::create_progress_bar();
        let engine =
            FfmpegEngine::new(Arc::clone(&self.shutdown_signal)).with_progress_bar(progress_bar.clone());
        let library = DirectoryLibrary::new(&settings.export.library_root, ".");

        let listener_bar = progress_bar.clone();
        let pipeline = CompositorPipeline::new(engine, &library, settings.export.clone())?
            .with_output_probe(settings.export.ffprobe_path.clone())
            .with_stage_listener(move |stage| {
                listener_bar.set_position(0);
                listener_bar.set_message(Self::stage_label(stage));
            });

        let script = match pipeline.plan(&session.photos, &policy, elapsed_ms) {
            Ok(script) => script,
            Err(e) => {
                progress_bar.finish_and_clear();
                println!("{} {e}", style("無法建立播放序列:").red().bold());
                return Ok(());
            }
        };

        println!(
            "{}",
            style(format!(
                "預覽 {:.1} 秒 → {} 張投影片，影片長度 {:.1} 秒",
                elapsed_ms as f64 / 1000.0,
                script.slide_count(),
                script.exact_duration()
            ))
            .green()
        );

        progress_bar.set_length((script.exact_duration() * 1000.0).ceil() as u64);
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        let outcome = pipeline.export(&script);
        progress_bar.finish_and_clear();

        Self::print_summary(&outcome);
        Ok(())
    }

    /// 沒有預覽紀錄時，詢問是否匯出完整一輪
    fn resolve_elapsed_ms(
        &self,
        session: &SlideshowSession,
        policy: &SlideDurationPolicy,
    ) -> Result<Option<u64>> {
        if let Some(report) = session.last_preview {
            return Ok(Some(report.elapsed_ms));
        }

        let full_cycle_ms =
            (policy.seconds_per_photo * session.photos.len() as f64 * 1000.0).round() as u64;
        let confirm = Confirm::new()
            .with_prompt(format!(
                "尚未預覽，是否匯出完整一輪（{} 張照片，{:.1} 秒）？",
                session.photos.len(),
                full_cycle_ms as f64 / 1000.0
            ))
            .default(true)
            .interact()?;

        Ok(confirm.then_some(full_cycle_ms))
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar
    }

    const fn stage_label(stage: Stage) -> &'static str {
        match stage {
            Stage::Preparing => "準備編輯腳本...",
            Stage::RenderingVideo => "產生影片畫面...",
            Stage::SynthesizingAudio => "合成背景音樂...",
            Stage::Muxing => "合併影音...",
            Stage::Persisting => "存入收藏集...",
        }
    }

    fn print_summary(outcome: &ExportOutcome) {
        println!();
        println!("{}", style("=== 匯出結果 ===").cyan().bold());
        match outcome {
            ExportOutcome::Success(path) => {
                println!("  {} {}", style("完成:").green().bold(), path.display());
                info!("匯出成功: {}", path.display());
            }
            ExportOutcome::Cancelled => {
                println!("  {}", style("已取消，暫存檔已清除").yellow());
            }
            ExportOutcome::Failed { stage, error } => {
                println!(
                    "  {} {}",
                    style(format!("失敗於 {stage} 階段:")).red().bold(),
                    error
                );
                warn!("匯出失敗 [{stage}]: {error}");
            }
        }
    }
}
