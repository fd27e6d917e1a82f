//! 幻燈片合成管線
//!
//! 五個階段依序執行，前一階段的輸出檔是下一階段的輸入：
//! A. Preparing：建立工作資料夾、清除殘留中間檔、寫入並驗證編輯腳本
//! B. RenderingVideo：concat 腳本 → 固定解析度、固定幀率的無聲影片
//! C. SynthesizingAudio：背景音樂循環並裁切到影片長度加上緩衝
//! D. Muxing：影片串流直接複製，音訊重新編碼，以較短者為準
//! E. Persisting：存入收藏集並刪除中間檔
//!
//! 任何階段失敗或取消都會盡力清除中間檔與未完成的輸出檔，
//! 清除失敗只記錄，不覆蓋原本的錯誤。

use super::edit_script::{EditScript, SlideDurationPolicy};
use super::engine::{EncodingEngine, EngineOutcome};
use super::ffmpeg_command::{
    FfmpegCommand, MuxParams, RenderVideoParams, Resolution, SynthesizeAudioParams,
};
use super::media_library::MediaLibrary;
use super::sequence::reconstruct_sequence;
use crate::config::ExportSettings;
use crate::error::{ComposeError, ComposeResult, Stage};
use crate::tools::{
    PhotoRef, ensure_directory_exists, get_media_info, remove_file_if_exists,
    remove_files_best_effort,
};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// 匯出結果
#[derive(Debug)]
pub enum ExportOutcome {
    Success(PathBuf),
    Cancelled,
    Failed { stage: Stage, error: ComposeError },
}

impl ExportOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> ComposeResult<PathBuf> {
        match self {
            Self::Success(path) => Ok(path),
            Self::Cancelled => Err(ComposeError::Cancelled),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// 單次匯出擁有的所有檔案路徑
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub token: String,
    pub edit_script_path: PathBuf,
    pub audio_source_path: Option<PathBuf>,
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub output_path: PathBuf,
    pub temp_video_path: PathBuf,
    pub temp_audio_path: PathBuf,
}

impl EncodeJob {
    /// 產生唯一識別字串：毫秒時間戳 + 隨機碼
    #[must_use]
    pub fn unique_token() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let random = Uuid::new_v4().simple().to_string();
        format!("{millis}-{}", &random[..8])
    }

    #[must_use]
    pub fn new(
        work_directory: &Path,
        prefix: &str,
        token: &str,
        resolution: Resolution,
        frame_rate: u32,
    ) -> Self {
        let temp_stem = format!("{}{token}", Self::temp_prefix(prefix));
        Self {
            token: token.to_string(),
            edit_script_path: work_directory.join(format!("{temp_stem}.concat.txt")),
            audio_source_path: None,
            resolution,
            frame_rate,
            output_path: work_directory.join(format!("{prefix}_{token}.mp4")),
            temp_video_path: work_directory.join(format!("{temp_stem}.video.mp4")),
            temp_audio_path: work_directory.join(format!("{temp_stem}.audio.m4a")),
        }
    }

    /// 中間檔共用的檔名前綴，用來辨識殘留檔案
    #[must_use]
    pub fn temp_prefix(prefix: &str) -> String {
        format!(".{prefix}-")
    }

    #[must_use]
    pub fn intermediate_paths(&self) -> [&Path; 3] {
        [
            &self.edit_script_path,
            &self.temp_video_path,
            &self.temp_audio_path,
        ]
    }

    /// 冪等清除中間檔，回傳刪除失敗的數量
    pub fn cleanup_intermediates(&self) -> usize {
        remove_files_best_effort(self.intermediate_paths())
    }
}

pub struct CompositorPipeline<E, L> {
    engine: E,
    library: L,
    settings: ExportSettings,
    resolution: Resolution,
    output_probe: Option<String>,
    stage_listener: Option<Box<dyn Fn(Stage)>>,
}

impl<E: EncodingEngine, L: MediaLibrary> CompositorPipeline<E, L> {
    pub fn new(engine: E, library: L, settings: ExportSettings) -> ComposeResult<Self> {
        let resolution = Resolution::new(settings.width, settings.height)?;
        if settings.frame_rate == 0 {
            return Err(ComposeError::invalid_input("幀率必須為正數"));
        }
        if !(settings.audio_padding_seconds.is_finite() && settings.audio_padding_seconds >= 1.0) {
            return Err(ComposeError::invalid_input(format!(
                "音訊緩衝至少 1 秒: {}",
                settings.audio_padding_seconds
            )));
        }

        Ok(Self {
            engine,
            library,
            settings,
            resolution,
            output_probe: None,
            stage_listener: None,
        })
    }

    /// 封裝後以 ffprobe 檢查輸出長度
    #[must_use]
    pub fn with_output_probe(mut self, ffprobe: impl Into<String>) -> Self {
        self.output_probe = Some(ffprobe.into());
        self
    }

    #[must_use]
    pub fn with_stage_listener(mut self, listener: impl Fn(Stage) + 'static) -> Self {
        self.stage_listener = Some(Box::new(listener));
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// 由經過時間重建序列並產生編輯腳本
    pub fn plan(
        &self,
        photos: &[PhotoRef],
        policy: &SlideDurationPolicy,
        elapsed_ms: u64,
    ) -> ComposeResult<EditScript> {
        let sequence = reconstruct_sequence(photos, policy.seconds_per_photo, elapsed_ms)?;
        let script = EditScript::build(&sequence, policy)?;
        info!(
            "預覽 {elapsed_ms} ms → {} 張投影片，輸出長度 {:.3}s",
            script.slide_count(),
            script.exact_duration()
        );
        Ok(script)
    }

    /// 重建序列後直接匯出
    pub fn export_session(
        &self,
        photos: &[PhotoRef],
        policy: &SlideDurationPolicy,
        elapsed_ms: u64,
    ) -> ExportOutcome {
        match self.plan(photos, policy, elapsed_ms) {
            Ok(script) => self.export(&script),
            Err(error) => ExportOutcome::Failed {
                stage: Stage::Preparing,
                error,
            },
        }
    }

    pub fn export(&self, script: &EditScript) -> ExportOutcome {
        let mut job = EncodeJob::new(
            &self.settings.work_directory,
            &self.settings.output_prefix,
            &EncodeJob::unique_token(),
            self.resolution,
            self.settings.frame_rate,
        );
        self.export_job(&mut job, script)
    }

    pub fn export_job(&self, job: &mut EncodeJob, script: &EditScript) -> ExportOutcome {
        let mut stage = Stage::Preparing;
        info!("開始匯出 [{}]", job.token);

        match self.run_stages(job, script, &mut stage) {
            Ok(final_path) => {
                info!("匯出完成 [{}]: {}", job.token, final_path.display());
                ExportOutcome::Success(final_path)
            }
            Err(ComposeError::Cancelled) => {
                warn!("匯出已取消 [{}]，階段: {stage}", job.token);
                Self::cleanup_after_failure(job);
                ExportOutcome::Cancelled
            }
            Err(error) => {
                error!("匯出失敗 [{}]，階段: {stage}: {error}", job.token);
                Self::cleanup_after_failure(job);
                ExportOutcome::Failed { stage, error }
            }
        }
    }

    fn enter(&self, current: &mut Stage, next: Stage) {
        *current = next;
        debug!("進入階段: {next}");
        if let Some(listener) = &self.stage_listener {
            listener(next);
        }
    }

    fn run_stages(
        &self,
        job: &mut EncodeJob,
        script: &EditScript,
        stage: &mut Stage,
    ) -> ComposeResult<PathBuf> {
        self.enter(stage, Stage::Preparing);
        self.prepare(job, script)?;

        self.enter(stage, Stage::RenderingVideo);
        self.render_video(job, script)?;

        self.enter(stage, Stage::SynthesizingAudio);
        self.synthesize_audio(job, script)?;

        self.enter(stage, Stage::Muxing);
        self.mux(job)?;
        self.probe_output(job, script);

        self.enter(stage, Stage::Persisting);
        let collection = self.library.ensure_collection(&self.settings.collection_name)?;
        let final_path = self.library.commit(&job.output_path, &collection)?;

        let failures = job.cleanup_intermediates();
        if failures > 0 {
            warn!("匯出成功，但有 {failures} 個中間檔無法刪除");
        }
        Ok(final_path)
    }

    fn prepare(&self, job: &EncodeJob, script: &EditScript) -> ComposeResult<()> {
        let work_directory = &self.settings.work_directory;
        ensure_directory_exists(work_directory).map_err(|e| {
            ComposeError::preparation(format!("無法建立工作資料夾 {}", work_directory.display()), e)
        })?;

        for path in job.intermediate_paths() {
            remove_file_if_exists(path).map_err(|e| {
                ComposeError::preparation(format!("無法清除殘留檔案 {}", path.display()), e)
            })?;
        }
        self.sweep_stale_artifacts();

        let content = script.render();
        fs::write(&job.edit_script_path, &content).map_err(|e| {
            ComposeError::preparation(
                format!("無法寫入編輯腳本 {}", job.edit_script_path.display()),
                e,
            )
        })?;

        // 重新讀取檔案資訊確認寫入完整
        let written = fs::metadata(&job.edit_script_path).map_err(|e| {
            ComposeError::preparation(
                format!("編輯腳本寫入後不存在 {}", job.edit_script_path.display()),
                e,
            )
        })?;
        if written.len() == 0 || written.len() != content.len() as u64 {
            return Err(ComposeError::preparation_msg(format!(
                "編輯腳本大小不符: 預期 {} bytes，實際 {} bytes",
                content.len(),
                written.len()
            )));
        }

        debug!("編輯腳本已寫入: {}", job.edit_script_path.display());
        Ok(())
    }

    /// 清除過期的中間檔（先前程式中斷時留下的）
    fn sweep_stale_artifacts(&self) {
        if self.settings.stale_artifact_hours == 0 {
            return;
        }
        let max_age = Duration::from_secs(self.settings.stale_artifact_hours * 3600);
        let prefix = EncodeJob::temp_prefix(&self.settings.output_prefix);

        let Ok(entries) = fs::read_dir(&self.settings.work_directory) else {
            return;
        };
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let is_stale = entry
                .metadata()
                .ok()
                .filter(std::fs::Metadata::is_file)
                .and_then(|m| m.modified().ok())
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > max_age);
            if is_stale {
                match remove_file_if_exists(&entry.path()) {
                    Ok(_) => info!("已清除過期中間檔: {}", entry.path().display()),
                    Err(e) => warn!("無法清除過期中間檔 {}: {e}", entry.path().display()),
                }
            }
        }
    }

    fn run_engine(&self, stage: Stage, command: &FfmpegCommand) -> ComposeResult<()> {
        info!("[{stage}] {}", command.command_line());
        match self.engine.execute(command) {
            EngineOutcome::Success => {
                let produced = fs::metadata(command.output())
                    .map(|m| m.len() > 0)
                    .unwrap_or(false);
                if produced {
                    Ok(())
                } else {
                    Err(ComposeError::Engine {
                        stage,
                        diagnostic: format!(
                            "引擎回報成功但輸出檔不存在或為空: {}",
                            command.output().display()
                        ),
                    })
                }
            }
            EngineOutcome::Failure { diagnostic } => Err(ComposeError::Engine { stage, diagnostic }),
            EngineOutcome::Cancelled => Err(ComposeError::Cancelled),
        }
    }

    fn render_video(&self, job: &EncodeJob, script: &EditScript) -> ComposeResult<()> {
        let command = FfmpegCommand::render_video(
            &self.settings.ffmpeg_path,
            &RenderVideoParams {
                edit_script: &job.edit_script_path,
                resolution: job.resolution,
                frame_rate: job.frame_rate,
                video_codec: &self.settings.video_codec,
                exact_duration: script.exact_duration(),
                output: &job.temp_video_path,
            },
        )?;
        self.run_engine(Stage::RenderingVideo, &command)
    }

    fn synthesize_audio(&self, job: &mut EncodeJob, script: &EditScript) -> ComposeResult<()> {
        let source = self.library.materialize(&self.settings.background_audio)?;
        job.audio_source_path = Some(source.clone());

        let command = FfmpegCommand::synthesize_audio(
            &self.settings.ffmpeg_path,
            &SynthesizeAudioParams {
                source: &source,
                duration: script.exact_duration() + self.settings.audio_padding_seconds,
                audio_codec: &self.settings.audio_codec,
                audio_bitrate: &self.settings.audio_bitrate,
                output: &job.temp_audio_path,
            },
        )?;
        self.run_engine(Stage::SynthesizingAudio, &command)
    }

    fn mux(&self, job: &EncodeJob) -> ComposeResult<()> {
        let command = FfmpegCommand::mux(
            &self.settings.ffmpeg_path,
            &MuxParams {
                video: &job.temp_video_path,
                audio: &job.temp_audio_path,
                audio_codec: &self.settings.audio_codec,
                audio_bitrate: &self.settings.audio_bitrate,
                output: &job.output_path,
            },
        )?;
        self.run_engine(Stage::Muxing, &command)
    }

    /// 長度誤差超過一幀只記錄警告
    fn probe_output(&self, job: &EncodeJob, script: &EditScript) {
        let Some(ffprobe) = &self.output_probe else {
            return;
        };
        match get_media_info(ffprobe, &job.output_path) {
            Ok(info) => {
                let drift = (info.duration_seconds - script.exact_duration()).abs();
                let frame = 1.0 / f64::from(job.frame_rate);
                if drift > frame {
                    warn!(
                        "輸出長度 {:.3}s 與預期 {:.3}s 相差 {drift:.3}s",
                        info.duration_seconds,
                        script.exact_duration()
                    );
                } else {
                    debug!("輸出長度 {:.3}s", info.duration_seconds);
                }
                if !info.has_audio {
                    warn!("輸出檔缺少音訊串流: {}", job.output_path.display());
                }
            }
            Err(e) => debug!("無法檢查輸出長度: {e:#}"),
        }
    }

    fn cleanup_after_failure(job: &EncodeJob) {
        let failures = remove_files_best_effort(
            job.intermediate_paths()
                .into_iter()
                .chain(std::iter::once(job.output_path.as_path())),
        );
        if failures > 0 {
            warn!("[{}] 有 {failures} 個暫存檔無法刪除", job.token);
        }
    }
}
