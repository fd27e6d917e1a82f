//! 外部編碼引擎（ffmpeg 程序）的執行介面

use super::ffmpeg_command::FfmpegCommand;
use indicatif::ProgressBar;
use log::{debug, error, warn};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 診斷訊息只保留 stderr 最後幾行
const DIAGNOSTIC_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    Success,
    Failure { diagnostic: String },
    Cancelled,
}

/// 接收一個命令、回報成功／失敗／取消
pub trait EncodingEngine {
    fn execute(&self, command: &FfmpegCommand) -> EngineOutcome;
}

impl<E: EncodingEngine + ?Sized> EncodingEngine for &E {
    fn execute(&self, command: &FfmpegCommand) -> EngineOutcome {
        (**self).execute(command)
    }
}

/// 以子程序執行 ffmpeg，並在等待期間輪詢取消旗標
pub struct FfmpegEngine {
    cancel_signal: Arc<AtomicBool>,
    progress: Option<ProgressBar>,
}

impl FfmpegEngine {
    #[must_use]
    pub const fn new(cancel_signal: Arc<AtomicBool>) -> Self {
        Self {
            cancel_signal,
            progress: None,
        }
    }

    /// 以毫秒為單位更新進度條位置
    #[must_use]
    pub fn with_progress_bar(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn parse_out_time_ms(raw: &str) -> Option<u64> {
        if let Ok(us) = raw.parse::<u64>() {
            return Some(us / 1000); // out_time_ms 單位其實是微秒
        }

        // 後備：解析 HH:MM:SS.micro
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() == 3 {
            let h = parts[0].parse::<u64>().ok()?;
            let m = parts[1].parse::<u64>().ok()?;
            let (s, frac) = match parts[2].split_once('.') {
                Some((sec, micro)) => (sec.parse::<u64>().ok()?, micro.parse::<u64>().unwrap_or(0)),
                None => (parts[2].parse::<u64>().ok()?, 0),
            };
            return Some((h * 3600 + m * 60 + s) * 1000 + frac / 1000);
        }
        None
    }

    fn spawn_progress_reader(stdout: Option<ChildStdout>, progress: Option<ProgressBar>) {
        let (Some(stdout), Some(progress)) = (stdout, progress) else {
            return;
        };

        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                let Some((key, value)) = line.trim().split_once('=') else {
                    continue;
                };
                if matches!(key, "out_time_ms" | "out_time_us") {
                    if let Some(ms) = Self::parse_out_time_ms(value) {
                        progress.set_position(ms);
                    }
                }
            }
        });
    }

    fn spawn_stderr_reader<R: Read + Send + 'static>(stderr: Option<R>) -> Option<JoinHandle<String>> {
        stderr.map(|stderr| {
            thread::spawn(move || {
                let lines: Vec<String> = BufReader::new(stderr)
                    .lines()
                    .map_while(Result::ok)
                    .collect();
                let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
                lines[start..].join("\n")
            })
        })
    }

    fn collect_stderr(reader: Option<JoinHandle<String>>) -> String {
        reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    fn stop_child(child: &mut Child) {
        if let Err(e) = child.kill() {
            warn!("無法終止 ffmpeg 程序 [{}]: {e}", child.id());
        }
        let _ = child.wait();
    }
}

impl EncodingEngine for FfmpegEngine {
    fn execute(&self, command: &FfmpegCommand) -> EngineOutcome {
        if self.cancel_signal.load(Ordering::SeqCst) {
            return EngineOutcome::Cancelled;
        }

        let command = if self.progress.is_some() {
            command.clone().with_progress()
        } else {
            command.clone()
        };
        debug!("執行: {}", command.command_line());

        let mut process = command.build_command();
        process.stdin(Stdio::null());
        process.stdout(if self.progress.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        process.stderr(Stdio::piped());

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("無法啟動 {}: {e}", command.program());
                return EngineOutcome::Failure {
                    diagnostic: format!("無法啟動 {}: {e}", command.program()),
                };
            }
        };

        Self::spawn_progress_reader(child.stdout.take(), self.progress.clone());
        let stderr_reader = Self::spawn_stderr_reader(child.stderr.take());

        loop {
            if self.cancel_signal.load(Ordering::SeqCst) {
                warn!("收到取消信號，終止 ffmpeg 程序 [{}]", child.id());
                Self::stop_child(&mut child);
                let _ = Self::collect_stderr(stderr_reader);
                return EngineOutcome::Cancelled;
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    let stderr = Self::collect_stderr(stderr_reader);
                    if status.success() {
                        return EngineOutcome::Success;
                    }
                    let code = status
                        .code()
                        .map_or_else(|| "signal".to_string(), |c| c.to_string());
                    let diagnostic = if stderr.trim().is_empty() {
                        format!("ffmpeg exited with {code}")
                    } else {
                        format!("ffmpeg exited with {code}: {}", stderr.trim())
                    };
                    return EngineOutcome::Failure { diagnostic };
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    Self::stop_child(&mut child);
                    let _ = Self::collect_stderr(stderr_reader);
                    return EngineOutcome::Failure {
                        diagnostic: format!("無法檢查程序狀態: {e}"),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::video_exporter::ffmpeg_command::{MuxParams, FfmpegCommand};
    use std::path::Path;

    fn command(program: &str) -> FfmpegCommand {
        FfmpegCommand::mux(
            program,
            &MuxParams {
                video: Path::new("/nonexistent/v.mp4"),
                audio: Path::new("/nonexistent/a.m4a"),
                audio_codec: "aac",
                audio_bitrate: "192k",
                output: Path::new("/nonexistent/out.mp4"),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_parse_out_time_ms() {
        assert_eq!(FfmpegEngine::parse_out_time_ms("1500000"), Some(1500));
        assert_eq!(FfmpegEngine::parse_out_time_ms("00:01:02.500000"), Some(62_500));
        assert_eq!(FfmpegEngine::parse_out_time_ms("N/A"), None);
    }

    #[test]
    fn test_missing_program_is_failure() {
        let engine = FfmpegEngine::new(Arc::new(AtomicBool::new(false)));
        let outcome = engine.execute(&command("definitely-not-a-real-ffmpeg-binary"));
        assert!(matches!(outcome, EngineOutcome::Failure { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let engine = FfmpegEngine::new(Arc::new(AtomicBool::new(true)));
        let outcome = engine.execute(&command("definitely-not-a-real-ffmpeg-binary"));
        assert_eq!(outcome, EngineOutcome::Cancelled);
    }
}
