//! 預覽用背景音樂
//!
//! 以 ffplay 子程序播放，續播時從暫停位置接著循環整首。播放控制只有 start / pause / resume /
//! stop_and_release 四個操作；離開作用域時（Drop）一定會停止並回收程序。

use super::playback_clock::PlaybackClock;
use crate::component::video_exporter::normalize_path;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

pub struct PreviewAudio {
    ffplay: String,
    source: PathBuf,
    /// 音樂長度，用來計算循環後的續播位置
    loop_length: Option<f64>,
    child: Option<Child>,
    clock: PlaybackClock,
}

impl PreviewAudio {
    #[must_use]
    pub fn new(ffplay: impl Into<String>, source: &Path, loop_length: Option<f64>) -> Self {
        Self {
            ffplay: ffplay.into(),
            source: source.to_path_buf(),
            loop_length: loop_length.filter(|len| *len > 0.0),
            child: None,
            clock: PlaybackClock::new(),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.kill_child();
        self.child = Some(self.spawn(0.0)?);
        self.clock.start();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.child.is_some() {
            self.kill_child();
            self.clock.pause();
        }
    }

    /// 從暫停的位置繼續播放
    pub fn resume(&mut self) -> Result<()> {
        if self.child.is_some() || self.clock.is_running() {
            return Ok(());
        }
        let offset = self.resume_offset();
        self.child = Some(self.spawn(offset)?);
        self.clock.resume();
        Ok(())
    }

    pub fn stop_and_release(&mut self) {
        self.kill_child();
        self.clock.stop();
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.child.is_some()
    }

    fn resume_offset(&self) -> f64 {
        let played = self.clock.elapsed().as_secs_f64();
        match self.loop_length {
            Some(length) => played % length,
            None => played,
        }
    }

    /// ffplay 的 `-ss` 搭配 `-loop` 會循環回 `-ss` 的位置，
    /// 因此有起始位置時改用 amovie 循環整首，再以 atrim 只裁掉開頭一次
    fn playback_args(&self, offset_seconds: f64) -> Result<Vec<String>> {
        let mut args: Vec<String> = ["-nodisp", "-loglevel", "quiet"]
            .map(String::from)
            .to_vec();

        if offset_seconds <= 0.0 {
            args.extend(["-loop".to_string(), "0".to_string()]);
            args.push(self.source.to_string_lossy().into_owned());
            return Ok(args);
        }

        let source = normalize_path(&self.source)?;
        args.extend(["-f".to_string(), "lavfi".to_string()]);
        args.push(format!(
            "amovie='{source}':loop=0,atrim=start={offset_seconds:.3},asetpts=PTS-STARTPTS"
        ));
        Ok(args)
    }

    fn spawn(&self, offset_seconds: f64) -> Result<Child> {
        debug!(
            "播放背景音樂 {} (從 {offset_seconds:.2}s)",
            self.source.display()
        );
        Command::new(&self.ffplay)
            .args(self.playback_args(offset_seconds)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("無法啟動 {}", self.ffplay))
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("無法停止背景音樂 [{}]: {e}", child.id());
            }
            let _ = child.wait();
        }
    }
}

impl Drop for PreviewAudio {
    fn drop(&mut self) {
        self.stop_and_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_player_fails_to_start() {
        let mut audio = PreviewAudio::new(
            "definitely-not-a-real-ffplay-binary",
            Path::new("/tmp/none.mp3"),
            Some(30.0),
        );
        assert!(audio.start().is_err());
        assert!(!audio.is_playing());
        // 未啟動時的控制操作不應出錯
        audio.pause();
        audio.stop_and_release();
    }

    #[test]
    fn test_start_loops_whole_track() {
        let audio = PreviewAudio::new("ffplay", Path::new("/music/bg.mp3"), Some(30.0));
        let args = audio.playback_args(0.0).unwrap();
        assert!(!args.contains(&"-ss".to_string()));
        assert_eq!(args[args.len() - 3..], ["-loop", "0", "/music/bg.mp3"]);
    }

    #[test]
    fn test_resume_trims_once_then_loops_from_beginning() {
        let audio = PreviewAudio::new("ffplay", Path::new("/music/bg.mp3"), Some(30.0));
        let args = audio.playback_args(12.5).unwrap();

        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-loop".to_string()));
        assert_eq!(
            args.last().unwrap(),
            "amovie='/music/bg.mp3':loop=0,atrim=start=12.500,asetpts=PTS-STARTPTS"
        );
    }

    #[test]
    fn test_resume_rejects_unsafe_source() {
        let audio = PreviewAudio::new("ffplay", Path::new("/music/it's.mp3"), None);
        assert!(audio.playback_args(3.0).is_err());
    }

    #[test]
    fn test_non_positive_loop_length_ignored() {
        let audio = PreviewAudio::new("ffplay", Path::new("/a.mp3"), Some(0.0));
        assert!(audio.loop_length.is_none());
    }
}
