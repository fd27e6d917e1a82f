//! 匯出三個階段使用的 ffmpeg 命令
//!
//! 參數以 argv 陣列保存，不經過 shell；所有路徑都先經過
//! [`normalize_path`] 檢查，含控制字元或引號的路徑會被拒絕。

use super::edit_script::normalize_path;
use crate::error::{ComposeError, ComposeResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> ComposeResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ComposeError::invalid_input(format!(
                "解析度必須為非零偶數: {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// 保持比例縮放後補黑邊到固定尺寸
    fn scale_filter(self) -> String {
        let Self { width, height } = self;
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:black,setsar=1,format=yuv420p"
        )
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn check_token(kind: &str, value: &str) -> ComposeResult<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ComposeError::invalid_input(format!("不合法的 {kind}: {value:?}")))
    }
}

fn check_seconds(value: f64) -> ComposeResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ComposeError::invalid_input(format!("長度必須為正數: {value}")))
    }
}

/// 第一階段：由編輯腳本產生無聲影片
#[derive(Debug, Clone)]
pub struct RenderVideoParams<'a> {
    pub edit_script: &'a Path,
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub video_codec: &'a str,
    pub exact_duration: f64,
    pub output: &'a Path,
}

/// 第二階段：循環並裁切背景音樂
#[derive(Debug, Clone)]
pub struct SynthesizeAudioParams<'a> {
    pub source: &'a Path,
    pub duration: f64,
    pub audio_codec: &'a str,
    pub audio_bitrate: &'a str,
    pub output: &'a Path,
}

/// 第三階段：合併影片與音訊
#[derive(Debug, Clone)]
pub struct MuxParams<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub audio_codec: &'a str,
    pub audio_bitrate: &'a str,
    pub output: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    program: String,
    args: Vec<String>,
    output: PathBuf,
}

impl FfmpegCommand {
    fn base(program: &str) -> Self {
        let args = ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            program: program.to_string(),
            args,
            output: PathBuf::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    fn path_arg(&mut self, path: &Path) -> ComposeResult<&mut Self> {
        let value = normalize_path(path)?;
        Ok(self.arg(value))
    }

    fn finish(mut self, output: &Path) -> ComposeResult<Self> {
        self.path_arg(output)?;
        self.output = output.to_path_buf();
        Ok(self)
    }

    pub fn render_video(program: &str, params: &RenderVideoParams<'_>) -> ComposeResult<Self> {
        check_token("video codec", params.video_codec)?;
        check_seconds(params.exact_duration)?;
        if params.frame_rate == 0 {
            return Err(ComposeError::invalid_input("幀率必須為正數"));
        }

        let mut cmd = Self::base(program);
        cmd.arg("-f").arg("concat").arg("-safe").arg("0").arg("-i");
        cmd.path_arg(params.edit_script)?;
        cmd.arg("-vf")
            .arg(params.resolution.scale_filter())
            .arg("-r")
            .arg(params.frame_rate.to_string())
            .arg("-t")
            .arg(format_seconds(params.exact_duration))
            .arg("-an")
            .arg("-c:v")
            .arg(params.video_codec)
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-movflags")
            .arg("+faststart");
        cmd.finish(params.output)
    }

    pub fn synthesize_audio(
        program: &str,
        params: &SynthesizeAudioParams<'_>,
    ) -> ComposeResult<Self> {
        check_token("audio codec", params.audio_codec)?;
        check_token("audio bitrate", params.audio_bitrate)?;
        check_seconds(params.duration)?;

        let mut cmd = Self::base(program);
        cmd.arg("-stream_loop").arg("-1").arg("-i");
        cmd.path_arg(params.source)?;
        cmd.arg("-t")
            .arg(format_seconds(params.duration))
            .arg("-vn")
            .arg("-c:a")
            .arg(params.audio_codec)
            .arg("-b:a")
            .arg(params.audio_bitrate);
        cmd.finish(params.output)
    }

    pub fn mux(program: &str, params: &MuxParams<'_>) -> ComposeResult<Self> {
        check_token("audio codec", params.audio_codec)?;
        check_token("audio bitrate", params.audio_bitrate)?;

        let mut cmd = Self::base(program);
        cmd.arg("-i");
        cmd.path_arg(params.video)?;
        cmd.arg("-i");
        cmd.path_arg(params.audio)?;
        cmd.arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg(params.audio_codec)
            .arg("-b:a")
            .arg(params.audio_bitrate)
            .arg("-shortest")
            .arg("-movflags")
            .arg("+faststart");
        cmd.finish(params.output)
    }

    /// 加上進度輸出參數（寫到 stdout）
    #[must_use]
    pub fn with_progress(mut self) -> Self {
        let at = self.args.len() - 1;
        self.args
            .splice(at..at, ["-progress".to_string(), "pipe:1".to_string(), "-nostats".to_string()]);
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// 記錄用的命令字串（含引號）
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains([' ', '\'', '"', ',', ':', '(']) {
                    format!("'{}'", part.replace('\'', r"'\''"))
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], flag: &str) -> usize {
        args.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("missing {flag}"))
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        &args[position(args, flag) + 1]
    }

    #[test]
    fn test_render_video_args() {
        let cmd = FfmpegCommand::render_video(
            "ffmpeg",
            &RenderVideoParams {
                edit_script: Path::new("/work/job.concat.txt"),
                resolution: Resolution::new(720, 1280).unwrap(),
                frame_rate: 30,
                video_codec: "libx264",
                exact_duration: 9.1,
                output: Path::new("/work/job-video.mp4"),
            },
        )
        .unwrap();
        let args = cmd.args();

        assert_eq!(value_after(args, "-f"), "concat");
        assert_eq!(value_after(args, "-i"), "/work/job.concat.txt");
        assert!(value_after(args, "-vf").starts_with("scale=720:1280"));
        assert_eq!(value_after(args, "-r"), "30");
        assert_eq!(value_after(args, "-t"), "9.100");
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().unwrap(), "/work/job-video.mp4");
        assert_eq!(cmd.output(), Path::new("/work/job-video.mp4"));
    }

    #[test]
    fn test_synthesize_audio_loops_and_trims() {
        let cmd = FfmpegCommand::synthesize_audio(
            "ffmpeg",
            &SynthesizeAudioParams {
                source: Path::new("/assets/music.mp3"),
                duration: 10.1,
                audio_codec: "aac",
                audio_bitrate: "192k",
                output: Path::new("/work/job-audio.m4a"),
            },
        )
        .unwrap();
        let args = cmd.args();

        assert_eq!(value_after(args, "-stream_loop"), "-1");
        assert!(position(args, "-stream_loop") < position(args, "-i"));
        assert_eq!(value_after(args, "-t"), "10.100");
        assert_eq!(value_after(args, "-c:a"), "aac");
        assert_eq!(value_after(args, "-b:a"), "192k");
    }

    #[test]
    fn test_mux_copies_video_and_stops_at_shortest() {
        let cmd = FfmpegCommand::mux(
            "ffmpeg",
            &MuxParams {
                video: Path::new("/work/v.mp4"),
                audio: Path::new("/work/a.m4a"),
                audio_codec: "aac",
                audio_bitrate: "192k",
                output: Path::new("/work/out.mp4"),
            },
        )
        .unwrap();
        let args = cmd.args();

        assert_eq!(value_after(args, "-c:v"), "copy");
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);
    }

    #[test]
    fn test_unsafe_values_rejected() {
        let err = FfmpegCommand::mux(
            "ffmpeg",
            &MuxParams {
                video: Path::new("/work/v\n.mp4"),
                audio: Path::new("/work/a.m4a"),
                audio_codec: "aac",
                audio_bitrate: "192k",
                output: Path::new("/work/out.mp4"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::UnsupportedLocator { .. }));

        let err = FfmpegCommand::synthesize_audio(
            "ffmpeg",
            &SynthesizeAudioParams {
                source: Path::new("/a.mp3"),
                duration: 3.0,
                audio_codec: "aac; rm -rf /",
                audio_bitrate: "192k",
                output: Path::new("/out.m4a"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInput(_)));
    }

    #[test]
    fn test_with_progress_keeps_output_last() {
        let cmd = FfmpegCommand::mux(
            "ffmpeg",
            &MuxParams {
                video: Path::new("/v.mp4"),
                audio: Path::new("/a.m4a"),
                audio_codec: "aac",
                audio_bitrate: "128k",
                output: Path::new("/out.mp4"),
            },
        )
        .unwrap()
        .with_progress();
        assert_eq!(cmd.args().last().unwrap(), "/out.mp4");
        assert_eq!(value_after(cmd.args(), "-progress"), "pipe:1");
    }

    #[test]
    fn test_resolution_validation() {
        assert!(Resolution::new(720, 1280).is_ok());
        assert!(Resolution::new(721, 1280).is_err());
        assert!(Resolution::new(0, 1280).is_err());
        assert_eq!(Resolution::new(720, 1280).unwrap().to_string(), "720x1280");
    }

    #[test]
    fn test_command_line_quotes_filters() {
        let cmd = FfmpegCommand::synthesize_audio(
            "ffmpeg",
            &SynthesizeAudioParams {
                source: Path::new("/my music/a.mp3"),
                duration: 4.0,
                audio_codec: "aac",
                audio_bitrate: "192k",
                output: Path::new("/out.m4a"),
            },
        )
        .unwrap();
        assert!(cmd.command_line().contains("'/my music/a.mp3'"));
    }
}
