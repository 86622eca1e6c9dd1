//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use recaps_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{FfmpegProgress, ProgressLine, ProgressParser};

/// Stderr lines kept for diagnostics (the tail of the log).
const MAX_STDERR_LINES: usize = 200;

/// One `-i` input with the arguments that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order (stream specifiers index into this list)
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add a plain input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(Vec::<String>::new(), path)
    }

    /// Add an input preceded by input options.
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an input that loops forever (`-stream_loop -1`).
    pub fn looped_input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(["-stream_loop", "-1"], path)
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Truncate the output to `seconds`.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set audio sample rate.
    pub fn audio_sample_rate(self, hz: u32) -> Self {
        self.output_arg("-ar").output_arg(hz.to_string())
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Apply video encoding settings.
    pub fn video_encoding(self, encoding: &EncodingConfig) -> Self {
        self.video_codec(&encoding.codec)
            .preset(&encoding.preset)
            .crf(encoding.crf)
    }

    /// Apply audio encoding settings.
    pub fn audio_encoding(self, encoding: &EncodingConfig) -> Self {
        self.audio_codec(&encoding.audio_codec)
            .audio_bitrate(&encoding.audio_bitrate)
            .audio_sample_rate(encoding.audio_sample_rate)
    }

    /// Output path this command writes.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push("error".to_string());

        // Progress records go to stderr next to the log
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Exit status and diagnostic stderr of a finished FFmpeg process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Non-progress stderr lines (tail)
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runner for FFmpeg commands with progress tracking and cancellation.
pub struct FfmpegRunner {
    /// FFmpeg binary (name on PATH or explicit path)
    binary: PathBuf,
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Kill the process after this long
    timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner using `ffmpeg` from PATH.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            cancel_rx: None,
            timeout: None,
        }
    }

    /// Use a specific FFmpeg binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command to completion and return its exit code and stderr.
    ///
    /// Cancellation and timeout kill the process and return
    /// [`MediaError::Cancelled`] / [`MediaError::Timeout`]. A non-zero exit
    /// is not an error here.
    pub async fn run_capture<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<ProcessOutput>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let binary = check_ffmpeg(&self.binary)?;

        if self.cancel_rx.as_ref().is_some_and(is_cancelled) {
            return Err(MediaError::Cancelled);
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut parser = ProgressParser::new();
            let mut log = VecDeque::with_capacity(MAX_STDERR_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                match parser.feed(&line) {
                    ProgressLine::Snapshot(progress) => on_progress(progress),
                    ProgressLine::Field => {}
                    ProgressLine::Log => {
                        if log.len() == MAX_STDERR_LINES {
                            log.pop_front();
                        }
                        log.push_back(line);
                    }
                }
            }

            log.into_iter().collect::<Vec<_>>().join("\n")
        });

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = wait_for_cancel(self.cancel_rx.clone()) => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(MediaError::Cancelled);
            }
            _ = deadline(self.timeout) => {
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(MediaError::Timeout(secs));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ProcessOutput {
            exit_code: status.code(),
            stderr,
        })
    }
}

/// Whether a cancellation signal has fired.
pub fn is_cancelled(cancel_rx: &watch::Receiver<bool>) -> bool {
    *cancel_rx.borrow()
}

/// Resolve when the signal turns `true`; never resolve without a signal or
/// once every sender is gone.
pub async fn wait_for_cancel(cancel_rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel_rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Resolve a binary given as a bare name (searched on PATH) or a path.
fn resolve_binary(binary: &Path) -> Result<PathBuf, which::Error> {
    which::which(binary)
}

/// Check if FFmpeg is available.
pub(crate) fn check_ffmpeg(binary: &Path) -> MediaResult<PathBuf> {
    resolve_binary(binary).map_err(|_| MediaError::FfmpegNotFound(binary.display().to_string()))
}

/// Check if FFprobe is available.
pub(crate) fn check_ffprobe(binary: &Path) -> MediaResult<PathBuf> {
    resolve_binary(binary).map_err(|_| MediaError::FfprobeNotFound(binary.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_orders_inputs() {
        let cmd = FfmpegCommand::new("out.mp4")
            .looped_input("bg.mp4")
            .input("voice.mp3")
            .filter_complex("[0:v]null[v]")
            .map("[v]")
            .duration(12.5);

        let args = cmd.build_args();
        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        let bg_pos = args.iter().position(|a| a == "bg.mp4").unwrap();
        let voice_pos = args.iter().position(|a| a == "voice.mp3").unwrap();

        assert!(loop_pos < bg_pos);
        assert!(bg_pos < voice_pos);
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        assert!(args.contains(&"12.500".to_string()));
        assert_eq!(cmd.input_count(), 2);
    }

    #[test]
    fn test_encoding_args() {
        let encoding = EncodingConfig::default();
        let args = FfmpegCommand::new("out.mp4")
            .input("in.mp4")
            .video_encoding(&encoding)
            .audio_encoding(&encoding)
            .build_args();

        for expected in ["libx264", "fast", "23", "aac", "128k", "44100"] {
            assert!(args.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = FfmpegRunner::new().with_binary("/nonexistent/ffmpeg-binary");
        let cmd = FfmpegCommand::new("out.mp4").input("in.mp4");
        let result = runner.run_capture(&cmd, |_| {}).await;
        assert!(matches!(result, Err(MediaError::FfmpegNotFound(_))));
    }

    #[tokio::test]
    async fn test_wait_for_cancel_fires() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_cancel(Some(rx)));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancel not observed")
            .unwrap();
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_capture_exit_code_and_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(
                dir.path(),
                "echo 'frame=1' >&2\necho 'progress=continue' >&2\necho 'Invalid data found' >&2\nexit 1",
            );

            let runner = FfmpegRunner::new().with_binary(&binary);
            let cmd = FfmpegCommand::new(dir.path().join("out.mp4")).input("in.mp4");
            let output = runner.run_capture(&cmd, |_| {}).await.unwrap();

            assert_eq!(output.exit_code, Some(1));
            assert_eq!(output.stderr, "Invalid data found");
            assert!(!output.success());
        }

        #[tokio::test]
        async fn test_timeout_kills_process() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "exec sleep 30");

            let runner = FfmpegRunner::new()
                .with_binary(&binary)
                .with_timeout(Duration::from_millis(200));
            let cmd = FfmpegCommand::new(dir.path().join("out.mp4")).input("in.mp4");

            let result = runner.run_capture(&cmd, |_| {}).await;
            assert!(matches!(result, Err(MediaError::Timeout(_))));
        }

        #[tokio::test]
        async fn test_cancel_kills_process() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "exec sleep 30");
            let (tx, rx) = watch::channel(false);

            let runner = FfmpegRunner::new().with_binary(&binary).with_cancel(rx);
            let cmd = FfmpegCommand::new(dir.path().join("out.mp4")).input("in.mp4");

            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let _ = tx.send(true);
            });

            let result = runner.run_capture(&cmd, |_| {}).await;
            assert!(matches!(result, Err(MediaError::Cancelled)));
        }
    }
}
