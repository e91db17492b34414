use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::compose::blend::flatten_onto;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::audio::{AudioBuffer, write_f32le_file};
use crate::media::frame::FrameRGBA;
use crate::render::sink::{FrameSink, SinkConfig};

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Options for writing an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// Frames are flattened over the configured background. When the config carries audio, the mix
/// is written to a temporary `f32le` file that lives as long as the sink.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoder: Option<Encoder>,
    audio_tmp: TempFileGuard,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Sink writing to `opts.out_path`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
            audio_tmp: TempFileGuard::default(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> MontageResult<()> {
        validate_sink_config(&cfg)?;
        let out = &self.opts.out_path;
        ensure_parent_dir(out)?;
        if !self.opts.overwrite && out.exists() {
            return Err(MontageError::validation(format!(
                "output file '{}' already exists",
                out.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(MontageError::evaluation(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let audio = match cfg.audio.as_deref() {
            Some(buf) if !buf.interleaved_f32.is_empty() => {
                let path = temp_audio_path();
                write_f32le_file(buf, &path)?;
                self.audio_tmp = TempFileGuard(Some(path.clone()));
                Some((buf, path))
            }
            _ => None,
        };
        let args = encoder_args(
            &cfg,
            audio.as_ref().map(|(buf, path)| (*buf, path.as_path())),
            out,
            self.opts.overwrite,
        );
        tracing::debug!(out = %out.display(), audio = audio.is_some(), "spawning ffmpeg");

        self.encoder = Some(Encoder::spawn(&args)?);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MontageResult<()> {
        let (Some(cfg), Some(encoder)) = (self.cfg.as_ref(), self.encoder.as_mut()) else {
            return Err(MontageError::evaluation("ffmpeg sink not started"));
        };
        if self.last_idx.is_some_and(|last| idx.0 <= last.0) {
            return Err(MontageError::evaluation(format!(
                "ffmpeg sink received frame {} out of order",
                idx.0
            )));
        }
        if (frame.width, frame.height) != (cfg.width, cfg.height) {
            return Err(MontageError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        let [r, g, b, _] = cfg.background;
        encoder.write(&flatten_onto(frame, [r, g, b]))?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> MontageResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| MontageError::evaluation("ffmpeg sink not started"))?;
        self.cfg = None;
        encoder.finish()
    }
}

/// Running `ffmpeg` child with its stderr collected on a side thread.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl Encoder {
    fn spawn(args: &[OsString]) -> MontageResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn ffmpeg")?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok(buf)
            })
        });
        if stdin.is_none() || stderr.is_none() {
            let _ = child.kill();
            return Err(MontageError::evaluation("ffmpeg pipes were not opened"));
        }
        Ok(Self {
            child,
            stdin,
            stderr,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> MontageResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MontageError::evaluation("ffmpeg stdin is closed"))?;
        stdin.write_all(bytes).context("write frame to ffmpeg")?;
        Ok(())
    }

    fn finish(mut self) -> MontageResult<()> {
        // Closing stdin signals end of stream.
        drop(self.stdin.take());
        let status = self.child.wait().context("wait for ffmpeg")?;
        let log = match self.stderr.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| MontageError::evaluation("ffmpeg stderr reader panicked"))?
                .context("read ffmpeg stderr")?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(MontageError::evaluation(format!(
                "ffmpeg exited with {status}: {}",
                String::from_utf8_lossy(&log).trim()
            )));
        }
        Ok(())
    }
}

/// Command line for a raw RGBA stdin stream plus optional raw PCM input.
fn encoder_args(
    cfg: &SinkConfig,
    audio: Option<(&AudioBuffer, &Path)>,
    out: &Path,
    overwrite: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));

    push(&[if overwrite { "-y" } else { "-n" }, "-loglevel", "error"]);
    // rawvideo takes its size and rate before `-i`.
    push(&[
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
        "-r",
        &format!("{}/{}", cfg.fps.num, cfg.fps.den),
        "-i",
        "pipe:0",
    ]);
    let audio_path = match audio {
        Some((buf, path)) => {
            push(&[
                "-f",
                "f32le",
                "-ar",
                &buf.sample_rate.to_string(),
                "-ac",
                &buf.channels.to_string(),
                "-i",
            ]);
            Some(path)
        }
        None => None,
    };
    if let Some(path) = audio_path {
        args.push(path.as_os_str().to_owned());
    }

    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));
    push(&["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
    if audio_path.is_some() {
        push(&["-c:a", "aac", "-shortest"]);
    } else {
        push(&["-an"]);
    }
    push(&["-movflags", "+faststart"]);
    args.push(out.as_os_str().to_owned());
    args
}

fn validate_sink_config(cfg: &SinkConfig) -> MontageResult<()> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(MontageError::validation("fps must be non-zero"));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(MontageError::validation(
            "ffmpeg sink width/height must be non-zero",
        ));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(MontageError::validation(format!(
            "yuv420p output needs even dimensions, got {}x{}",
            cfg.width, cfg.height
        )));
    }
    if let Some(audio) = cfg.audio.as_ref()
        && (audio.sample_rate == 0 || audio.channels == 0)
    {
        return Err(MontageError::validation(
            "audio sample rate and channel count must be non-zero",
        ));
    }
    Ok(())
}

/// Deletes the wrapped file on drop.
#[derive(Debug, Default)]
struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn temp_audio_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!(
        "montage_mix_{}_{nanos}.f32le",
        std::process::id()
    ))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> MontageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/render/ffmpeg.rs"]
mod tests;
