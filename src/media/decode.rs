use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{MontageError, MontageResult};
use crate::media::audio::read_f32le;
use crate::media::frame::FrameRGBA;
use crate::media::source::PcmAudio;
use crate::media::stream::{AudioRef, Media, VideoStream};

/// Decode PNG/JPEG/... bytes into a premultiplied frame.
pub fn decode_image(bytes: &[u8]) -> MontageResult<FrameRGBA> {
    let img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    FrameRGBA::from_straight(w, h, rgba.into_raw())
}

/// Rasterize SVG bytes at their intrinsic size.
pub fn rasterize_svg(bytes: &[u8], resources_dir: Option<&Path>) -> MontageResult<FrameRGBA> {
    let opts = usvg::Options {
        resources_dir: resources_dir.map(Path::to_path_buf),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    if !size.width().is_finite() || !size.height().is_finite() {
        return Err(MontageError::evaluation("svg has invalid width/height"));
    }
    let w = (size.width().ceil() as u32).max(1);
    let h = (size.height().ceil() as u32).max(1);
    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| MontageError::evaluation("failed to allocate svg pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    FrameRGBA::from_premul(w, h, pixmap.data().to_vec())
}

/// Video file read frame by frame through the system `ffmpeg`.
///
/// Opening runs `ffprobe` once; every [`VideoStream::frame_at`] call seeks and decodes a single
/// frame. Requires the `media-ffmpeg` feature.
#[derive(Clone, Debug)]
pub struct VideoFile {
    path: PathBuf,
    size: (u32, u32),
    duration: Option<f64>,
    has_audio: bool,
}

impl VideoFile {
    /// Probe `path` with `ffprobe`.
    pub fn open(path: &Path) -> MontageResult<Self> {
        let json = run_tool(
            "ffprobe",
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                OsStr::new("-show_format"),
                path.as_os_str(),
            ],
        )
        .map_err(|e| e.context(format!("probe '{}'", path.display())))?;
        let mut file = Self::from_probe_json(&json)?;
        file.path = path.to_path_buf();
        Ok(file)
    }

    fn from_probe_json(json: &[u8]) -> MontageResult<Self> {
        #[derive(serde::Deserialize)]
        struct Stream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
        }
        #[derive(serde::Deserialize)]
        struct Format {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct Probe {
            #[serde(default)]
            streams: Vec<Stream>,
            format: Option<Format>,
        }

        let probe: Probe = serde_json::from_slice(json)
            .map_err(|e| MontageError::serde(format!("ffprobe output: {e}")))?;
        let size = probe
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("video"))
            .find_map(|s| s.width.zip(s.height))
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or_else(|| MontageError::evaluation("file has no sized video stream"))?;
        Ok(Self {
            path: PathBuf::new(),
            size,
            duration: probe
                .format
                .and_then(|f| f.duration)
                .and_then(|d| d.trim().parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0),
            has_audio: probe
                .streams
                .iter()
                .any(|s| s.codec_type.as_deref() == Some("audio")),
        })
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the container carries at least one audio stream.
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Decode the file's soundtrack at `sample_rate`, or `None` when it has none.
    pub fn audio(&self, sample_rate: u32) -> MontageResult<Option<PcmAudio>> {
        if !self.has_audio {
            return Ok(None);
        }
        decode_audio(&self.path, sample_rate).map(Some)
    }
}

impl VideoStream for VideoFile {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let seek = format!("{:.6}", t.max(0.0));
        let mut raw = run_tool(
            "ffmpeg",
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-ss"),
                OsStr::new(&seek),
                OsStr::new("-i"),
                self.path.as_os_str(),
                OsStr::new("-frames:v"),
                OsStr::new("1"),
                OsStr::new("-f"),
                OsStr::new("rawvideo"),
                OsStr::new("-pix_fmt"),
                OsStr::new("rgba"),
                OsStr::new("pipe:1"),
            ],
        )
        .map_err(|e| e.context(format!("decode '{}' at {seek}s", self.path.display())))?;

        let (w, h) = self.size;
        let want = w as usize * h as usize * 4;
        if raw.len() < want {
            // Seeking past the last frame yields no output.
            return Err(MontageError::evaluation(format!(
                "no frame at {seek}s in '{}'",
                self.path.display()
            )));
        }
        raw.truncate(want);
        FrameRGBA::from_straight(w, h, raw)
    }
}

/// Decode the first audio stream of `path` to stereo PCM at `sample_rate`.
pub fn decode_audio(path: &Path, sample_rate: u32) -> MontageResult<PcmAudio> {
    let raw = run_tool("ffmpeg", audio_decode_args(path, sample_rate))
        .map_err(|e| e.context(format!("decode audio from '{}'", path.display())))?;
    PcmAudio::new(read_f32le(&raw, sample_rate, 2)?)
}

fn audio_decode_args(path: &Path, sample_rate: u32) -> Vec<std::ffi::OsString> {
    let rate = sample_rate.to_string();
    let mut args: Vec<std::ffi::OsString> =
        ["-v", "error", "-i"].iter().map(Into::into).collect();
    args.push(path.into());
    args.extend(
        ["-vn", "-f", "f32le", "-ac", "2", "-ar", rate.as_str(), "pipe:1"]
            .iter()
            .map(Into::into),
    );
    args
}

/// Open a video file as media, attaching its soundtrack decoded at `sample_rate`.
pub fn open_video_with_audio(path: &Path, sample_rate: u32) -> MontageResult<Media> {
    let video = VideoFile::open(path)?;
    let audio = video
        .audio(sample_rate)?
        .map(|pcm| Arc::new(pcm) as AudioRef);
    Ok(Media::from_streams(Some(Arc::new(video)), audio))
}

/// Run an ffmpeg tool and return its stdout.
fn run_tool<I, S>(program: &str, args: I) -> MontageResult<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if !cfg!(feature = "media-ffmpeg") {
        return Err(MontageError::evaluation(
            "video/audio files require the 'media-ffmpeg' feature",
        ));
    }
    let out = std::process::Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("run {program}"))?;
    if !out.status.success() {
        return Err(MontageError::evaluation(format!(
            "{program} exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

#[cfg(test)]
#[path = "../../tests/unit/media/decode.rs"]
mod tests;
