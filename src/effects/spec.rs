use crate::foundation::error::{MontageError, MontageResult};
use crate::media::frame::PixelRect;
use crate::particles::assemble::ParticleParams;
use crate::particles::motion::MotionCurve;
use crate::particles::segment::Connectivity;

/// Untyped effect declaration as it appears in project files.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EffectInstance {
    /// Effect name; aliases are accepted.
    pub kind: String,
    /// Named numeric parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Streams an effect reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectTarget {
    /// Video frames.
    Video,
    /// Audio samples.
    Audio,
    /// Whichever streams the node has.
    Both,
}

/// Pixel sampling used by rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Nearest neighbour.
    Nearest,
    /// 2x2 linear.
    Bilinear,
    /// 4x4 Catmull-Rom.
    #[default]
    Bicubic,
}

/// How a resize picks its output size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResizeTarget {
    /// Exact output size.
    Exact {
        /// Output width.
        width: u32,
        /// Output height.
        height: u32,
    },
    /// Uniform scale factor.
    Factor(f64),
    /// Output width; height follows the aspect ratio.
    Width(u32),
    /// Output height; width follows the aspect ratio.
    Height(u32),
}

impl ResizeTarget {
    /// Output size for a `w x h` input. Derived dimensions round to the nearest pixel, minimum 1.
    pub fn output_size(self, w: u32, h: u32) -> (u32, u32) {
        let scaled = |len: u32, s: f64| ((f64::from(len) * s).round() as u32).max(1);
        match self {
            Self::Exact { width, height } => (width, height),
            Self::Factor(f) => (scaled(w, f), scaled(h, f)),
            Self::Width(width) => (width, scaled(h, f64::from(width) / f64::from(w.max(1)))),
            Self::Height(height) => (scaled(w, f64::from(height) / f64::from(h.max(1))), height),
        }
    }
}

/// Typed, validated effect.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectSpec {
    /// Linear alpha ramp from 0 over the first `duration` seconds.
    FadeIn {
        /// Ramp length in seconds.
        duration: f64,
    },
    /// Linear alpha ramp to 0 over the last `duration` seconds.
    FadeOut {
        /// Ramp length in seconds.
        duration: f64,
    },
    /// Constant opacity multiply.
    Opacity {
        /// Factor in `[0, 1]`.
        value: f64,
    },
    /// Resample to a new size.
    Resize(ResizeTarget),
    /// Counter-clockwise rotation.
    Rotate {
        /// Angle in degrees.
        angle_deg: f64,
        /// Pixel sampling.
        interpolation: Interpolation,
        /// Grow the frame to hold the rotated bounds.
        expand: bool,
    },
    /// Keep `[start, end)` of the source, in source time.
    Subclip {
        /// First kept second.
        start: f64,
        /// End of the kept range; `None` keeps the rest.
        end: Option<f64>,
    },
    /// Keep a pixel rectangle.
    Crop(PixelRect),
    /// Multiply straight RGB by `factor`.
    MultiplyColor {
        /// Channel factor.
        factor: f64,
    },
    /// Saturate and darken edges.
    Painting {
        /// Channel factor.
        saturation: f64,
        /// Edge darkening strength.
        black: f64,
    },
    /// `c + lum + contrast·(c - threshold)` on straight RGB.
    LumContrast {
        /// Added luminance.
        lum: f64,
        /// Contrast factor.
        contrast: f64,
        /// Contrast pivot.
        threshold: f64,
    },
    /// Independent channel gains.
    StereoVolume {
        /// Left gain.
        left: f64,
        /// Right gain.
        right: f64,
    },
    /// Repeated, decaying copies of the signal.
    AudioDelay {
        /// Seconds between copies.
        offset: f64,
        /// Number of extra copies.
        repeats: u32,
        /// Gain of the last copy; intermediate gains are spaced linearly from 1.
        decay: f64,
    },
    /// Linear gain ramp from 0 over the first `duration` seconds.
    AudioFadeIn {
        /// Ramp length in seconds.
        duration: f64,
    },
    /// Linear gain ramp to 0 over the last `duration` seconds.
    AudioFadeOut {
        /// Ramp length in seconds.
        duration: f64,
    },
    /// Scale so the peak sample reaches 1.
    AudioNormalize,
    /// Fragment and animate the clip's coverage.
    Particles(ParticleParams),
}

impl EffectSpec {
    /// Canonical effect name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FadeIn { .. } => "fade_in",
            Self::FadeOut { .. } => "fade_out",
            Self::Opacity { .. } => "opacity",
            Self::Resize(_) => "resize",
            Self::Rotate { .. } => "rotate",
            Self::Subclip { .. } => "subclip",
            Self::Crop(_) => "crop",
            Self::MultiplyColor { .. } => "multiply_color",
            Self::Painting { .. } => "painting",
            Self::LumContrast { .. } => "lum_contrast",
            Self::StereoVolume { .. } => "stereo_volume",
            Self::AudioDelay { .. } => "audio_delay",
            Self::AudioFadeIn { .. } => "audio_fade_in",
            Self::AudioFadeOut { .. } => "audio_fade_out",
            Self::AudioNormalize => "audio_normalize",
            Self::Particles(_) => "particles",
        }
    }

    /// Stream kind the effect consumes and produces.
    pub fn target(&self) -> EffectTarget {
        match self {
            Self::Subclip { .. } => EffectTarget::Both,
            Self::StereoVolume { .. }
            | Self::AudioDelay { .. }
            | Self::AudioFadeIn { .. }
            | Self::AudioFadeOut { .. }
            | Self::AudioNormalize => EffectTarget::Audio,
            _ => EffectTarget::Video,
        }
    }

    /// Check parameter domains.
    pub fn validate(&self) -> MontageResult<()> {
        let name = self.name();
        match *self {
            Self::FadeIn { duration }
            | Self::FadeOut { duration }
            | Self::AudioFadeIn { duration }
            | Self::AudioFadeOut { duration } => non_negative(name, "duration", duration),
            Self::Opacity { value } => in_range(name, "value", value, 0.0, 1.0),
            Self::Resize(target) => match target {
                ResizeTarget::Exact { width, height } if width == 0 || height == 0 => {
                    Err(MontageError::validation(format!(
                        "{name} target must have non-zero area, got {width}x{height}"
                    )))
                }
                ResizeTarget::Width(0) | ResizeTarget::Height(0) => Err(
                    MontageError::validation(format!("{name} target must be > 0")),
                ),
                ResizeTarget::Factor(f) if !f.is_finite() || f <= 0.0 || f > 3.0 => {
                    Err(MontageError::validation(format!(
                        "{name}.factor must be in (0, 3], got {f}"
                    )))
                }
                _ => Ok(()),
            },
            Self::Rotate { angle_deg, .. } => finite(name, "angle", angle_deg),
            Self::Subclip { start, end } => {
                non_negative(name, "start", start)?;
                match end {
                    Some(e) if !e.is_finite() || e <= start => Err(MontageError::validation(
                        format!("{name} requires start < end, got [{start}, {e})"),
                    )),
                    _ => Ok(()),
                }
            }
            Self::Crop(rect) => {
                if rect.x0 >= rect.x1 || rect.y0 >= rect.y1 {
                    return Err(MontageError::validation(format!(
                        "{name} requires x1 < x2 and y1 < y2, got ({}, {})-({}, {})",
                        rect.x0, rect.y0, rect.x1, rect.y1
                    )));
                }
                Ok(())
            }
            Self::MultiplyColor { factor } => in_range(name, "factor", factor, -5.0, 5.0),
            Self::Painting { saturation, black } => {
                in_range(name, "saturation", saturation, 0.0, 5.0)?;
                non_negative(name, "black", black)
            }
            Self::LumContrast {
                lum,
                contrast,
                threshold,
            } => {
                in_range(name, "lum", lum, -255.0, 255.0)?;
                in_range(name, "contrast", contrast, 0.0, 5.0)?;
                in_range(name, "threshold", threshold, 0.0, 255.0)
            }
            Self::StereoVolume { left, right } => {
                in_range(name, "left", left, 0.0, 2.0)?;
                in_range(name, "right", right, 0.0, 2.0)
            }
            Self::AudioDelay {
                offset,
                repeats,
                decay,
            } => {
                if !offset.is_finite() || offset <= 0.0 {
                    return Err(MontageError::validation(format!(
                        "{name}.offset must be finite and > 0, got {offset}"
                    )));
                }
                if repeats == 0 {
                    return Err(MontageError::validation(format!(
                        "{name}.repeats must be >= 1"
                    )));
                }
                in_range(name, "decay", decay, 0.0, 1.0)
            }
            Self::AudioNormalize => Ok(()),
            Self::Particles(p) => p.validate(),
        }
    }

    /// Stream duration after this effect, given the duration before it.
    pub fn map_duration(&self, before: Option<f64>) -> Option<f64> {
        match *self {
            Self::Subclip { start, end } => {
                let end = match (end, before) {
                    (Some(e), Some(d)) => e.min(d),
                    (Some(e), None) => e,
                    (None, d) => d?,
                };
                Some(end - start)
            }
            Self::AudioDelay {
                offset, repeats, ..
            } => before.map(|d| d + f64::from(repeats) * offset),
            Self::Particles(p) => Some(p.duration),
            _ => before,
        }
    }
}

fn finite(effect: &str, param: &str, v: f64) -> MontageResult<()> {
    if !v.is_finite() {
        return Err(MontageError::validation(format!(
            "{effect}.{param} must be finite"
        )));
    }
    Ok(())
}

fn non_negative(effect: &str, param: &str, v: f64) -> MontageResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(MontageError::validation(format!(
            "{effect}.{param} must be finite and >= 0, got {v}"
        )));
    }
    Ok(())
}

fn in_range(effect: &str, param: &str, v: f64, lo: f64, hi: f64) -> MontageResult<()> {
    if !v.is_finite() || v < lo || v > hi {
        return Err(MontageError::validation(format!(
            "{effect}.{param} must be in [{lo}, {hi}], got {v}"
        )));
    }
    Ok(())
}

/// Parse and validate an [`EffectInstance`].
pub fn parse_effect(inst: &EffectInstance) -> MontageResult<EffectSpec> {
    let kind = inst.kind.trim().to_ascii_lowercase().replace('-', "_");
    if kind.is_empty() {
        return Err(MontageError::validation("effect kind must be non-empty"));
    }
    let p = &inst.params;

    let spec = match kind.as_str() {
        "fade_in" | "fadein" | "crossfade_in" | "crossfadein" => EffectSpec::FadeIn {
            duration: get_f64(p, "duration")?,
        },
        "fade_out" | "fadeout" | "crossfade_out" | "crossfadeout" => EffectSpec::FadeOut {
            duration: get_f64(p, "duration")?,
        },
        "opacity" | "opacity_mul" | "opacitymul" => EffectSpec::Opacity {
            value: get_f64(p, "value")?,
        },
        "resize" | "resized" => EffectSpec::Resize(parse_resize(p)?),
        "rotate" | "rotated" => EffectSpec::Rotate {
            angle_deg: get_f64(p, "angle")?,
            interpolation: parse_interpolation(p)?,
            expand: opt_bool(p, "expand")?.unwrap_or(true),
        },
        "subclip" | "subclipped" => EffectSpec::Subclip {
            start: opt_f64(p, "start")?.unwrap_or(0.0),
            end: opt_f64(p, "end")?,
        },
        "crop" | "cropped" => {
            let x1 = get_u32(p, "x1")?;
            let y1 = get_u32(p, "y1")?;
            let x2 = get_u32(p, "x2")?;
            let y2 = get_u32(p, "y2")?;
            EffectSpec::Crop(PixelRect {
                x0: x1,
                y0: y1,
                x1: x2,
                y1: y2,
            })
        }
        "multiply_color" | "multiplycolor" | "brightness" => EffectSpec::MultiplyColor {
            factor: get_f64(p, "factor")?,
        },
        "painting" => EffectSpec::Painting {
            saturation: opt_f64(p, "saturation")?.unwrap_or(1.4),
            black: opt_f64(p, "black")?.unwrap_or(0.006),
        },
        "lum_contrast" | "lumcontrast" => EffectSpec::LumContrast {
            lum: opt_f64(p, "lum")?.unwrap_or(0.0),
            contrast: opt_f64(p, "contrast")?.unwrap_or(0.0),
            threshold: opt_f64(p, "threshold")?.unwrap_or(127.0),
        },
        "stereo_volume" | "multiply_stereo_volume" | "stereovolume" => EffectSpec::StereoVolume {
            left: opt_f64(p, "left")?.unwrap_or(1.0),
            right: opt_f64(p, "right")?.unwrap_or(1.0),
        },
        "volume" | "multiply_volume" => {
            let factor = get_f64(p, "factor")?;
            EffectSpec::StereoVolume {
                left: factor,
                right: factor,
            }
        }
        "audio_delay" | "audiodelay" | "echo" => EffectSpec::AudioDelay {
            offset: opt_f64(p, "offset")?.unwrap_or(0.2),
            repeats: opt_u32(p, "repeats")?.unwrap_or(8),
            decay: opt_f64(p, "decay")?.unwrap_or(1.0),
        },
        "audio_fade_in" | "audiofadein" => EffectSpec::AudioFadeIn {
            duration: get_f64(p, "duration")?,
        },
        "audio_fade_out" | "audiofadeout" => EffectSpec::AudioFadeOut {
            duration: get_f64(p, "duration")?,
        },
        "audio_normalize" | "audionormalize" | "normalize" => EffectSpec::AudioNormalize,
        "particles" | "particle_text" => EffectSpec::Particles(parse_particles(p)?),
        _ => {
            return Err(MontageError::validation(format!(
                "unknown effect kind '{kind}'"
            )));
        }
    };
    spec.validate()?;
    Ok(spec)
}

fn parse_resize(p: &serde_json::Value) -> MontageResult<ResizeTarget> {
    if let Some(factor) = opt_f64(p, "factor")? {
        return Ok(ResizeTarget::Factor(factor));
    }
    match (opt_u32(p, "width")?, opt_u32(p, "height")?) {
        (Some(width), Some(height)) => Ok(ResizeTarget::Exact { width, height }),
        (Some(width), None) => Ok(ResizeTarget::Width(width)),
        (None, Some(height)) => Ok(ResizeTarget::Height(height)),
        (None, None) => Err(MontageError::validation(
            "resize needs width, height or factor",
        )),
    }
}

fn parse_interpolation(p: &serde_json::Value) -> MontageResult<Interpolation> {
    let Some(v) = p.get("interpolation") else {
        return Ok(Interpolation::default());
    };
    let s = v
        .as_str()
        .ok_or_else(|| MontageError::validation("rotate.interpolation must be a string"))?;
    match s.trim().to_ascii_lowercase().as_str() {
        "nearest" => Ok(Interpolation::Nearest),
        "bilinear" | "linear" => Ok(Interpolation::Bilinear),
        "bicubic" | "cubic" => Ok(Interpolation::Bicubic),
        other => Err(MontageError::validation(format!(
            "unknown interpolation '{other}'"
        ))),
    }
}

fn parse_particles(p: &serde_json::Value) -> MontageResult<ParticleParams> {
    let base = ParticleParams::default();
    let connectivity = match opt_u32(p, "connectivity")? {
        Some(n) => Connectivity::from_neighbours(u64::from(n))?,
        None => base.connectivity,
    };
    let c = MotionCurve::default();
    Ok(ParticleParams {
        duration: opt_f64(p, "duration")?.unwrap_or(base.duration),
        connectivity,
        curve: MotionCurve {
            amplitude: opt_f64(p, "amplitude")?.unwrap_or(c.amplitude),
            bias: opt_f64(p, "bias")?.unwrap_or(c.bias),
            power: opt_f64(p, "power")?.unwrap_or(c.power),
            swirl: opt_f64(p, "swirl")?.unwrap_or(c.swirl),
        },
    })
}

fn get_f64(obj: &serde_json::Value, key: &str) -> MontageResult<f64> {
    opt_f64(obj, key)?
        .ok_or_else(|| MontageError::validation(format!("missing effect param '{key}'")))
}

fn opt_f64(obj: &serde_json::Value, key: &str) -> MontageResult<Option<f64>> {
    let Some(v) = obj.get(key) else {
        return Ok(None);
    };
    let Some(n) = v.as_f64() else {
        return Err(MontageError::validation(format!(
            "effect param '{key}' must be a number"
        )));
    };
    if !n.is_finite() {
        return Err(MontageError::validation(format!(
            "effect param '{key}' must be finite"
        )));
    }
    Ok(Some(n))
}

fn get_u32(obj: &serde_json::Value, key: &str) -> MontageResult<u32> {
    opt_u32(obj, key)?
        .ok_or_else(|| MontageError::validation(format!("missing effect param '{key}'")))
}

fn opt_u32(obj: &serde_json::Value, key: &str) -> MontageResult<Option<u32>> {
    let Some(v) = obj.get(key) else {
        return Ok(None);
    };
    let Some(n) = v.as_u64() else {
        return Err(MontageError::validation(format!(
            "effect param '{key}' must be a non-negative integer"
        )));
    };
    u32::try_from(n)
        .map(Some)
        .map_err(|_| MontageError::validation(format!("effect param '{key}' is out of range")))
}

fn opt_bool(obj: &serde_json::Value, key: &str) -> MontageResult<Option<bool>> {
    let Some(v) = obj.get(key) else {
        return Ok(None);
    };
    v.as_bool()
        .map(Some)
        .ok_or_else(|| MontageError::validation(format!("effect param '{key}' must be a bool")))
}

#[cfg(test)]
#[path = "../../tests/unit/effects/spec.rs"]
mod tests;
