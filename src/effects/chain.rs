use std::sync::Arc;

use crate::effects::audio::{AudioFaded, AudioSubclip, Echo, Normalized, StereoGain};
use crate::effects::color::ColorOp;
use crate::effects::spec::{EffectInstance, EffectSpec, EffectTarget, parse_effect};
use crate::effects::video::{
    ColorMapped, Cropped, Faded, OpacityScaled, Ramp, Resized, Rotated, Subclipped,
};
use crate::foundation::core::Canvas;
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::stream::{AudioRef, VideoRef};
use crate::particles::assemble::ParticleAssembly;

/// Streams present on a node's media.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSet {
    /// A video stream is present.
    pub video: bool,
    /// An audio stream is present.
    pub audio: bool,
}

impl StreamSet {
    fn satisfies(self, target: EffectTarget) -> bool {
        match target {
            EffectTarget::Video => self.video,
            EffectTarget::Audio => self.audio,
            EffectTarget::Both => self.video || self.audio,
        }
    }
}

/// Environment an effect chain is materialized in.
#[derive(Clone, Copy, Debug)]
pub struct EffectContext {
    /// Render canvas.
    pub canvas: Canvas,
    /// Resolved node duration, used where a stream has no length of its own.
    pub node_duration: f64,
    /// Audio mix rate.
    pub sample_rate: u32,
}

/// A node's streams at some point in its chain.
#[derive(Clone, Debug, Default)]
pub struct NodeStreams {
    /// Video stream.
    pub video: Option<VideoRef>,
    /// Audio stream.
    pub audio: Option<AudioRef>,
}

/// Ordered, type-checked list of effects owned by one node.
///
/// Effects run as a left-to-right fold: each stage wraps the previous stage's stream. Nothing is
/// reordered or merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectChain {
    effects: Vec<EffectSpec>,
}

fn at_effect(i: usize, e: &EffectSpec) -> String {
    format!("effect #{i} ({})", e.name())
}

impl EffectChain {
    /// Validate every effect and check that the node has the stream each one needs.
    pub fn build(effects: Vec<EffectSpec>, streams: StreamSet) -> MontageResult<Self> {
        for (i, e) in effects.iter().enumerate() {
            e.validate().map_err(|err| err.context(at_effect(i, e)))?;
            if !streams.satisfies(e.target()) {
                return Err(MontageError::validation(format!(
                    "{} needs a {} stream the media does not have",
                    at_effect(i, e),
                    match e.target() {
                        EffectTarget::Audio => "audio",
                        _ => "video",
                    }
                )));
            }
        }
        Ok(Self { effects })
    }

    /// Parse untyped declarations and build the chain.
    pub fn from_instances(instances: &[EffectInstance], streams: StreamSet) -> MontageResult<Self> {
        let effects = instances
            .iter()
            .enumerate()
            .map(|(i, inst)| {
                parse_effect(inst).map_err(|e| e.context(format!("effect #{i} ('{}')", inst.kind)))
            })
            .collect::<MontageResult<Vec<_>>>()?;
        Self::build(effects, streams)
    }

    /// Effects in application order.
    pub fn effects(&self) -> &[EffectSpec] {
        &self.effects
    }

    /// `true` when the chain has no effects.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Media duration after every temporal effect.
    pub fn duration_after(&self, intrinsic: Option<f64>) -> Option<f64> {
        self.effects
            .iter()
            .fold(intrinsic, |d, e| e.map_duration(d))
    }

    /// Wrap `streams` in each effect, left to right.
    pub fn apply(&self, streams: NodeStreams, ctx: &EffectContext) -> MontageResult<NodeStreams> {
        self.effects
            .iter()
            .enumerate()
            .try_fold(streams, |s, (i, e)| {
                apply_one(e, s, ctx).map_err(|err| err.context(at_effect(i, e)))
            })
    }
}

fn apply_one(e: &EffectSpec, s: NodeStreams, ctx: &EffectContext) -> MontageResult<NodeStreams> {
    let NodeStreams { video, audio } = s;
    if let EffectSpec::Subclip { start, end } = *e {
        let video = match video {
            Some(v) => Some(Arc::new(Subclipped::new(v, start, end)?) as VideoRef),
            None => None,
        };
        let audio = match audio {
            Some(a) => Some(Arc::new(AudioSubclip::new(a, start, end)?) as AudioRef),
            None => None,
        };
        return Ok(NodeStreams { video, audio });
    }

    match e.target() {
        EffectTarget::Video => {
            let v = video.ok_or_else(|| MontageError::evaluation("no video stream"))?;
            Ok(NodeStreams {
                video: Some(apply_video(e, v, ctx)?),
                audio,
            })
        }
        EffectTarget::Audio => {
            let a = audio.ok_or_else(|| MontageError::evaluation("no audio stream"))?;
            Ok(NodeStreams {
                video,
                audio: Some(apply_audio(e, a, ctx)?),
            })
        }
        EffectTarget::Both => Ok(NodeStreams { video, audio }),
    }
}

fn apply_video(e: &EffectSpec, v: VideoRef, ctx: &EffectContext) -> MontageResult<VideoRef> {
    let out: VideoRef = match *e {
        EffectSpec::FadeIn { duration } => {
            Arc::new(Faded::new(v, Ramp::In, duration, f64::INFINITY))
        }
        EffectSpec::FadeOut { duration } => {
            let end = v.duration().unwrap_or(ctx.node_duration);
            Arc::new(Faded::new(v, Ramp::Out, duration, end))
        }
        EffectSpec::Opacity { value } => Arc::new(OpacityScaled::new(v, value)),
        EffectSpec::Resize(target) => {
            let (w, h) = v.size();
            let (ow, oh) = target.output_size(w, h);
            Arc::new(Resized::new(v, ow, oh)?)
        }
        EffectSpec::Rotate {
            angle_deg,
            interpolation,
            expand,
        } => Arc::new(Rotated::new(v, angle_deg, interpolation, expand)),
        EffectSpec::Crop(rect) => Arc::new(Cropped::new(v, rect)?),
        EffectSpec::MultiplyColor { factor } => {
            Arc::new(ColorMapped::new(v, ColorOp::Multiply { factor }))
        }
        EffectSpec::Painting { saturation, black } => {
            Arc::new(ColorMapped::new(v, ColorOp::Painting { saturation, black }))
        }
        EffectSpec::LumContrast {
            lum,
            contrast,
            threshold,
        } => Arc::new(ColorMapped::new(
            v,
            ColorOp::LumContrast {
                lum,
                contrast,
                threshold,
            },
        )),
        EffectSpec::Particles(params) => Arc::new(ParticleAssembly::new(v, ctx.canvas, params)?),
        _ => {
            return Err(MontageError::evaluation(format!(
                "{} is not a video effect",
                e.name()
            )));
        }
    };
    Ok(out)
}

fn apply_audio(e: &EffectSpec, a: AudioRef, ctx: &EffectContext) -> MontageResult<AudioRef> {
    let out: AudioRef = match *e {
        EffectSpec::StereoVolume { left, right } => Arc::new(StereoGain::new(a, left, right)),
        EffectSpec::AudioDelay {
            offset,
            repeats,
            decay,
        } => Arc::new(Echo::new(a, offset, repeats, decay)),
        EffectSpec::AudioFadeIn { duration } => {
            Arc::new(AudioFaded::new(a, Ramp::In, duration, f64::INFINITY))
        }
        EffectSpec::AudioFadeOut { duration } => {
            let end = a.duration().unwrap_or(ctx.node_duration);
            Arc::new(AudioFaded::new(a, Ramp::Out, duration, end))
        }
        EffectSpec::AudioNormalize => {
            let span = a.duration().unwrap_or(ctx.node_duration);
            Arc::new(Normalized::new(a, span, ctx.sample_rate)?)
        }
        _ => {
            return Err(MontageError::evaluation(format!(
                "{} is not an audio effect",
                e.name()
            )));
        }
    };
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/chain.rs"]
mod tests;
