use rayon::prelude::*;

use crate::media::audio::AudioBuffer;
use crate::media::stream::AudioRef;
use crate::timeline::resolve::Span;

const MIX_CHUNK_FRAMES: usize = 4096;

/// One entry of the audio mix set.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    /// Owning node id.
    pub node: String,
    /// Absolute timeline span.
    pub span: Span,
    /// Effected stream; time 0 is the span start.
    pub stream: AudioRef,
}

/// Plain additive stereo mix.
///
/// Tracks are summed in mix-set order with no limiting or normalization; sums outside `[-1, 1]`
/// are kept as they are.
pub fn mix_tracks(tracks: &[AudioTrack], sample_rate: u32, duration: f64) -> AudioBuffer {
    let sr = f64::from(sample_rate);
    let total = (duration.max(0.0) * sr).round() as usize;
    let mut out = AudioBuffer::silent(sample_rate, 2, total);

    let windows: Vec<(usize, usize)> = tracks
        .iter()
        .map(|tr| {
            let s0 = (tr.span.start * sr).round() as usize;
            let s1 = (tr.span.end * sr).round() as usize;
            (s0, s1.min(total))
        })
        .collect();

    out.interleaved_f32
        .par_chunks_mut(MIX_CHUNK_FRAMES * 2)
        .enumerate()
        .for_each(|(chunk, buf)| {
            let base = chunk * MIX_CHUNK_FRAMES;
            let end = base + buf.len() / 2;
            for (tr, &(s0, s1)) in tracks.iter().zip(&windows) {
                let lo = s0.max(base);
                let hi = s1.min(end);
                for i in lo..hi {
                    let local = (i - s0) as f64 / sr;
                    let [l, r] = tr.stream.sample_at(local);
                    let j = (i - base) * 2;
                    buf[j] += l;
                    buf[j + 1] += r;
                }
            }
        });

    let peak = out.peak();
    if peak > 1.0 {
        tracing::warn!(peak, "audio mix exceeds [-1, 1]; leaving samples unclamped");
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compose/audio.rs"]
mod tests;
