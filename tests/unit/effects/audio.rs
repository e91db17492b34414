use std::sync::Arc;

use super::*;
use crate::media::audio::AudioBuffer;
use crate::media::source::{PcmAudio, Silence};

/// 1 second of stereo PCM at 10 Hz.
fn pcm(left: [f32; 10], right: [f32; 10]) -> AudioRef {
    let interleaved_f32 = left.iter().zip(right).flat_map(|(l, r)| [*l, r]).collect();
    let buf = AudioBuffer {
        sample_rate: 10,
        channels: 2,
        interleaved_f32,
    };
    Arc::new(PcmAudio::new(buf).unwrap())
}

fn impulse() -> AudioRef {
    let mut x = [0.0; 10];
    x[0] = 1.0;
    pcm(x, x)
}

#[test]
fn stereo_gain_is_per_channel() {
    let s = StereoGain::new(pcm([0.5; 10], [0.5; 10]), 2.0, 0.0);
    assert_eq!(s.sample_at(0.3), [1.0, 0.0]);
}

#[test]
fn echo_gains_are_linearly_spaced() {
    let e = Echo::new(impulse(), 0.5, 2, 0.0);
    assert_eq!(e.gains(), &[1.0, 0.5, 0.0]);
    assert_eq!(e.duration(), Some(2.0));
    assert_eq!(e.sample_at(0.0), [1.0, 1.0]);
    assert_eq!(e.sample_at(0.5), [0.5, 0.5]);
    assert_eq!(e.sample_at(1.0), [0.0, 0.0]);
}

#[test]
fn echo_does_not_read_before_zero() {
    let e = Echo::new(pcm([0.25; 10], [0.25; 10]), 0.5, 1, 1.0);
    assert_eq!(e.sample_at(0.2), [0.25, 0.25]);
    assert_eq!(e.sample_at(0.7), [0.5, 0.5]);
}

#[test]
fn audio_fades_ramp_gain() {
    let fin = AudioFaded::new(pcm([1.0; 10], [1.0; 10]), Ramp::In, 0.5, 1.0);
    assert_eq!(fin.sample_at(0.0), [0.0, 0.0]);
    assert_eq!(fin.sample_at(0.6), [1.0, 1.0]);

    let fout = AudioFaded::new(pcm([1.0; 10], [1.0; 10]), Ramp::Out, 0.5, 1.0);
    assert_eq!(fout.sample_at(0.2), [1.0, 1.0]);
    assert!(fout.sample_at(0.9)[0] < 0.21);
}

#[test]
fn subclip_rebases_and_silences_outside() {
    let mut left = [0.0; 10];
    left[4] = 0.75;
    let s = AudioSubclip::new(pcm(left, [0.0; 10]), 0.4, Some(0.6)).unwrap();
    assert!((s.duration().unwrap() - 0.2).abs() < 1e-12);
    assert_eq!(s.sample_at(0.0)[0], 0.75);
    assert_eq!(s.sample_at(0.3), [0.0, 0.0]);
    assert_eq!(s.sample_at(-0.1), [0.0, 0.0]);
}

#[test]
fn normalize_brings_peak_to_one() {
    let mut left = [0.1; 10];
    left[3] = -0.5;
    let n = Normalized::new(pcm(left, [0.2; 10]), 1.0, 10).unwrap();
    assert_eq!(n.gain(), 2.0);
    assert_eq!(n.sample_at(0.3), [-1.0, 0.4]);
}

#[test]
fn normalize_keeps_silence_silent() {
    let n = Normalized::new(Arc::new(Silence::new(1.0).unwrap()), 1.0, 10).unwrap();
    assert_eq!(n.gain(), 1.0);
    assert_eq!(n.sample_at(0.5), [0.0, 0.0]);
}

#[test]
fn normalize_needs_a_bounded_span() {
    assert!(Normalized::new(impulse(), f64::INFINITY, 10).is_err());
}
