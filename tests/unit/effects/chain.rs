use serde_json::json;

use super::*;
use crate::effects::spec::ResizeTarget;
use crate::foundation::error::ErrorKind;
use crate::media::source::{SolidColor, Tone};

const AUDIO: StreamSet = StreamSet {
    video: false,
    audio: true,
};
const VIDEO: StreamSet = StreamSet {
    video: true,
    audio: false,
};

fn ctx() -> EffectContext {
    EffectContext {
        canvas: Canvas::new(64, 36).unwrap(),
        node_duration: 4.0,
        sample_rate: 1000,
    }
}

fn tone() -> NodeStreams {
    NodeStreams {
        video: None,
        audio: Some(Arc::new(Tone::new(5.0, 0.5, 2.0).unwrap())),
    }
}

fn audio_out(effects: Vec<EffectSpec>, t: f64) -> [f32; 2] {
    let chain = EffectChain::build(effects, AUDIO).unwrap();
    let out = chain.apply(tone(), &ctx()).unwrap();
    out.audio.unwrap().sample_at(t)
}

#[test]
fn channel_balance_ops_commute_exactly() {
    let a = EffectSpec::StereoVolume {
        left: 0.5,
        right: 1.0,
    };
    let b = EffectSpec::StereoVolume {
        left: 1.0,
        right: 0.25,
    };
    for t in [0.01, 0.37, 1.5] {
        assert_eq!(
            audio_out(vec![a.clone(), b.clone()], t),
            audio_out(vec![b.clone(), a.clone()], t)
        );
    }
}

#[test]
fn volume_then_normalize_differs_from_normalize_then_volume() {
    let vol = EffectSpec::StereoVolume {
        left: 0.5,
        right: 0.5,
    };
    let t = 0.05; // sine peak of a 5 Hz tone
    let vn = audio_out(vec![vol.clone(), EffectSpec::AudioNormalize], t);
    let nv = audio_out(vec![EffectSpec::AudioNormalize, vol], t);
    assert!((vn[0] - 1.0).abs() < 1e-3);
    assert!((nv[0] - 0.5).abs() < 1e-3);
}

#[test]
fn fade_in_then_subclip_differs_from_subclip_then_fade_in() {
    let fade = EffectSpec::AudioFadeIn { duration: 1.0 };
    let sub = EffectSpec::Subclip {
        start: 0.5,
        end: None,
    };
    let t = 0.25;
    let fs = audio_out(vec![fade.clone(), sub.clone()], t);
    let sf = audio_out(vec![sub, fade], t);
    // Same source sample (0.75 s), gains 0.75 and 0.25.
    assert!((fs[0] / sf[0] - 3.0).abs() < 1e-4);
}

#[test]
fn audio_effect_on_silent_media_is_rejected_with_index() {
    let err = EffectChain::build(
        vec![
            EffectSpec::FadeIn { duration: 1.0 },
            EffectSpec::StereoVolume {
                left: 1.0,
                right: 1.0,
            },
        ],
        VIDEO,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().contains("effect #1 (stereo_volume)"));
}

#[test]
fn out_of_domain_param_fails_at_build() {
    let err = EffectChain::build(vec![EffectSpec::FadeIn { duration: -1.0 }], VIDEO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().starts_with("effect #0 (fade_in)"));
}

#[test]
fn subclip_accepts_either_stream() {
    let sub = EffectSpec::Subclip {
        start: 0.0,
        end: Some(1.0),
    };
    assert!(EffectChain::build(vec![sub.clone()], VIDEO).is_ok());
    assert!(EffectChain::build(vec![sub], AUDIO).is_ok());
}

#[test]
fn durations_fold_left_to_right() {
    let chain = EffectChain::build(
        vec![
            EffectSpec::Subclip {
                start: 1.0,
                end: Some(3.0),
            },
            EffectSpec::AudioDelay {
                offset: 0.5,
                repeats: 2,
                decay: 0.5,
            },
        ],
        AUDIO,
    )
    .unwrap();
    assert_eq!(chain.duration_after(Some(10.0)), Some(3.0));
    let out = chain.apply(tone(), &ctx()).unwrap();
    assert_eq!(out.audio.unwrap().duration(), Some(2.0));
}

#[test]
fn video_chain_changes_frame_size() {
    let chain = EffectChain::build(
        vec![
            EffectSpec::Resize(ResizeTarget::Factor(2.0)),
            EffectSpec::Rotate {
                angle_deg: 90.0,
                interpolation: Default::default(),
                expand: true,
            },
        ],
        VIDEO,
    )
    .unwrap();
    let streams = NodeStreams {
        video: Some(Arc::new(SolidColor::new(8, 4, [1, 2, 3, 255]).unwrap())),
        audio: None,
    };
    let out = chain.apply(streams, &ctx()).unwrap();
    assert_eq!(out.video.unwrap().size(), (8, 16));
}

#[test]
fn blank_particles_error_names_the_effect() {
    let chain = EffectChain::build(
        vec![EffectSpec::Particles(Default::default())],
        VIDEO,
    )
    .unwrap();
    let streams = NodeStreams {
        video: Some(Arc::new(SolidColor::new(8, 4, [0, 0, 0, 0]).unwrap())),
        audio: None,
    };
    let err = chain.apply(streams, &ctx()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.message().contains("effect #0 (particles)"));
}

#[test]
fn source_is_never_mutated() {
    let source = tone();
    let chain = EffectChain::build(
        vec![EffectSpec::StereoVolume {
            left: 0.0,
            right: 0.0,
        }],
        AUDIO,
    )
    .unwrap();
    let before = source.audio.as_ref().unwrap().sample_at(0.05);
    let _ = chain.apply(source.clone(), &ctx()).unwrap();
    assert_eq!(source.audio.unwrap().sample_at(0.05), before);
}

#[test]
fn parses_instances() {
    let chain = EffectChain::from_instances(
        &[EffectInstance {
            kind: "fadein".into(),
            params: json!({"duration": 0.5}),
        }],
        VIDEO,
    )
    .unwrap();
    assert_eq!(chain.effects(), &[EffectSpec::FadeIn { duration: 0.5 }]);

    let err = EffectChain::from_instances(
        &[EffectInstance {
            kind: "warp".into(),
            params: json!({}),
        }],
        VIDEO,
    )
    .unwrap_err();
    assert!(err.message().contains("effect #0 ('warp')"));
}
