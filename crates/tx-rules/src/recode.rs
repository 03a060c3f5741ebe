//! Per-device recode decision rules.
//!
//! Every device shares one baseline: a video track is recoded when its
//! codec is not baseline H.264 or when its reference-frame count exceeds
//! the resolution budget. On top of that, each device contributes a small
//! declarative predicate table, evaluated uniformly, instead of per-device
//! branching code.

use tx_core::media::codec;
use tx_probe::{AudioTrack, TrackModel, VideoTrack};

use crate::devices::{DeviceKind, DeviceProfile};
use crate::refframes;

/// Inputs the predicates are evaluated against, beyond the track itself.
#[derive(Debug)]
pub struct RecodeContext<'a> {
    pub device: &'a DeviceProfile,
    /// Lowercased source file extension without the dot (e.g. "mkv").
    pub source_extension: String,
    /// Case-insensitive language code fragment flagged as preferred.
    pub preferred_language: String,
    /// Burn subtitles into the video (forces a video recode on the
    /// disc-console profile).
    pub encode_subtitles: bool,
    /// Recode the video even when the track is device-compliant.
    pub force_video_recode: bool,
}

// ---- Video predicates ----

#[derive(Debug, Clone, Copy)]
enum VideoPredicate {
    /// The device decoder cannot play this codec at all.
    Always,
    /// Source container extension matches.
    SourceExtension(&'static str),
    /// Source extension matches and the codec is in the set.
    ContainerCodec {
        extension: &'static str,
        codecs: &'static [&'static str],
    },
    /// Subtitle burn-in was requested.
    SubtitleBurnIn,
}

impl VideoPredicate {
    fn evaluate(&self, ctx: &RecodeContext<'_>, video: &VideoTrack) -> bool {
        match self {
            VideoPredicate::Always => true,
            VideoPredicate::SourceExtension(ext) => ctx.source_extension == *ext,
            VideoPredicate::ContainerCodec { extension, codecs } => {
                ctx.source_extension == *extension && codecs.contains(&video.base.codec_id.as_str())
            }
            VideoPredicate::SubtitleBurnIn => ctx.encode_subtitles,
        }
    }
}

/// One device-specific video rule: when the predicate holds the track is
/// recoded, and its codec identity is optionally remapped (legacy
/// video-for-windows streams are relabeled VC-1 so downstream steps pick
/// the right decoder).
#[derive(Debug, Clone, Copy)]
struct VideoRule {
    when: VideoPredicate,
    remap_codec: Option<&'static str>,
}

const fn rule(when: VideoPredicate) -> VideoRule {
    VideoRule {
        when,
        remap_codec: None,
    }
}

fn video_rules(kind: DeviceKind) -> &'static [VideoRule] {
    const PS3: &[VideoRule] = &[
        rule(VideoPredicate::SourceExtension("flv")),
        VideoRule {
            when: VideoPredicate::ContainerCodec {
                extension: "mkv",
                codecs: &[codec::VFW, codec::VC1],
            },
            remap_codec: Some(codec::VC1),
        },
        rule(VideoPredicate::SubtitleBurnIn),
    ];
    const ALWAYS: &[VideoRule] = &[rule(VideoPredicate::Always)];
    match kind {
        DeviceKind::Ps3 => PS3,
        DeviceKind::IPhone3gs | DeviceKind::IPad => ALWAYS,
        _ => &[],
    }
}

// ---- Audio predicates ----

#[derive(Debug, Clone, Copy)]
enum AudioPredicate {
    CodecIn(&'static [&'static str]),
    CodecNot(&'static str),
    SampleRateKhz(f64),
}

impl AudioPredicate {
    fn evaluate(&self, audio: &AudioTrack) -> bool {
        match self {
            AudioPredicate::CodecIn(codecs) => codecs.contains(&audio.base.codec_id.as_str()),
            AudioPredicate::CodecNot(c) => audio.base.codec_id != *c,
            AudioPredicate::SampleRateKhz(rate) => audio.sample_rate_khz == *rate,
        }
    }
}

fn audio_rules(kind: DeviceKind) -> &'static [AudioPredicate] {
    match kind {
        DeviceKind::Ps3 => &[AudioPredicate::CodecIn(&[
            codec::DTS,
            codec::DTS_MA,
            codec::FLAC,
            codec::TRUEHD,
        ])],
        DeviceKind::SamsungS3
        | DeviceKind::SamsungS4
        | DeviceKind::IPhone3gs
        | DeviceKind::IPad
        | DeviceKind::Xbox360 => &[AudioPredicate::CodecNot(codec::AAC)],
        DeviceKind::Sonos => &[AudioPredicate::SampleRateKhz(96.0)],
        _ => &[],
    }
}

// ---- Evaluation ----

/// Decide recode for one video track, resolving its reference-frame budget
/// as a side effect.
pub fn mark_video(ctx: &RecodeContext<'_>, video: &mut VideoTrack) {
    let (over_budget, max) = refframes::check(video.width, video.height, video.ref_frames);
    video.max_ref_frames = max;

    let mut recode = ctx.force_video_recode || video.base.codec_id != codec::H264 || over_budget;

    for rule in video_rules(ctx.device.kind) {
        if rule.when.evaluate(ctx, video) {
            recode = true;
            if let Some(id) = rule.remap_codec {
                video.base.codec_id = id.to_string();
            }
        }
    }

    video.base.requires_recode = recode;
}

/// Decide recode for one audio track.
pub fn mark_audio(ctx: &RecodeContext<'_>, audio: &mut AudioTrack) {
    audio.base.requires_recode = audio_rules(ctx.device.kind)
        .iter()
        .any(|p| p.evaluate(audio));
}

/// Apply the device rules to every track of a model and flag tracks whose
/// language matches the preferred language.
pub fn apply(ctx: &RecodeContext<'_>, model: &mut TrackModel) {
    for video in &mut model.video {
        mark_video(ctx, video);
    }
    for audio in &mut model.audio {
        mark_audio(ctx, audio);
        if audio.base.language.contains(&ctx.preferred_language) {
            audio.base.preferred = true;
        }
    }
    for sub in &mut model.subtitles {
        if sub.base.language.contains(&ctx.preferred_language) {
            sub.base.preferred = true;
        }
    }
}
