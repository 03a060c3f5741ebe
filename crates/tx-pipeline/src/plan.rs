//! Step-sequence planning.
//!
//! One table-driven function maps the (device, source container) pair plus
//! the analyzed track flags to the step sequence that produces the device's
//! playback format. An empty plan means the combination is unsupported; the
//! executor reports it as such.

use tx_core::media::codec;
use tx_rules::DeviceKind;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::{
    AudioOnlyRecode, ContainerRecodeMp4, CopyAudioElementary, CopySource, CopyVideoElementary,
    DemuxDtsCore, DeviceTwoPassRecode, DiscFormat, DvdRecodeMp4, ExportRawStreams, ExtractTracks,
    Html5Suite, LegacyAudio, LegacyTwoPassRecode, MovRecodeMp4, MuxTransportStream,
    PhoneRecodeMp4, RecodeAc3, RecodeVideoH264, RelabelDtsMa, RemergeMkv, SonosResample,
    XboxRemuxMp4,
};

/// Build the conversion plan for a regular media file.
pub fn build_plan(ctx: &StepContext) -> Vec<Box<dyn Step>> {
    let ext = ctx.source_extension.as_str();
    let has_video = ctx.video().is_some();
    let video_recode = ctx.video().map(|v| v.base.requires_recode).unwrap_or(false);
    let video_format = ctx.video().map(|v| v.base.format.clone()).unwrap_or_default();
    let audio_recode = ctx.audio().map(|a| a.base.requires_recode).unwrap_or(false);
    let audio_is_dts_ma = ctx
        .audio()
        .map(|a| a.base.codec_id == codec::DTS_MA)
        .unwrap_or(false);

    let mut steps: Vec<Box<dyn Step>> = Vec::new();

    match ctx.device.kind {
        DeviceKind::Ps3 => match ext {
            "mkv" => {
                if video_recode {
                    // Leave the video in the container for the recode; pull
                    // out audio and subtitles only.
                    steps.push(Box::new(ExtractTracks { include_video: false }));
                    steps.push(Box::new(RecodeVideoH264 {
                        burn_subtitles: ctx.encode_subtitles,
                    }));
                } else {
                    steps.push(Box::new(ExtractTracks { include_video: true }));
                }
                if audio_recode {
                    if audio_is_dts_ma {
                        steps.push(Box::new(DemuxDtsCore));
                    }
                    steps.push(Box::new(RecodeAc3));
                }
                steps.push(Box::new(MuxTransportStream {
                    format: DiscFormat::Transport,
                }));
            }
            "mpg" | "m2ts" => {
                if video_recode {
                    steps.push(Box::new(RecodeVideoH264 { burn_subtitles: false }));
                } else {
                    steps.push(Box::new(CopyVideoElementary));
                }
                steps.push(Box::new(CopyAudioElementary));
                if audio_recode {
                    steps.push(Box::new(RecodeAc3));
                }
                steps.push(Box::new(MuxTransportStream {
                    format: DiscFormat::Transport,
                }));
            }
            "mov" => steps.push(Box::new(MovRecodeMp4)),
            _ => steps.push(Box::new(ContainerRecodeMp4)),
        },

        DeviceKind::SamsungS3 | DeviceKind::SamsungS4 | DeviceKind::SamsungS5 => {
            if has_video {
                steps.push(Box::new(DeviceTwoPassRecode {
                    hevc: ctx.hevc_recode && ctx.device.hevc,
                }));
            } else {
                steps.push(Box::new(AudioOnlyRecode));
            }
        }
        DeviceKind::SamsungUhdTv => {
            if has_video {
                steps.push(Box::new(DeviceTwoPassRecode {
                    hevc: ctx.hevc_recode && ctx.device.hevc,
                }));
            }
        }

        DeviceKind::IPhone3gs | DeviceKind::IPad => {
            if has_video {
                steps.push(Box::new(PhoneRecodeMp4 {
                    from_mkv: ext == "mkv",
                }));
            } else {
                steps.push(Box::new(AudioOnlyRecode));
            }
        }

        DeviceKind::Xbox360 => {
            if ext == "mkv" {
                steps.push(Box::new(XboxRemuxMp4));
            } else {
                steps.push(Box::new(ContainerRecodeMp4));
            }
        }

        DeviceKind::RawFiles => {
            if ext == "mkv" {
                steps.push(Box::new(ExtractTracks { include_video: true }));
                steps.push(Box::new(ExportRawStreams));
            }
        }

        DeviceKind::Generic => {
            if ext == "mkv" {
                steps.push(Box::new(ExtractTracks { include_video: true }));
                if audio_is_dts_ma {
                    steps.push(Box::new(DemuxDtsCore));
                }
                steps.push(Box::new(MuxTransportStream {
                    format: DiscFormat::Transport,
                }));
            }
        }

        DeviceKind::Avchd => {
            if ext == "mkv" {
                steps.push(Box::new(ExtractTracks { include_video: true }));
                if audio_is_dts_ma {
                    steps.push(Box::new(DemuxDtsCore));
                }
                steps.push(Box::new(MuxTransportStream {
                    format: DiscFormat::Avchd,
                }));
            }
        }

        DeviceKind::BluRay => {
            if ext == "mkv" {
                steps.push(Box::new(ExtractTracks { include_video: true }));
                if audio_is_dts_ma {
                    // Blu-ray keeps the lossless stream; only the mux
                    // metadata needs the core format name.
                    steps.push(Box::new(RelabelDtsMa));
                }
                steps.push(Box::new(MuxTransportStream {
                    format: DiscFormat::BluRay,
                }));
            }
        }

        DeviceKind::WdLiveTv => match ext {
            "mkv" => {
                steps.push(Box::new(ExtractTracks { include_video: true }));
                steps.push(Box::new(RemergeMkv));
            }
            "flv" if video_format == "VP6" => {
                steps.push(Box::new(LegacyTwoPassRecode {
                    output_extension: ".flv",
                    audio: LegacyAudio::Copy,
                }));
            }
            "wmv" if video_format != "WMV3" => {
                steps.push(Box::new(LegacyTwoPassRecode {
                    output_extension: ".mkv",
                    audio: LegacyAudio::Ac3,
                }));
            }
            _ => steps.push(Box::new(CopySource)),
        },

        DeviceKind::Sonos => {
            if ext == "flac" {
                steps.push(Box::new(SonosResample));
            } else {
                steps.push(Box::new(CopySource));
            }
        }

        DeviceKind::Html5 => steps.push(Box::new(Html5Suite)),
    }

    steps
}

/// Build the conversion plan for a disc folder (`VIDEO_TS` rip).
pub fn build_disc_plan(ctx: &StepContext) -> Vec<Box<dyn Step>> {
    match ctx.device.kind {
        DeviceKind::Ps3 | DeviceKind::Xbox360 => vec![Box::new(DvdRecodeMp4 { phone: false })],
        DeviceKind::IPhone3gs | DeviceKind::IPad => vec![Box::new(DvdRecodeMp4 { phone: true })],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Pipeline;
    use std::path::Path;
    use std::sync::Arc;
    use tx_av::{ToolRegistry, Workspace};
    use tx_probe::{AudioTrack, Track, TrackModel, VideoTrack};
    use tx_rules::DeviceCatalog;

    fn model(source: &Path, video_recode: bool, audio_codec: &str, audio_recode: bool) -> TrackModel {
        let mut m = TrackModel::new(source);
        m.video.push(VideoTrack {
            base: Track {
                id: 1,
                codec_id: codec::H264.to_string(),
                requires_recode: video_recode,
                ..Track::default()
            },
            width: 1920,
            height: 1080,
            frame_rate: 23.976,
            ..VideoTrack::default()
        });
        m.audio.push(AudioTrack {
            base: Track {
                id: 2,
                codec_id: audio_codec.to_string(),
                requires_recode: audio_recode,
                ..Track::default()
            },
            channels: 6,
            ..AudioTrack::default()
        });
        m.select_defaults();
        m
    }

    fn context(file_name: &str, kind: DeviceKind, model_fn: impl FnOnce(&Path) -> TrackModel) -> StepContext {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(file_name);
        std::fs::write(&input, b"x").unwrap();
        let m = model_fn(&input);
        StepContext::new(
            Workspace::new(&input).unwrap(),
            Arc::new(ToolRegistry::from_configs([])),
            m,
            DeviceCatalog::by_kind(kind),
            dir.keep(),
        )
    }

    fn names(ctx: &StepContext) -> Vec<&'static str> {
        Pipeline::new(build_plan(ctx)).step_names()
    }

    #[test]
    fn ps3_compliant_mkv_is_remuxed_without_recoding() {
        let ctx = context("movie.mkv", DeviceKind::Ps3, |p| {
            model(p, false, codec::AC3, false)
        });
        assert_eq!(names(&ctx), vec!["extract tracks", "mux transport stream"]);
    }

    #[test]
    fn ps3_dts_ma_audio_is_demuxed_then_recoded() {
        let ctx = context("movie.mkv", DeviceKind::Ps3, |p| {
            model(p, false, codec::DTS_MA, true)
        });
        assert_eq!(
            names(&ctx),
            vec![
                "extract tracks",
                "demux dts core",
                "recode audio ac3",
                "mux transport stream",
            ]
        );
    }

    #[test]
    fn ps3_video_recode_skips_video_extraction() {
        let ctx = context("movie.mkv", DeviceKind::Ps3, |p| {
            model(p, true, codec::AC3, false)
        });
        assert_eq!(
            names(&ctx),
            vec!["extract tracks", "recode video", "mux transport stream"]
        );
    }

    #[test]
    fn ps3_transport_source_copies_elementary_streams() {
        let ctx = context("movie.m2ts", DeviceKind::Ps3, |p| {
            model(p, false, codec::AC3, false)
        });
        assert_eq!(
            names(&ctx),
            vec!["copy video", "copy audio", "mux transport stream"]
        );
    }

    #[test]
    fn ps3_quicktime_gets_single_pass_recode() {
        let ctx = context("clip.mov", DeviceKind::Ps3, |p| {
            model(p, false, codec::AAC, false)
        });
        assert_eq!(names(&ctx), vec!["recode quicktime"]);
    }

    #[test]
    fn phone_mkv_uses_device_recode() {
        let ctx = context("movie.mkv", DeviceKind::IPhone3gs, |p| {
            model(p, true, codec::DTS, true)
        });
        assert_eq!(names(&ctx), vec!["recode for device"]);
    }

    #[test]
    fn audio_only_source_becomes_m4a_for_phones() {
        let ctx = context("song.flac", DeviceKind::IPad, |p| {
            let mut m = TrackModel::new(p);
            m.audio.push(AudioTrack {
                base: Track {
                    id: 1,
                    codec_id: codec::FLAC.to_string(),
                    ..Track::default()
                },
                ..AudioTrack::default()
            });
            m.select_defaults();
            m
        });
        assert_eq!(names(&ctx), vec!["recode audio only"]);
    }

    #[test]
    fn hevc_is_a_job_choice_gated_on_the_device_profile() {
        // HEVC-capable device, flag off: H.264 by default.
        let plain = context("movie.mkv", DeviceKind::SamsungS5, |p| {
            model(p, true, codec::AC3, true)
        });
        assert_eq!(names(&plain), vec!["two-pass recode"]);

        // Same device, flag on: HEVC encode.
        let hevc = context("movie.mkv", DeviceKind::SamsungS5, |p| {
            model(p, true, codec::AC3, true)
        })
        .with_hevc_recode(true);
        assert_eq!(names(&hevc), vec!["two-pass recode hevc"]);

        // Device without HEVC support ignores the flag.
        let unsupported = context("movie.mkv", DeviceKind::SamsungS3, |p| {
            model(p, true, codec::AC3, true)
        })
        .with_hevc_recode(true);
        assert_eq!(names(&unsupported), vec!["two-pass recode"]);
    }

    #[test]
    fn bluray_relabels_lossless_audio_instead_of_demuxing() {
        let ctx = context("movie.mkv", DeviceKind::BluRay, |p| {
            model(p, false, codec::DTS_MA, false)
        });
        assert_eq!(
            names(&ctx),
            vec!["extract tracks", "relabel dts-hd", "mux transport stream"]
        );
    }

    #[test]
    fn generic_non_mkv_is_unsupported() {
        let ctx = context("movie.avi", DeviceKind::Generic, |p| {
            model(p, false, codec::AC3, false)
        });
        assert!(names(&ctx).is_empty());
    }

    #[test]
    fn wdlive_legacy_flash_video_is_recoded_in_place() {
        let ctx = context("clip.flv", DeviceKind::WdLiveTv, |p| {
            let mut m = model(p, false, codec::AAC, false);
            m.video[0].base.format = "VP6".to_string();
            m
        });
        assert_eq!(names(&ctx), vec!["recode legacy codec"]);
    }

    #[test]
    fn wdlive_playable_source_is_copied() {
        let ctx = context("movie.mp4", DeviceKind::WdLiveTv, |p| {
            model(p, false, codec::AAC, false)
        });
        assert_eq!(names(&ctx), vec!["copy source"]);
    }

    #[test]
    fn xbox_remuxes_mkv_and_recodes_the_rest() {
        let mkv = context("movie.mkv", DeviceKind::Xbox360, |p| {
            model(p, false, codec::AAC, false)
        });
        assert_eq!(names(&mkv), vec!["repackage for console"]);

        let avi = context("movie.avi", DeviceKind::Xbox360, |p| {
            model(p, false, codec::MP3, false)
        });
        assert_eq!(names(&avi), vec!["recode container"]);
    }

    #[test]
    fn disc_plans_only_exist_for_consoles_and_phones() {
        let ps3 = context("DISC", DeviceKind::Ps3, |p| model(p, false, codec::AC3, false));
        assert_eq!(
            Pipeline::new(build_disc_plan(&ps3)).step_names(),
            vec!["recode disc"]
        );

        let sonos = context("DISC", DeviceKind::Sonos, |p| TrackModel::new(p));
        assert!(build_disc_plan(&sonos).is_empty());
    }

    #[test]
    fn html5_always_encodes_the_suite() {
        let ctx = context("movie.mkv", DeviceKind::Html5, |p| {
            model(p, false, codec::AAC, false)
        });
        assert_eq!(names(&ctx), vec!["encode browser formats"]);
    }
}
