//! Parser for the general probe report (mediainfo).
//!
//! The report is a blank-line-separated list of sections headed `General`,
//! `Video`, `Audio`/`Audio #n`, `Text`/`Text #n`. Two entry points exist:
//! [`merge_mkv`] enriches tracks already discovered by the container probe,
//! matching audio sections positionally; [`parse_standalone`] builds the
//! whole model from this report alone for single-dialect containers.

use tx_core::media::codec_for_format;

use crate::fields::{audio_section_index, Dialect, Field, FieldExtractor};
use crate::types::{AudioTrack, Track, TrackModel, VideoTrack};

/// Split a report into sections on blank lines.
fn sections(report: &str) -> Vec<String> {
    report
        .replace("\r\n", "\n")
        .split("\n\n")
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn first_line(section: &str) -> &str {
    section.lines().next().unwrap_or("").trim()
}

/// Parse the x264 `b_pyramid` value out of an encoder-settings string
/// ("cabac=1 / ref=4 / b_pyramid=2 / ..."). 0 when absent.
fn b_pyramid(encoding_settings: &str) -> i32 {
    for pair in encoding_settings.split('/') {
        let mut kv = pair.splitn(2, '=');
        let key = kv.next().unwrap_or("").trim().to_lowercase();
        if key == "b_pyramid" {
            return kv.next().unwrap_or("").trim().parse().unwrap_or(0);
        }
    }
    0
}

/// Enrich a container-probe track model with general-report data.
///
/// The container probe already knows ids, codecs, languages and geometry;
/// this pass adds bitrate, reference frames, encoder settings, channel
/// counts, format profiles (upgrading DTS to DTS-MA), delays, and titles.
pub fn merge_mkv(report: &str, model: &mut TrackModel) {
    for section in sections(report) {
        let header = first_line(&section);
        let ex = FieldExtractor::new(&section, Dialect::MediaInfo);

        if header == "General" {
            let name = ex.text_field(Field::MovieName);
            if !name.is_empty() {
                model.title = Some(name);
            }
        } else if header.starts_with("Video") {
            let Some(vt) = model.video.first_mut() else {
                continue;
            };
            vt.base.bitrate_kbps = ex.video_bitrate_kbps();
            vt.ref_frames = ex.reference_frames();
            vt.encoding_settings = ex.text_field(Field::EncodingSettings);
            vt.b_pyramid = b_pyramid(&vt.encoding_settings);
            let title = ex.text_field(Field::Title);
            if !title.is_empty() {
                vt.base.title = Some(title);
            }
        } else if header.starts_with("Audio") {
            let index = audio_section_index(&section).unwrap_or(1);
            let Some(at) = model.audio.get_mut(index as usize - 1) else {
                continue;
            };
            at.audio_index = index - 1;
            at.channels = ex.unsigned(Field::Channels);
            at.base.bitrate_kbps = ex.audio_bitrate_kbps();
            at.sample_rate_khz = ex.sample_rate_khz();
            at.delay_ms = ex.delay_ms();
            at.format_profile = ex.text_field(Field::FormatProfile);
            if at.format_profile == "MA" || at.format_profile == "MA / Core" {
                at.base.codec_id = tx_core::media::codec::DTS_MA.to_string();
            }
            let title = ex.text_field(Field::Title);
            if !title.is_empty() {
                at.base.title = Some(title);
            }
        }
    }
}

/// Build a track model from the general report alone.
///
/// Codec identity comes from the fixed format lookup table; unknown formats
/// keep the raw format name. The first video and audio tracks found become
/// the defaults.
pub fn parse_standalone(report: &str, model: &mut TrackModel) {
    let mut next_id: u32 = 1;

    for section in sections(report) {
        let header = first_line(&section);
        let ex = FieldExtractor::new(&section, Dialect::MediaInfo);

        if header == "General" {
            let name = ex.text_field(Field::MovieName);
            if !name.is_empty() {
                model.title = Some(name);
            }
        } else if header.starts_with("Video") {
            let id = match ex.stream_id() {
                -1 => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
                id => {
                    next_id = id as u32;
                    id as u32
                }
            };
            let format = ex.text_field(Field::Format);
            let height = ex.unsigned(Field::PixelHeight);
            let original_height = match ex.unsigned(Field::OriginalHeight) {
                0 => height,
                h => h,
            };
            model.video.push(VideoTrack {
                base: Track {
                    id,
                    codec_id: codec_for_format(&format),
                    format,
                    language: ex.text_field(Field::Language),
                    default: model.video.is_empty(),
                    bitrate_kbps: ex.bitrate_kbps(Field::BitRate),
                    ..Default::default()
                },
                width: ex.unsigned(Field::PixelWidth),
                height,
                original_height,
                frame_rate: ex.frame_rate(),
                ref_frames: ex.reference_frames(),
                ..Default::default()
            });
        } else if header.starts_with("Audio") {
            let id = match audio_section_index(&section) {
                Some(i) => {
                    next_id = i;
                    i
                }
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };
            let format = ex.text_field(Field::Format);
            model.audio.push(AudioTrack {
                base: Track {
                    id,
                    codec_id: codec_for_format(&format),
                    format,
                    language: ex.text_field(Field::Language),
                    default: model.audio.is_empty(),
                    bitrate_kbps: ex.bitrate_kbps(Field::BitRate),
                    ..Default::default()
                },
                audio_index: 0,
                channels: ex.unsigned(Field::Channels),
                sample_rate_khz: ex.sample_rate_khz(),
                format_profile: ex.text_field(Field::FormatProfile),
                ..Default::default()
            });
        }
        // Text sections are ignored; subtitles come from the container probe.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mkvinfo;

    const MKV_REPORT: &str = "+ EBML head\r\n\
+ Segment\r\n\
| + A track\r\n\
|  + Track number: 1\r\n\
|  + Track type: video\r\n\
|  + Default flag: 1\r\n\
|  + Codec ID: V_MPEG4/ISO/AVC\r\n\
|   + Pixel width: 1920\r\n\
|   + Pixel height: 1080\r\n\
| + A track\r\n\
|  + Track number: 2\r\n\
|  + Track type: audio\r\n\
|  + Default flag: 1\r\n\
|  + Codec ID: A_DTS\r\n\
|  + Language: eng\r\n";

    const MI_REPORT: &str = "General\r\n\
Movie name                       : Test Movie\r\n\
Duration                         : 1h 42mn\r\n\
\r\n\
Video\r\n\
ID                               : 1\r\n\
Format                           : AVC\r\n\
Bit rate                         : 12.5 Mbps\r\n\
Format settings, ReFrames        : 4 frames\r\n\
Encoding settings                : cabac=1 / ref=4 / b_pyramid=2\r\n\
\r\n\
Audio #1\r\n\
ID                               : 2\r\n\
Format                           : DTS\r\n\
Format profile                   : MA / Core\r\n\
Bit rate                         : 1 509 Kbps\r\n\
Channel(s)                       : 6 channels\r\n\
Sampling rate                    : 48.0 KHz\r\n\
Delay relative to video          : -83ms\r\n\
Title                            : Surround 5.1\r\n";

    #[test]
    fn merge_enriches_container_tracks() {
        let mut model = TrackModel::new("/test.mkv");
        mkvinfo::parse(MKV_REPORT, &mut model);
        merge_mkv(MI_REPORT, &mut model);

        assert_eq!(model.title.as_deref(), Some("Test Movie"));

        let vt = &model.video[0];
        assert_eq!(vt.base.bitrate_kbps, 12800);
        assert_eq!(vt.ref_frames, 4);
        assert_eq!(vt.b_pyramid, 2);

        let at = &model.audio[0];
        assert_eq!(at.audio_index, 0);
        assert_eq!(at.channels, 6);
        assert_eq!(at.base.bitrate_kbps, 1509);
        assert_eq!(at.sample_rate_khz, 48.0);
        assert_eq!(at.delay_ms, -83);
        assert_eq!(at.base.title.as_deref(), Some("Surround 5.1"));
    }

    #[test]
    fn merge_upgrades_dts_ma() {
        let mut model = TrackModel::new("/test.mkv");
        mkvinfo::parse(MKV_REPORT, &mut model);
        assert_eq!(model.audio[0].base.codec_id, "A_DTS");
        merge_mkv(MI_REPORT, &mut model);
        assert_eq!(model.audio[0].base.codec_id, "A_DTS_MA");
    }

    #[test]
    fn merge_with_more_sections_than_tracks_is_safe() {
        let mut model = TrackModel::new("/test.mkv");
        // No container tracks at all.
        merge_mkv(MI_REPORT, &mut model);
        assert!(model.video.is_empty());
        assert!(model.audio.is_empty());
    }

    const MI_MP4: &str = "General\r\n\
Complete name                    : /test.mp4\r\n\
\r\n\
Video\r\n\
ID                               : 1\r\n\
Format                           : AVC\r\n\
Width                            : 1 280 pixels\r\n\
Height                           : 720 pixels\r\n\
Frame rate                       : 29.970 fps\r\n\
Bit rate                         : 2 500 Kbps\r\n\
\r\n\
Audio\r\n\
ID                               : 2\r\n\
Format                           : AAC\r\n\
Channel(s)                       : 2 channels\r\n\
Sampling rate                    : 44.1 KHz\r\n";

    #[test]
    fn standalone_builds_tracks_with_codec_lookup() {
        let mut model = TrackModel::new("/test.mp4");
        parse_standalone(MI_MP4, &mut model);

        assert_eq!(model.video.len(), 1);
        let vt = &model.video[0];
        assert_eq!(vt.base.codec_id, "V_MPEG4/ISO/AVC");
        assert_eq!(vt.width, 1280);
        assert_eq!(vt.height, 720);
        assert_eq!(vt.original_height, 720);
        assert!(vt.base.default);

        assert_eq!(model.audio.len(), 1);
        let at = &model.audio[0];
        assert_eq!(at.base.codec_id, "A_AAC");
        assert_eq!(at.channels, 2);
        assert!(at.base.default);
    }

    #[test]
    fn standalone_keeps_unknown_format_raw() {
        let report = "Video\r\n\
Format                           : Theora\r\n\
Width                            : 640 pixels\r\n\
Height                           : 480 pixels\r\n";
        let mut model = TrackModel::new("/test.ogv");
        parse_standalone(report, &mut model);
        assert_eq!(model.video[0].base.codec_id, "Theora");
    }

    #[test]
    fn standalone_flac_for_audio_only_source() {
        let report = "General\r\n\
Complete name                    : /song.flac\r\n\
\r\n\
Audio\r\n\
Format                           : FLAC\r\n\
Channel(s)                       : 2 channels\r\n\
Sampling rate                    : 96.0 KHz\r\n";
        let mut model = TrackModel::new("/song.flac");
        parse_standalone(report, &mut model);
        assert!(model.video.is_empty());
        assert_eq!(model.audio[0].base.codec_id, "A_FLAC");
        assert_eq!(model.audio[0].sample_rate_khz, 96.0);
    }

    #[test]
    fn b_pyramid_parsing() {
        assert_eq!(b_pyramid("cabac=1 / ref=4 / b_pyramid=2"), 2);
        assert_eq!(b_pyramid("cabac=1 / ref=4"), 0);
        assert_eq!(b_pyramid(""), 0);
    }
}
