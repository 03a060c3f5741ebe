//! Parser for the container-track probe report (mkvinfo).
//!
//! The report is block-structured: a header segment ("+ EBML head") followed
//! by one "| + A track" block per track. Tracks missing a Language line are
//! English by the container's convention.

use tracing::debug;

use crate::fields::{Dialect, Field, FieldExtractor};
use crate::types::{AudioTrack, SubtitleTrack, Track, TrackModel, VideoTrack};

const TRACK_SEPARATOR: &str = "| + A track";

/// Parse a full mkvinfo report, appending the discovered tracks to `model`.
pub fn parse(report: &str, model: &mut TrackModel) {
    for segment in report.split(TRACK_SEPARATOR) {
        if segment.contains("+ EBML head") {
            // Header segment, no track data.
            continue;
        }

        let ex = FieldExtractor::new(segment, Dialect::MkvInfo);
        let base = Track {
            id: ex.track_number(),
            codec_id: ex.text_field(Field::CodecId),
            format: ex.text_field(Field::CodecId),
            language: ex.text_field_or(Field::Language, "eng"),
            default: ex.flag(Field::DefaultFlag),
            ..Default::default()
        };

        match ex.text_field(Field::TrackType).as_str() {
            "video" => {
                let height = ex.unsigned(Field::PixelHeight);
                model.video.push(VideoTrack {
                    base,
                    width: ex.unsigned(Field::PixelWidth),
                    height,
                    original_height: height,
                    frame_rate: ex.frame_rate(),
                    ..Default::default()
                });
            }
            "audio" => {
                model.audio.push(AudioTrack {
                    base,
                    ..Default::default()
                });
            }
            "subtitles" => {
                model.subtitles.push(SubtitleTrack { base });
            }
            other => {
                debug!(track_type = other, "skipping unrecognized track block");
            }
        }
    }
}
