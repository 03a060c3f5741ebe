//! Core types for probe results: tracks and the per-source track model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fields common to every elementary stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    /// 1-based track identifier as reported by the probe tool.
    pub id: u32,
    /// Codec identifier (Matroska-style codec ID, or raw format name when
    /// unknown).
    pub codec_id: String,
    /// Human-readable format name.
    pub format: String,
    /// ISO-639 language tag.
    pub language: String,
    /// Whether the probe flagged this as the container's default track.
    pub default: bool,
    /// Whether the language matches the job's preferred language.
    pub preferred: bool,
    /// Bitrate in kbps; 0 = unknown.
    pub bitrate_kbps: u32,
    /// Whether the device rules require re-encoding this track.
    pub requires_recode: bool,
    /// Extracted elementary-stream file, set once extraction succeeds and
    /// cleared when a later step consumes (deletes) it.
    pub working_file: Option<PathBuf>,
    /// Display title, if the container carries one.
    pub title: Option<String>,
}

/// A video track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoTrack {
    #[serde(flatten)]
    pub base: Track,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pre-crop height; defaults to `height` when the probe doesn't report it.
    pub original_height: u32,
    /// Frame rate in frames per second; 0.0 = unknown.
    pub frame_rate: f64,
    /// Reference-frame count encoded into the stream; 0 = unknown.
    pub ref_frames: u32,
    /// Maximum reference frames the target device allows at this resolution.
    pub max_ref_frames: u32,
    /// Raw encoder-settings string from the probe report.
    pub encoding_settings: String,
    /// x264 b_pyramid setting parsed out of the encoder settings; 0 if absent.
    pub b_pyramid: i32,
}

/// An audio track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTrack {
    #[serde(flatten)]
    pub base: Track,
    /// 0-based audio index within the container (distinct from `base.id`).
    pub audio_index: u32,
    /// Channel count; 0 = unknown.
    pub channels: u32,
    /// Sample rate in kHz; 0.0 = unknown.
    pub sample_rate_khz: f64,
    /// Delay relative to video in milliseconds.
    pub delay_ms: i64,
    /// Format-profile string; distinguishes DTS core from DTS-MA.
    pub format_profile: String,
}

/// A subtitle track. No fields beyond the base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleTrack {
    #[serde(flatten)]
    pub base: Track,
}

/// All tracks discovered for one source file, plus the current selection
/// per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackModel {
    /// The analyzed source path.
    pub source: PathBuf,
    /// Movie/file title from the general probe report.
    pub title: Option<String>,
    pub video: Vec<VideoTrack>,
    pub audio: Vec<AudioTrack>,
    pub subtitles: Vec<SubtitleTrack>,
    /// Index into `video` of the currently selected track.
    pub selected_video: Option<usize>,
    /// Index into `audio` of the currently selected track.
    pub selected_audio: Option<usize>,
    /// Index into `subtitles` of the currently selected track.
    pub selected_subtitle: Option<usize>,
}

impl TrackModel {
    /// Create an empty model for the given source.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Select defaults for any kind with no selection yet.
    ///
    /// Prefers the track the container flags as default; falls back to the
    /// first track of that kind.
    pub fn select_defaults(&mut self) {
        if self.selected_video.is_none() && !self.video.is_empty() {
            self.selected_video = Some(
                self.video
                    .iter()
                    .position(|t| t.base.default)
                    .unwrap_or(0),
            );
        }
        if self.selected_audio.is_none() && !self.audio.is_empty() {
            self.selected_audio = Some(
                self.audio
                    .iter()
                    .position(|t| t.base.default)
                    .unwrap_or(0),
            );
        }
        if self.selected_subtitle.is_none() && !self.subtitles.is_empty() {
            self.selected_subtitle = Some(0);
        }
    }

    pub fn selected_video(&self) -> Option<&VideoTrack> {
        self.selected_video.and_then(|i| self.video.get(i))
    }

    pub fn selected_video_mut(&mut self) -> Option<&mut VideoTrack> {
        self.selected_video.and_then(|i| self.video.get_mut(i))
    }

    pub fn selected_audio(&self) -> Option<&AudioTrack> {
        self.selected_audio.and_then(|i| self.audio.get(i))
    }

    pub fn selected_audio_mut(&mut self) -> Option<&mut AudioTrack> {
        self.selected_audio.and_then(|i| self.audio.get_mut(i))
    }

    pub fn selected_subtitle(&self) -> Option<&SubtitleTrack> {
        self.selected_subtitle.and_then(|i| self.subtitles.get(i))
    }

    pub fn selected_subtitle_mut(&mut self) -> Option<&mut SubtitleTrack> {
        self.selected_subtitle.and_then(|i| self.subtitles.get_mut(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: u32, default: bool) -> VideoTrack {
        VideoTrack {
            base: Track {
                id,
                default,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn select_defaults_prefers_default_flag() {
        let mut model = TrackModel::new("/test.mkv");
        model.video.push(video(1, false));
        model.video.push(video(2, true));
        model.select_defaults();
        assert_eq!(model.selected_video, Some(1));
        assert_eq!(model.selected_video().unwrap().base.id, 2);
    }

    #[test]
    fn select_defaults_falls_back_to_first() {
        let mut model = TrackModel::new("/test.mkv");
        model.video.push(video(1, false));
        model.video.push(video(2, false));
        model.select_defaults();
        assert_eq!(model.selected_video, Some(0));
    }

    #[test]
    fn select_defaults_keeps_existing_selection() {
        let mut model = TrackModel::new("/test.mkv");
        model.video.push(video(1, true));
        model.video.push(video(2, false));
        model.selected_video = Some(1);
        model.select_defaults();
        assert_eq!(model.selected_video, Some(1));
    }

    #[test]
    fn empty_model_selects_nothing() {
        let mut model = TrackModel::new("/test.mkv");
        model.select_defaults();
        assert!(model.selected_video.is_none());
        assert!(model.selected_audio.is_none());
        assert!(model.selected_subtitle.is_none());
    }

    #[test]
    fn serde_roundtrip_flattens_base() {
        let mut model = TrackModel::new("/test.mkv");
        model.audio.push(AudioTrack {
            base: Track {
                id: 2,
                codec_id: "A_DTS".into(),
                language: "eng".into(),
                ..Default::default()
            },
            channels: 6,
            sample_rate_khz: 48.0,
            ..Default::default()
        });
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains(r#""codec_id":"A_DTS""#));
        let back: TrackModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.audio[0].channels, 6);
        assert_eq!(back.audio[0].base.codec_id, "A_DTS");
    }
}
