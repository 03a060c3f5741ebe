//! Media-domain vocabulary: track kinds, codec identifiers, and the
//! language catalog.
//!
//! Codec identity uses Matroska-style codec ID strings throughout, because
//! the container probe reports them verbatim and the pipeline keys its
//! extraction/mux behavior on them. Formats the general probe reports under
//! other names are mapped onto this vocabulary by [`codec_for_format`];
//! unknown formats keep their raw format string as the codec ID.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

/// Kind of elementary stream within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec identifiers
// ---------------------------------------------------------------------------

/// Matroska-style codec ID constants.
pub mod codec {
    pub const H264: &str = "V_MPEG4/ISO/AVC";
    pub const HEVC: &str = "V_MPEGH/ISO/HEVC";
    pub const MPEG2: &str = "V_MPEG2";
    pub const VFW: &str = "V_MS/VFW/FOURCC";
    pub const VC1: &str = "V_MS/VFW/WVC1";

    pub const AAC: &str = "A_AAC";
    pub const AC3: &str = "A_AC3";
    pub const DTS: &str = "A_DTS";
    pub const DTS_MA: &str = "A_DTS_MA";
    pub const TRUEHD: &str = "A_TRUEHD";
    pub const MP3: &str = "A_MP3";
    pub const VORBIS: &str = "A_VORBIS";
    pub const WMA: &str = "A_WMA";
    pub const PCM: &str = "A_PCM";
    pub const FLAC: &str = "A_FLAC";

    pub const SRT: &str = "S_TEXT/UTF8";
    pub const SSA: &str = "S_TEXT/ASS";
    pub const PGS: &str = "S_HDMV/PGS";
}

/// Working-file extension for an extracted elementary stream.
///
/// Unknown video codecs fall back to `.avi`; anything else unknown gets a
/// neutral `.bin`.
pub fn working_extension(codec_id: &str) -> &'static str {
    match codec_id {
        codec::AC3 => ".ac3",
        codec::AAC => ".aac",
        codec::DTS_MA => ".dtshd",
        codec::DTS => ".dts",
        codec::TRUEHD => ".thd",
        codec::MP3 => ".mp3",
        codec::VORBIS => ".ogg",
        codec::WMA => ".wma",
        codec::PCM => ".pcm",
        codec::FLAC => ".flac",
        codec::VFW => ".avi",
        codec::VC1 => ".vc1",
        codec::H264 => ".h264",
        codec::HEVC => ".h265",
        codec::MPEG2 => ".mpg",
        codec::SRT => ".srt",
        codec::SSA => ".ssa",
        codec::PGS => ".pgs",
        other if other.starts_with("V_") => ".avi",
        _ => ".bin",
    }
}

/// Map a general-probe format name onto the codec ID vocabulary.
///
/// Formats outside the table keep their raw name as the codec ID.
pub fn codec_for_format(format: &str) -> String {
    match format {
        "AVC" => codec::H264.to_string(),
        "HEVC" => codec::HEVC.to_string(),
        "DTS" => codec::DTS.to_string(),
        "AAC" => codec::AAC.to_string(),
        "AC-3" => codec::AC3.to_string(),
        "WMA" => codec::WMA.to_string(),
        "PCM" => codec::PCM.to_string(),
        "FLAC" => codec::FLAC.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// Language codes selectable as the preferred audio/subtitle language.
pub const PREFERRED_LANGUAGES: &[&str] = &[
    "dan", "ger", "eng", "spa", "fre", "ita", "dut", "nor", "pol", "por", "rus", "slv", "fin",
    "swe", "chi", "tur",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_kind_display_and_serde() {
        assert_eq!(TrackKind::Video.to_string(), "video");
        assert_eq!(TrackKind::Subtitle.to_string(), "subtitle");
        let json = serde_json::to_string(&TrackKind::Audio).unwrap();
        assert_eq!(json, r#""audio""#);
        let back: TrackKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TrackKind::Audio);
    }

    #[test]
    fn working_extensions_for_known_codecs() {
        assert_eq!(working_extension(codec::H264), ".h264");
        assert_eq!(working_extension(codec::HEVC), ".h265");
        assert_eq!(working_extension(codec::DTS_MA), ".dtshd");
        assert_eq!(working_extension(codec::DTS), ".dts");
        assert_eq!(working_extension(codec::PGS), ".pgs");
    }

    #[test]
    fn unknown_video_codec_falls_back_to_avi() {
        assert_eq!(working_extension("V_THEORA"), ".avi");
    }

    #[test]
    fn unknown_codec_falls_back_to_bin() {
        assert_eq!(working_extension("X_MYSTERY"), ".bin");
    }

    #[test]
    fn format_lookup_maps_known_formats() {
        assert_eq!(codec_for_format("AVC"), codec::H264);
        assert_eq!(codec_for_format("AC-3"), codec::AC3);
        assert_eq!(codec_for_format("FLAC"), codec::FLAC);
    }

    #[test]
    fn format_lookup_keeps_unknown_raw() {
        assert_eq!(codec_for_format("Cook"), "Cook");
    }

    #[test]
    fn language_catalog_contains_english() {
        assert!(PREFERRED_LANGUAGES.contains(&"eng"));
        assert_eq!(PREFERRED_LANGUAGES.len(), 16);
    }
}
