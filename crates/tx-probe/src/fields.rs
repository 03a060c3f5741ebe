//! Labeled-field extraction from semi-structured probe reports.
//!
//! Probe tools emit fixed-column text reports in two dialects: the
//! container-track report (`mkvinfo`) with `|  + Label: value` lines and the
//! general report (`mediainfo`) with `Label   : value` lines. All
//! tool-specific label strings live in the per-dialect tables below; the
//! typed accessors never fail on a missing label, they return the documented
//! sentinel (0, empty string, or `None`) instead.

/// Report dialect, selecting the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Section-based general report (`General`/`Video`/`Audio #n` blocks).
    MediaInfo,
    /// Block-structured container-track report.
    MkvInfo,
}

/// Fields resolvable through a dialect's label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TrackNumber,
    DefaultFlag,
    Language,
    TrackType,
    CodecId,
    Format,
    FrameRate,
    PixelWidth,
    PixelHeight,
    OriginalHeight,
    ReferenceFrames,
    BitRate,
    NominalBitRate,
    MaximumBitRate,
    SampleRate,
    Channels,
    FormatProfile,
    EncodingSettings,
    DelayToVideo,
    Title,
    MovieName,
    StreamId,
}

impl Dialect {
    /// Label string for a field, or `None` when the dialect never reports it.
    fn label(self, field: Field) -> Option<&'static str> {
        match self {
            Dialect::MkvInfo => match field {
                Field::TrackNumber => Some("|  + Track number: "),
                Field::DefaultFlag => Some("|  + Default flag: "),
                Field::Language => Some("|  + Language: "),
                Field::TrackType => Some("|  + Track type: "),
                Field::CodecId => Some("Codec ID: "),
                Field::FrameRate => Some("|  + Default duration: "),
                Field::PixelWidth => Some("+ Pixel width: "),
                Field::PixelHeight => Some("+ Pixel height: "),
                _ => None,
            },
            Dialect::MediaInfo => match field {
                Field::Language => Some("Language"),
                Field::Format => Some("Format  "),
                Field::FrameRate => Some("Frame rate  "),
                Field::PixelWidth => Some("Width"),
                Field::PixelHeight => Some("Height"),
                Field::OriginalHeight => Some("Original height"),
                Field::ReferenceFrames => Some("Format settings, ReFrames"),
                Field::BitRate => Some("Bit rate  "),
                Field::NominalBitRate => Some("Nominal bit rate  "),
                Field::MaximumBitRate => Some("Maximum bit rate  "),
                Field::SampleRate => Some("Sampling rate  "),
                Field::Channels => Some("Channel(s)"),
                Field::FormatProfile => Some("Format profile "),
                Field::EncodingSettings => Some("Encoding settings "),
                Field::DelayToVideo => Some("Delay relative to video "),
                Field::Title => Some("Title  "),
                Field::MovieName => Some("Movie name  "),
                Field::StreamId => Some("\nID "),
                _ => None,
            },
        }
    }
}

impl Field {
    /// Characters taken when the report ends without a newline after the
    /// value. The source tools pad values into fixed columns, so a short
    /// prefix is still meaningful.
    fn fallback_width(self) -> usize {
        match self {
            Field::Language | Field::Format | Field::Title | Field::MovieName => 3,
            Field::FrameRate => 4,
            Field::TrackType
            | Field::CodecId
            | Field::FormatProfile
            | Field::EncodingSettings
            | Field::DelayToVideo => 5,
            _ => 2,
        }
    }
}

/// Extracts typed field values from one report (or report segment).
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor<'a> {
    text: &'a str,
    dialect: Dialect,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(text: &'a str, dialect: Dialect) -> Self {
        Self { text, dialect }
    }

    /// Raw value for a field: the text after the label (and, for the
    /// general dialect, after the `": "` column separator), up to the next
    /// line break. `None` when the label is absent.
    fn raw(&self, field: Field) -> Option<String> {
        let label = self.dialect.label(field)?;
        let start = self.text.find(label)? + label.len();
        let mut rest = &self.text[start..];

        // General-report labels are padded into a column before ": ".
        if self.dialect == Dialect::MediaInfo {
            let sep = rest.find(": ")?;
            rest = &rest[sep + 2..];
        }

        let value = match rest.find('\n') {
            Some(i) => &rest[..i],
            None => {
                let width = field.fallback_width();
                let end = rest
                    .char_indices()
                    .nth(width)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                &rest[..end]
            }
        };
        Some(value.trim_end_matches('\r').trim().to_string())
    }

    /// String field; empty string when absent.
    pub fn text_field(&self, field: Field) -> String {
        self.raw(field).unwrap_or_default()
    }

    /// String field with an explicit default for absence.
    pub fn text_field_or(&self, field: Field, default: &str) -> String {
        self.raw(field).unwrap_or_else(|| default.to_string())
    }

    /// Boolean flag; the report writes `0`/`1`.
    pub fn flag(&self, field: Field) -> bool {
        self.raw(field).is_some_and(|v| v.contains('1'))
    }

    /// Unsigned number with any unit suffix or thousands separators
    /// stripped; 0 when absent.
    pub fn unsigned(&self, field: Field) -> u32 {
        let Some(value) = self.raw(field) else {
            return 0;
        };
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }

    /// Track number; newer container-probe versions append
    /// "(track ID for ...)" on the same line. 0 when absent.
    pub fn track_number(&self) -> u32 {
        let Some(value) = self.raw(Field::TrackNumber) else {
            return 0;
        };
        let value = match value.find("(track ID for") {
            Some(i) => &value[..i],
            None => &value[..],
        };
        value.trim().parse().unwrap_or(0)
    }

    /// Bitrate normalized to kbps: `Mbps` scales by 1024, `Kbps` passes
    /// through, a bare `bps` value is treated as the report's kilo unit and
    /// scaled by 1024. 0 when absent or unparseable.
    pub fn bitrate_kbps(&self, field: Field) -> u32 {
        self.raw(field)
            .map(|v| parse_scaled(&v, "Kbps", "Mbps") as u32)
            .unwrap_or(0)
    }

    /// Video bitrate with the report's fallback chain: actual, then nominal.
    pub fn video_bitrate_kbps(&self) -> u32 {
        let rate = self.bitrate_kbps(Field::BitRate);
        if rate != 0 {
            return rate;
        }
        self.bitrate_kbps(Field::NominalBitRate)
    }

    /// Audio bitrate fallback chain: actual, nominal, then maximum.
    pub fn audio_bitrate_kbps(&self) -> u32 {
        for field in [Field::BitRate, Field::NominalBitRate, Field::MaximumBitRate] {
            let rate = self.bitrate_kbps(field);
            if rate != 0 {
                return rate;
            }
        }
        0
    }

    /// Sample rate normalized to kHz (`MHz` scales by 1024, `KHz` passes
    /// through, bare `Hz` is treated as kHz and scaled). 0.0 when absent.
    pub fn sample_rate_khz(&self) -> f64 {
        self.raw(Field::SampleRate)
            .map(|v| parse_scaled(&v, "KHz", "MHz"))
            .unwrap_or(0.0)
    }

    /// Reference-frame count: either "N frames" or a bare digit. 0 when
    /// absent.
    pub fn reference_frames(&self) -> u32 {
        let Some(value) = self.raw(Field::ReferenceFrames) else {
            return 0;
        };
        let head = match value.find("frames") {
            Some(i) => value[..i].trim(),
            None => value.trim(),
        };
        if let Ok(n) = head.parse() {
            return n;
        }
        // Fall back to the first digit character.
        value
            .chars()
            .find(|c| c.is_ascii_digit())
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0)
    }

    /// Frame rate in fps. The general dialect writes "23.976 fps"; the
    /// container dialect buries it in parentheses on the default-duration
    /// line ("41.708ms (23.976 frames/fields per second ...)"). 0.0 when
    /// absent.
    pub fn frame_rate(&self) -> f64 {
        let Some(value) = self.raw(Field::FrameRate) else {
            return 0.0;
        };
        let numeric: String = match self.dialect {
            Dialect::MediaInfo => value
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect(),
            Dialect::MkvInfo => {
                let Some(open) = value.find('(') else {
                    return 0.0;
                };
                let inner = &value[open + 1..];
                match inner.find(' ') {
                    Some(i) => inner[..i].to_string(),
                    None => inner.chars().take(4).collect(),
                }
            }
        };
        numeric.parse().unwrap_or(0.0)
    }

    /// Audio delay relative to video, in milliseconds. 0 when absent.
    pub fn delay_ms(&self) -> i64 {
        let Some(value) = self.raw(Field::DelayToVideo) else {
            return 0;
        };
        let head = match value.find("ms") {
            Some(i) => value[..i].trim(),
            None => value.trim(),
        };
        head.replace(' ', "").parse().unwrap_or(0)
    }

    /// Stream ID from a general-report section ("ID : 1", sometimes with a
    /// hex alias after a space). -1 when absent, matching the caller's
    /// assign-sequentially fallback.
    pub fn stream_id(&self) -> i64 {
        let Some(value) = self.raw(Field::StreamId) else {
            return -1;
        };
        value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(-1)
    }
}

/// Index after an "Audio #" section header, e.g. "Audio #2". `None` for a
/// plain "Audio" header.
pub fn audio_section_index(section: &str) -> Option<u32> {
    let start = section.find("Audio #")? + "Audio #".len();
    let digits: String = section[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse a value with thousands separators and a kilo/mega unit suffix,
/// normalizing to the kilo unit. Unlabeled values are treated as the base
/// unit and scaled by 1024.
fn parse_scaled(value: &str, kilo: &str, mega: &str) -> f64 {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let numeric: String = cleaned
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let Ok(n) = numeric.parse::<f64>() else {
        return 0.0;
    };
    if cleaned.contains(mega) {
        n * 1024.0
    } else if cleaned.contains(kilo) {
        n
    } else {
        n * 1024.0
    }
}
