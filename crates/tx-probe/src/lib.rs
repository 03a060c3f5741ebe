//! Track model and free-text probe-report parsing.
//!
//! External probe tools emit semi-structured text reports in two dialects: a
//! block-structured container-track report (mkvinfo) and a section-based
//! general report (mediainfo). [`fields`] provides the label-based extraction
//! primitives, [`mkvinfo`] and [`mediainfo`] turn whole reports into
//! [`types::TrackModel`] entries.

pub mod fields;
pub mod mediainfo;
pub mod mkvinfo;
pub mod types;

pub use fields::{Dialect, Field, FieldExtractor};
pub use types::{AudioTrack, SubtitleTrack, Track, TrackModel, VideoTrack};
