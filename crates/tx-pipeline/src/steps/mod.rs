//! Built-in conversion steps.
//!
//! Each step wraps one external-tool invocation (or a pure bookkeeping
//! pass) and exposes its argument construction as a plain function so the
//! command lines can be unit-tested without the tools installed.

pub mod audio;
pub mod copy;
pub mod extract;
pub mod html5;
pub mod mux;
pub mod video;

pub use audio::{AudioOnlyRecode, CopyAudioElementary, DemuxDtsCore, RecodeAc3, RelabelDtsMa, SonosResample};
pub use copy::{CopySource, ExportRawStreams};
pub use extract::ExtractTracks;
pub use html5::Html5Suite;
pub use mux::{DiscFormat, MuxTransportStream, RemergeMkv};
pub use video::{
    ContainerRecodeMp4, CopyVideoElementary, DeviceTwoPassRecode, DvdRecodeMp4, LegacyAudio,
    LegacyTwoPassRecode, MovRecodeMp4, PhoneRecodeMp4, RecodeVideoH264, XboxRemuxMp4,
};

use std::path::Path;

/// Render a path as a single argument (no shell, so no quoting needed).
pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}
