//! Source analysis: run the probe tools and assemble the track model.
//!
//! Multi-track containers get the two-pass treatment: the container probe
//! discovers the tracks, then the general probe enriches them with bitrate,
//! reference frames, channel layouts, and delays. Everything else is built
//! from the general report alone.

use std::path::Path;

use tx_av::{ToolCommand, ToolRegistry};
use tx_core::media::codec;
use tx_probe::{mediainfo, mkvinfo, TrackModel};

/// Codecs worth preferring when picking the audio track by language.
const PREFERRED_AUDIO_CODECS: &[&str] = &[codec::DTS, codec::DTS_MA, codec::TRUEHD, codec::AC3];

/// Probe `source` and build its track model.
///
/// # Errors
///
/// Returns [`tx_core::Error::NotFound`] when the source does not exist,
/// [`tx_core::Error::Tool`] when a probe tool is missing or fails, and
/// [`tx_core::Error::Probe`] when the container report yields no tracks.
pub async fn analyse(
    source: &Path,
    tools: &ToolRegistry,
    preferred_language: &str,
) -> tx_core::Result<TrackModel> {
    if !source.exists() {
        return Err(tx_core::Error::not_found("source file", source.display()));
    }

    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut model = TrackModel::new(source);

    if extension == "mkv" {
        let container_report = run_probe(tools, "mkvinfo", source).await?;
        mkvinfo::parse(&container_report, &mut model);
        if model.video.is_empty() && model.audio.is_empty() {
            return Err(tx_core::Error::Probe(format!(
                "no tracks found in {}",
                source.display()
            )));
        }

        let general_report = run_probe(tools, "mediainfo", source).await?;
        mediainfo::merge_mkv(&general_report, &mut model);

        select_preferred_audio(&mut model, preferred_language);
    } else {
        let report = run_probe(tools, "mediainfo", source).await?;
        mediainfo::parse_standalone(&report, &mut model);
    }

    model.select_defaults();
    tracing::info!(
        source = %source.display(),
        video = model.video.len(),
        audio = model.audio.len(),
        subtitles = model.subtitles.len(),
        "analysis complete"
    );
    Ok(model)
}

async fn run_probe(tools: &ToolRegistry, tool: &str, source: &Path) -> tx_core::Result<String> {
    let config = tools.require(tool)?;
    let mut cmd = ToolCommand::new(&config.path);
    cmd.arg(source.display().to_string()).timeout(config.timeout);
    Ok(cmd.execute().await?.stdout)
}

/// Pick the first audio track whose language matches the preferred one and
/// whose codec is a high-quality candidate. Keeps the existing selection
/// when nothing matches.
fn select_preferred_audio(model: &mut TrackModel, preferred_language: &str) {
    let pick = model.audio.iter().position(|a| {
        a.base.language.contains(preferred_language)
            && PREFERRED_AUDIO_CODECS.contains(&a.base.codec_id.as_str())
    });
    if pick.is_some() {
        model.selected_audio = pick;
    }
}
