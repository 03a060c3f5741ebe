//! Audio copy/recode steps.

use std::path::Path;

use async_trait::async_trait;

use tx_av::{change_extension, Capture};
use tx_core::media::codec;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::path_arg;

// ---- Elementary audio copy ----

/// Copy the audio stream out of an elementary-stream container unchanged.
pub struct CopyAudioElementary;

pub fn copy_audio_args(out: &Path, source: &Path) -> Vec<String> {
    vec![
        "-i".into(),
        path_arg(source),
        "-vn".into(),
        "-acodec".into(),
        "copy".into(),
        "-y".into(),
        path_arg(out),
    ]
}

#[async_trait]
impl Step for CopyAudioElementary {
    fn name(&self) -> &'static str {
        "copy audio"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(at) = ctx.audio() else {
            return Err(tx_core::Error::pipeline(self.name(), "no audio track selected"));
        };
        let ext = tx_core::media::working_extension(&at.base.codec_id);
        let out = ctx.workspace.temp_file(&format!("audio{ext}"));
        let args = copy_audio_args(&out, ctx.workspace.input());

        let ok = ctx
            .run_tool("ffmpeg", args, Capture::Stderr, "copying audio track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "audio copy failed"));
        }

        if let Some(at) = ctx.audio_mut() {
            at.base.working_file = Some(out);
        }
        Ok(())
    }
}

// ---- DTS core demux ----

/// Strip a DTS-HD MA working file down to its DTS core via the mux tool's
/// demux mode.
///
/// The tool treats the output path as a folder and drops `{stem}.dts`
/// inside it; the core is moved back into the working folder and the
/// lossless original is deleted.
pub struct DemuxDtsCore;

pub fn demux_meta(working_file: &Path) -> String {
    format!(
        "MUXOPT --no-pcr-on-video-pid --new-audio-pes --vbr --vbv-len=500\nA_DTS, \"{}\", down-to-dts\n",
        working_file.display()
    )
}

#[async_trait]
impl Step for DemuxDtsCore {
    fn name(&self) -> &'static str {
        "demux dts core"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(at) = ctx.audio() else {
            return Err(tx_core::Error::pipeline(self.name(), "no audio track selected"));
        };
        let Some(working) = at.base.working_file.clone() else {
            return Err(tx_core::Error::pipeline(self.name(), "audio track not extracted"));
        };

        let meta_path = working.with_extension("meta");
        std::fs::write(&meta_path, demux_meta(&working))
            .map_err(|e| tx_core::Error::pipeline(self.name(), e.to_string()))?;

        // The tool creates this path as a directory and demuxes into it.
        let demux_dir = working.with_extension("temp");
        let args = vec![path_arg(&meta_path), path_arg(&demux_dir)];

        let ok = ctx
            .run_tool("tsmuxer", args, Capture::Stdout, "demuxing lossless audio to dts core")
            .await?;

        ctx.consume_working_file(&meta_path);
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "demux failed"));
        }

        let core_name = working
            .with_extension("dts")
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.dts".to_string());
        let core = ctx.workspace.temp_file(&core_name);
        std::fs::rename(demux_dir.join(&core_name), &core)
            .map_err(|e| tx_core::Error::pipeline(self.name(), e.to_string()))?;

        ctx.consume_working_file(&working);
        if let Err(e) = std::fs::remove_dir_all(&demux_dir) {
            tracing::debug!(dir = %demux_dir.display(), error = %e, "could not remove demux folder");
        }

        if let Some(at) = ctx.audio_mut() {
            at.base.working_file = Some(core);
            at.base.codec_id = codec::DTS.to_string();
        }
        Ok(())
    }
}

// ---- AC-3 recode ----

/// Recode the extracted audio working file to 640 kbps AC-3 at 48 kHz,
/// downmixing anything above 5.1.
pub struct RecodeAc3;

pub fn ac3_args(source: &Path, out: &Path, channels: u32) -> Vec<String> {
    let mut args = vec![
        path_arg(source),
        path_arg(out),
        "-640".into(),
        "-resampleTo48000".into(),
    ];
    if channels > 6 {
        args.push("-down6".into());
    }
    args.push("-progressnumbers".into());
    args
}

#[async_trait]
impl Step for RecodeAc3 {
    fn name(&self) -> &'static str {
        "recode audio ac3"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let Some(at) = ctx.audio() else {
            return Err(tx_core::Error::pipeline(self.name(), "no audio track selected"));
        };
        let Some(working) = at.base.working_file.clone() else {
            return Err(tx_core::Error::pipeline(self.name(), "audio track not extracted"));
        };
        let channels = at.channels;

        let out = ctx.workspace.temp_file("audio.ac3");
        let args = ac3_args(&working, &out, channels);

        let ok = ctx
            .run_tool("eac3to", args, Capture::Stdout, "recoding audio track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "audio recode failed"));
        }

        ctx.consume_working_file(&working);
        // The recode tool writes a sidecar log next to its output.
        let sidecar = ctx.workspace.temp_file("audio - Log.txt");
        ctx.consume_working_file(&sidecar);

        if let Some(at) = ctx.audio_mut() {
            at.base.working_file = Some(out);
            at.base.codec_id = codec::AC3.to_string();
            at.base.bitrate_kbps = 640;
        }
        Ok(())
    }
}

// ---- DTS-HD MA relabel ----

/// Relabel a DTS-HD MA track as plain DTS without touching the stream.
///
/// Disc images carry the lossless stream as-is but the mux metadata must
/// name the core format.
pub struct RelabelDtsMa;

#[async_trait]
impl Step for RelabelDtsMa {
    fn name(&self) -> &'static str {
        "relabel dts-hd"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        if let Some(at) = ctx.audio_mut() {
            if at.base.codec_id == codec::DTS_MA {
                at.base.codec_id = codec::DTS.to_string();
            }
        }
        Ok(())
    }
}

// ---- Multi-room audio resample ----

/// Resample a 96 kHz FLAC source to 48 kHz / 16-bit for multi-room
/// players.
pub struct SonosResample;

pub fn resample_args(source: &Path, out: &Path) -> Vec<String> {
    vec![
        path_arg(source),
        path_arg(out),
        "-resampleTo48000".into(),
        "-down16".into(),
        "-normalize".into(),
        "-progressnumbers".into(),
    ]
}

#[async_trait]
impl Step for SonosResample {
    fn name(&self) -> &'static str {
        "resample audio"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let out = ctx.output_path(".flac");
        let args = resample_args(ctx.workspace.input(), &out);

        let ok = ctx
            .run_tool("eac3to", args, Capture::Stdout, "resampling audio")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "resample failed"));
        }

        if let Some(at) = ctx.audio_mut() {
            at.base.codec_id = codec::FLAC.to_string();
        }
        ctx.output_file = Some(out);
        Ok(())
    }
}

// ---- Audio-only extraction to AAC ----

/// Produce a stereo AAC `.m4a` from the source, truncated to 30 seconds
/// and renamed `.m4r` for ringtone targets.
pub struct AudioOnlyRecode;

pub fn audio_only_args(source: &Path, out: &Path, ringtone: bool) -> Vec<String> {
    let mut args = vec!["-i".into(), path_arg(source)];
    if ringtone {
        args.push("-t".into());
        args.push("30".into());
    }
    args.extend([
        "-f".into(),
        "mp4".into(),
        "-acodec".into(),
        "aac".into(),
        "-ac".into(),
        "2".into(),
        "-b:a".into(),
        "320k".into(),
        "-y".into(),
        path_arg(out),
    ]);
    args
}

#[async_trait]
impl Step for AudioOnlyRecode {
    fn name(&self) -> &'static str {
        "recode audio only"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let out = ctx.output_path(".m4a");
        let args = audio_only_args(ctx.workspace.input(), &out, ctx.ringtone);

        let ok = ctx
            .run_tool("ffmpeg", args, Capture::Stderr, "recoding audio track")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "audio recode failed"));
        }

        ctx.output_file = Some(if ctx.ringtone {
            change_extension(&out, "m4r")?
        } else {
            out
        });
        Ok(())
    }
}
