//! Remux steps: transport-stream / disc-image muxing and container
//! remerge.

use std::path::Path;

use async_trait::async_trait;

use tx_av::{change_extension, Capture};
use tx_probe::TrackModel;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::path_arg;

/// Output flavor of the transport-stream mux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscFormat {
    /// Single `.m2ts` stream, renamed to `.mpg` for console playback.
    Transport,
    /// AVCHD folder structure.
    Avchd,
    /// Blu-ray folder structure.
    BluRay,
}

/// Mux the extracted video and audio working files into a transport
/// stream or disc image.
pub struct MuxTransportStream {
    pub format: DiscFormat,
}

pub fn mux_meta(format: DiscFormat, video_codec: &str, video: &Path, audio_codec: &str, audio: &Path) -> String {
    let mut meta = String::from("MUXOPT --no-pcr-on-video-pid --new-audio-pes --vbr --vbv-len=500");
    match format {
        DiscFormat::Transport => {}
        DiscFormat::Avchd => meta.push_str(" --avchd"),
        DiscFormat::BluRay => meta.push_str(" --blu-ray"),
    }
    meta.push('\n');
    meta.push_str(&format!(
        "{video_codec}, \"{}\", level=4.1, insertSEI, contSPS\n",
        video.display()
    ));
    meta.push_str(&format!("{audio_codec}, \"{}\", lang=eng\n", audio.display()));
    meta
}

#[async_trait]
impl Step for MuxTransportStream {
    fn name(&self) -> &'static str {
        "mux transport stream"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let (video_codec, video_file) = match ctx.video() {
            Some(vt) => match &vt.base.working_file {
                Some(f) => (vt.base.codec_id.clone(), f.clone()),
                None => {
                    return Err(tx_core::Error::pipeline(self.name(), "video track not extracted"))
                }
            },
            None => return Err(tx_core::Error::pipeline(self.name(), "no video track selected")),
        };
        let (audio_codec, audio_file) = match ctx.audio() {
            Some(at) => match &at.base.working_file {
                Some(f) => (at.base.codec_id.clone(), f.clone()),
                None => {
                    return Err(tx_core::Error::pipeline(self.name(), "audio track not extracted"))
                }
            },
            None => return Err(tx_core::Error::pipeline(self.name(), "no audio track selected")),
        };

        let meta_path = ctx.workspace.temp_file("mux.meta");
        let meta = mux_meta(self.format, &video_codec, &video_file, &audio_codec, &audio_file);
        std::fs::write(&meta_path, meta)
            .map_err(|e| tx_core::Error::pipeline(self.name(), e.to_string()))?;

        // Disc formats write a folder structure; the stream flavor writes a
        // single .m2ts next to the final name.
        let out = match self.format {
            DiscFormat::Transport => ctx.output_path(".m2ts"),
            DiscFormat::Avchd | DiscFormat::BluRay => ctx.output_dir.join(&ctx.base_name),
        };
        let args = vec![path_arg(&meta_path), path_arg(&out)];

        let ok = ctx
            .run_tool("tsmuxer", args, Capture::Stdout, "muxing transport stream")
            .await?;

        ctx.consume_working_file(&meta_path);
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "mux failed"));
        }

        ctx.consume_working_file(&video_file);
        ctx.consume_working_file(&audio_file);
        // A subtitle may have been extracted alongside (and burned in by an
        // earlier step); it never reaches the mux, so retire it here.
        if let Some(subtitle_file) = ctx.subtitle().and_then(|st| st.base.working_file.clone()) {
            ctx.consume_working_file(&subtitle_file);
        }

        ctx.output_file = Some(match self.format {
            DiscFormat::Transport => change_extension(&out, "mpg")?,
            DiscFormat::Avchd | DiscFormat::BluRay => out,
        });
        Ok(())
    }
}

// ---- Container remerge ----

/// Remerge extracted streams back into a fresh container, restoring
/// titles, languages, the frame-rate pin, and the audio delay.
pub struct RemergeMkv;

pub fn remerge_args(out: &Path, model: &TrackModel) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(title) = &model.title {
        args.push("--title".into());
        args.push(title.clone());
    }
    args.push("-o".into());
    args.push(path_arg(out));

    if let Some(vt) = model.selected_video() {
        if let Some(t) = &vt.base.title {
            args.push("--track-name".into());
            args.push(format!("0:{t}"));
        }
        if !vt.base.language.is_empty() {
            args.push("--language".into());
            args.push(format!("0:{}", vt.base.language));
        }
        args.push("--default-duration".into());
        args.push(format!("0:{}fps", vt.frame_rate));
        args.push("--compression".into());
        args.push("-1:none".into());
        if let Some(f) = &vt.base.working_file {
            args.push(path_arg(f));
        }
    }
    if let Some(at) = model.selected_audio() {
        if let Some(t) = &at.base.title {
            args.push("--track-name".into());
            args.push(format!("0:{t}"));
        }
        if !at.base.language.is_empty() {
            args.push("--language".into());
            args.push(format!("0:{}", at.base.language));
        }
        if at.delay_ms > 0 {
            args.push("-y".into());
            args.push(format!("0:{}", at.delay_ms));
        }
        args.push("--compression".into());
        args.push("-1:none".into());
        if let Some(f) = &at.base.working_file {
            args.push(path_arg(f));
        }
    }
    if let Some(st) = model.selected_subtitle() {
        if st.base.preferred {
            if !st.base.language.is_empty() {
                args.push("--language".into());
                args.push(format!("0:{}", st.base.language));
            }
            if let Some(f) = &st.base.working_file {
                args.push(path_arg(f));
            }
        }
    }
    args
}

#[async_trait]
impl Step for RemergeMkv {
    fn name(&self) -> &'static str {
        "remerge container"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let out = ctx.output_path(".mkv");
        let args = remerge_args(&out, &ctx.model);

        let ok = ctx
            .run_tool("mkvmerge", args, Capture::Stdout, "remerging container")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "remerge failed"));
        }

        let consumed: Vec<_> = ctx
            .model
            .selected_video()
            .and_then(|t| t.base.working_file.clone())
            .into_iter()
            .chain(ctx.model.selected_audio().and_then(|t| t.base.working_file.clone()))
            .chain(ctx.model.selected_subtitle().and_then(|t| t.base.working_file.clone()))
            .collect();
        for file in consumed {
            ctx.consume_working_file(&file);
        }

        ctx.output_file = Some(out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tx_av::{ToolConfig, ToolRegistry, Workspace};
    use tx_core::media::codec;
    use tx_probe::{AudioTrack, SubtitleTrack, Track, VideoTrack};
    use tx_rules::{DeviceCatalog, DeviceKind};

    #[test]
    fn transport_meta_has_no_disc_flag() {
        let meta = mux_meta(
            DiscFormat::Transport,
            codec::H264,
            Path::new("/work/video0.h264"),
            codec::AC3,
            Path::new("/work/audio.ac3"),
        );
        let first = meta.lines().next().unwrap();
        assert_eq!(
            first,
            "MUXOPT --no-pcr-on-video-pid --new-audio-pes --vbr --vbv-len=500"
        );
        assert!(meta.contains("V_MPEG4/ISO/AVC, \"/work/video0.h264\", level=4.1, insertSEI, contSPS"));
        assert!(meta.contains("A_AC3, \"/work/audio.ac3\", lang=eng"));
    }

    #[test]
    fn disc_meta_carries_the_format_flag() {
        let v = Path::new("/w/v.h264");
        let a = Path::new("/w/a.dts");
        let avchd = mux_meta(DiscFormat::Avchd, codec::H264, v, codec::DTS, a);
        assert!(avchd.lines().next().unwrap().ends_with("--avchd"));
        let bluray = mux_meta(DiscFormat::BluRay, codec::H264, v, codec::DTS, a);
        assert!(bluray.lines().next().unwrap().ends_with("--blu-ray"));
    }

    #[tokio::test]
    async fn transport_mux_retires_every_working_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(&input, b"x").unwrap();

        let ws = Workspace::new(&input).unwrap();
        let video_file = ws.stream_file("video", 0, ".h264");
        let audio_file = ws.stream_file("audio", 1, ".ac3");
        let subtitle_file = ws.stream_file("subtitle", 2, ".srt");
        for f in [&video_file, &audio_file, &subtitle_file] {
            std::fs::write(f, b"stream").unwrap();
        }

        let mut model = TrackModel::new(&input);
        model.video.push(VideoTrack {
            base: Track {
                id: 1,
                codec_id: codec::H264.to_string(),
                working_file: Some(video_file.clone()),
                ..Track::default()
            },
            ..VideoTrack::default()
        });
        model.audio.push(AudioTrack {
            base: Track {
                id: 2,
                codec_id: codec::AC3.to_string(),
                working_file: Some(audio_file.clone()),
                ..Track::default()
            },
            ..AudioTrack::default()
        });
        model.subtitles.push(SubtitleTrack {
            base: Track {
                id: 3,
                codec_id: codec::SRT.to_string(),
                working_file: Some(subtitle_file.clone()),
                ..Track::default()
            },
        });
        model.selected_video = Some(0);
        model.selected_audio = Some(0);
        model.selected_subtitle = Some(0);

        let registry = ToolRegistry::from_configs([ToolConfig {
            name: "tsmuxer".to_string(),
            path: PathBuf::from("true"),
            min_version: None,
            timeout: Duration::from_secs(5),
        }]);

        let out_dir = dir.keep();
        // The stand-in muxer produces nothing, so stage its output by hand.
        std::fs::write(out_dir.join("movie.m2ts"), b"ts").unwrap();

        let mut ctx = StepContext::new(
            ws,
            Arc::new(registry),
            model,
            DeviceCatalog::by_kind(DeviceKind::Ps3),
            out_dir.clone(),
        );

        MuxTransportStream {
            format: DiscFormat::Transport,
        }
        .execute(&mut ctx)
        .await
        .unwrap();

        assert!(!video_file.exists());
        assert!(!audio_file.exists());
        assert!(!subtitle_file.exists());
        assert_eq!(ctx.output_file, Some(out_dir.join("movie.mpg")));
    }

    #[test]
    fn remerge_args_pin_frame_rate_and_delay() {
        let mut model = TrackModel::new(Path::new("/m/movie.mkv"));
        model.video.push(VideoTrack {
            base: Track {
                id: 1,
                codec_id: codec::H264.to_string(),
                language: "eng".to_string(),
                working_file: Some(PathBuf::from("/w/video0.h264")),
                ..Track::default()
            },
            frame_rate: 23.976,
            ..VideoTrack::default()
        });
        model.audio.push(AudioTrack {
            base: Track {
                id: 2,
                codec_id: codec::DTS.to_string(),
                language: "eng".to_string(),
                working_file: Some(PathBuf::from("/w/audio1.dts")),
                ..Track::default()
            },
            delay_ms: 8,
            ..AudioTrack::default()
        });
        model.selected_video = Some(0);
        model.selected_audio = Some(0);

        let args = remerge_args(Path::new("/o/movie.mkv"), &model);
        assert!(args.contains(&"0:23.976fps".to_string()));
        let pos = args.iter().position(|a| a == "-y").unwrap();
        assert_eq!(args[pos + 1], "0:8");
        assert_eq!(args.iter().filter(|a| *a == "-1:none").count(), 2);
    }
}
