//! Track extraction from the multi-track container.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use tx_av::Capture;
use tx_core::media::working_extension;

use crate::context::StepContext;
use crate::step::Step;
use crate::steps::path_arg;

/// Extract the selected tracks into the working folder via the extraction
/// tool (`tracks "<file>" <id>:<outpath> ...`).
///
/// Track ids on the command line are the demuxer's 0-based ids, one below
/// the probe report's 1-based numbering. When a video recode follows, the
/// video track is left in the container (`include_video = false`) and only
/// audio/subtitles are pulled out.
pub struct ExtractTracks {
    pub include_video: bool,
}

struct Target {
    kind: &'static str,
    id: u32,
    path: PathBuf,
}

fn targets(ctx: &StepContext, include_video: bool) -> Vec<Target> {
    let mut out = Vec::new();

    if include_video {
        if let Some(vt) = ctx.video() {
            let id = vt.base.id.saturating_sub(1);
            out.push(Target {
                kind: "video",
                id,
                path: ctx
                    .workspace
                    .stream_file("video", id, working_extension(&vt.base.codec_id)),
            });
        }
    }
    if let Some(at) = ctx.audio() {
        let id = at.base.id.saturating_sub(1);
        out.push(Target {
            kind: "audio",
            id,
            path: ctx
                .workspace
                .stream_file("audio", id, working_extension(&at.base.codec_id)),
        });
    }
    if let Some(st) = ctx.subtitle() {
        let id = st.base.id.saturating_sub(1);
        out.push(Target {
            kind: "subtitle",
            id,
            path: ctx
                .workspace
                .stream_file("subtitle", id, working_extension(&st.base.codec_id)),
        });
    }

    out
}

pub fn build_args(source: &Path, targets: &[(u32, &Path)]) -> Vec<String> {
    let mut args = vec!["tracks".to_string(), path_arg(source)];
    for (id, path) in targets {
        args.push(format!("{}:{}", id, path.display()));
    }
    args
}

#[async_trait]
impl Step for ExtractTracks {
    fn name(&self) -> &'static str {
        "extract tracks"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let targets = targets(ctx, self.include_video);
        if targets.is_empty() {
            return Err(tx_core::Error::pipeline(self.name(), "no tracks selected"));
        }

        let pairs: Vec<(u32, &Path)> = targets.iter().map(|t| (t.id, t.path.as_path())).collect();
        let args = build_args(ctx.workspace.input(), &pairs);

        let ok = ctx
            .run_tool("mkvextract", args, Capture::Stdout, "extracting tracks")
            .await?;
        if !ok {
            return Err(tx_core::Error::pipeline(self.name(), "extraction tool failed"));
        }

        for target in targets {
            match target.kind {
                "video" => {
                    if let Some(vt) = ctx.video_mut() {
                        vt.base.working_file = Some(target.path);
                    }
                }
                "audio" => {
                    if let Some(at) = ctx.audio_mut() {
                        at.base.working_file = Some(target.path);
                    }
                }
                _ => {
                    if let Some(st) = ctx.subtitle_mut() {
                        st.base.working_file = Some(target.path);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_use_zero_based_ids() {
        let source = Path::new("/media/movie.mkv");
        let video = Path::new("/work/video0.h264");
        let audio = Path::new("/work/audio1.dts");
        let args = build_args(source, &[(0, video), (1, audio)]);
        assert_eq!(
            args,
            vec![
                "tracks",
                "/media/movie.mkv",
                "0:/work/video0.h264",
                "1:/work/audio1.dts",
            ]
        );
    }
}
