//! Pure file-handling steps (no external tool).

use async_trait::async_trait;

use crate::context::StepContext;
use crate::step::Step;

/// Copy the source file to the output folder unchanged.
///
/// Used when the device plays the source natively.
pub struct CopySource;

#[async_trait]
impl Step for CopySource {
    fn name(&self) -> &'static str {
        "copy source"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let input = ctx.workspace.input().to_path_buf();
        let name = input
            .file_name()
            .ok_or_else(|| tx_core::Error::pipeline(self.name(), "source has no file name"))?;
        let out = ctx.output_dir.join(name);

        ctx.progress.send(0.0, "copying source file");
        if input != out {
            std::fs::copy(&input, &out)
                .map_err(|e| tx_core::Error::pipeline(self.name(), e.to_string()))?;
        }

        ctx.output_file = Some(out);
        Ok(())
    }
}

/// Move the extracted elementary streams into the output folder as-is.
pub struct ExportRawStreams;

#[async_trait]
impl Step for ExportRawStreams {
    fn name(&self) -> &'static str {
        "export raw streams"
    }

    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()> {
        let working: Vec<_> = ctx
            .model
            .selected_video()
            .and_then(|t| t.base.working_file.clone())
            .into_iter()
            .chain(ctx.model.selected_audio().and_then(|t| t.base.working_file.clone()))
            .chain(ctx.model.selected_subtitle().and_then(|t| t.base.working_file.clone()))
            .collect();
        if working.is_empty() {
            return Err(tx_core::Error::pipeline(self.name(), "no extracted streams to export"));
        }

        ctx.progress.send(0.0, "exporting raw streams");
        let output_dir = ctx.output_dir.clone();
        let mut exported = Vec::with_capacity(working.len());
        for file in &working {
            exported.push(ctx.workspace.export(file, &output_dir)?);
        }

        ctx.output_file = exported.into_iter().next();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tx_av::{ToolRegistry, Workspace};
    use tx_probe::{Track, TrackModel, VideoTrack};
    use tx_rules::{DeviceCatalog, DeviceKind};

    fn context(input: &PathBuf, out_dir: &PathBuf, kind: DeviceKind) -> StepContext {
        StepContext::new(
            Workspace::new(input).unwrap(),
            Arc::new(ToolRegistry::from_configs([])),
            TrackModel::new(input),
            DeviceCatalog::by_kind(kind),
            out_dir.clone(),
        )
    }

    #[tokio::test]
    async fn copy_source_places_file_in_output_folder() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let input = dir.path().join("movie.flac");
        std::fs::write(&input, b"pcm").unwrap();

        let mut ctx = context(&input, &out_dir, DeviceKind::Sonos);
        CopySource.execute(&mut ctx).await.unwrap();

        let out = ctx.output_file.unwrap();
        assert_eq!(out, out_dir.join("movie.flac"));
        assert!(out.exists());
        assert!(input.exists());
    }

    #[tokio::test]
    async fn export_moves_extracted_streams() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(&input, b"x").unwrap();

        let mut ctx = context(&input, &out_dir, DeviceKind::RawFiles);
        let stream = ctx.workspace.stream_file("video", 0, ".h264");
        std::fs::write(&stream, b"es").unwrap();
        ctx.model.video.push(VideoTrack {
            base: Track {
                id: 1,
                working_file: Some(stream.clone()),
                ..Track::default()
            },
            ..VideoTrack::default()
        });
        ctx.model.selected_video = Some(0);

        ExportRawStreams.execute(&mut ctx).await.unwrap();

        assert!(out_dir.join("video0.h264").exists());
        assert!(!stream.exists());
        assert_eq!(ctx.output_file.unwrap(), out_dir.join("video0.h264"));
    }

    #[tokio::test]
    async fn export_with_nothing_extracted_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(&input, b"x").unwrap();

        let mut ctx = context(&input, &dir.path().to_path_buf(), DeviceKind::RawFiles);
        assert!(ExportRawStreams.execute(&mut ctx).await.is_err());
    }
}
