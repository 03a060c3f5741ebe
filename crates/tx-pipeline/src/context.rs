//! Execution context owned by one conversion job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tx_av::{Capture, ProgressParser, ToolCommand, ToolRegistry, Workspace};
use tx_probe::{AudioTrack, SubtitleTrack, TrackModel, VideoTrack};
use tx_rules::DeviceProfile;

/// Sender for reporting progress from within steps.
///
/// Wraps a callback that receives a percentage (0.0 -- 100.0) and a
/// human-readable step description.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
}

impl ProgressSender {
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    pub fn send(&self, percent: f32, message: &str) {
        (self.callback)(percent, message);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Per-job state passed mutably through the step sequence.
///
/// The context owns the working folder and the track model outright; each
/// step spawns its own subprocess through [`StepContext::run_tool`], so no
/// process handle outlives the step that created it.
pub struct StepContext {
    pub workspace: Workspace,
    pub tools: Arc<ToolRegistry>,
    pub model: TrackModel,
    pub device: &'static DeviceProfile,
    /// Folder receiving the final artifact.
    pub output_dir: PathBuf,
    /// Source filename without extension, used to name outputs.
    pub base_name: String,
    /// Lowercased source extension without the dot.
    pub source_extension: String,
    pub encode_subtitles: bool,
    pub ringtone: bool,
    /// Prefer an HEVC encode; honored only on devices whose profile allows it.
    pub hevc_recode: bool,
    /// Token checked between steps and inside blocking output reads.
    pub cancellation: CancellationToken,
    pub progress: Arc<ProgressSender>,
    /// Accumulated tool output across all steps, in invocation order.
    pub log: String,
    /// Final artifact, set by the terminal step of the sequence.
    pub output_file: Option<PathBuf>,
}

impl StepContext {
    pub fn new(
        workspace: Workspace,
        tools: Arc<ToolRegistry>,
        model: TrackModel,
        device: &'static DeviceProfile,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let input = workspace.input();
        let base_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let source_extension = input
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            workspace,
            tools,
            model,
            device,
            output_dir: output_dir.into(),
            base_name,
            source_extension,
            encode_subtitles: false,
            ringtone: false,
            hevc_recode: false,
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
            log: String::new(),
            output_file: None,
        }
    }

    /// Builder: request subtitle burn-in.
    pub fn with_encode_subtitles(mut self, on: bool) -> Self {
        self.encode_subtitles = on;
        self
    }

    /// Builder: produce a ringtone-length output.
    pub fn with_ringtone(mut self, on: bool) -> Self {
        self.ringtone = on;
        self
    }

    /// Builder: prefer an HEVC encode where the device allows it.
    pub fn with_hevc_recode(mut self, on: bool) -> Self {
        self.hevc_recode = on;
        self
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    // ---- Track accessors ----

    pub fn video(&self) -> Option<&VideoTrack> {
        self.model.selected_video()
    }

    pub fn video_mut(&mut self) -> Option<&mut VideoTrack> {
        self.model.selected_video_mut()
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.model.selected_audio()
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioTrack> {
        self.model.selected_audio_mut()
    }

    pub fn subtitle(&self) -> Option<&SubtitleTrack> {
        self.model.selected_subtitle()
    }

    pub fn subtitle_mut(&mut self) -> Option<&mut SubtitleTrack> {
        self.model.selected_subtitle_mut()
    }

    /// Path in the output folder carrying the job's base name plus
    /// `extension` (with dot).
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.base_name, extension))
    }

    // ---- Tool plumbing ----

    /// Run one external tool, streaming its chosen output through the
    /// progress parser and appending the transcript to the job log.
    ///
    /// A non-zero exit is returned as `Ok(false)`; the step decides whether
    /// that fails the job. Cancellation and spawn failures propagate as
    /// errors.
    pub async fn run_tool(
        &mut self,
        tool: &str,
        args: Vec<String>,
        capture: Capture,
        message: &str,
    ) -> tx_core::Result<bool> {
        let config = self.tools.require(tool)?;
        let mut cmd = ToolCommand::new(&config.path);
        cmd.args(args).timeout(config.timeout);

        self.progress.send(0.0, message);

        let mut parser = ProgressParser::new();
        let progress = Arc::clone(&self.progress);
        let output = cmd
            .execute_streaming(
                capture,
                |line| {
                    if let Some(event) = parser.consume_line(line) {
                        progress.send(event.percent, message);
                    }
                },
                &self.cancellation,
            )
            .await?;

        self.log.push_str(parser.log());

        if !output.success() {
            tracing::warn!(tool, status = %output.status, "tool reported failure");
        }
        Ok(output.success())
    }

    /// Delete a consumed working file. Missing files are ignored.
    pub fn consume_working_file(&mut self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "could not remove working file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tx_rules::{DeviceCatalog, DeviceKind};

    fn context(input: &Path) -> StepContext {
        StepContext::new(
            Workspace::new(input).unwrap(),
            Arc::new(ToolRegistry::from_configs([])),
            TrackModel::new(input),
            DeviceCatalog::by_kind(DeviceKind::Generic),
            "/tmp/out",
        )
    }

    #[test]
    fn derives_base_name_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Movie.Title.MKV");
        std::fs::write(&input, b"x").unwrap();

        let ctx = context(&input);
        assert_eq!(ctx.base_name, "Movie.Title");
        assert_eq!(ctx.source_extension, "mkv");
    }

    #[test]
    fn output_path_uses_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(&input, b"x").unwrap();

        let ctx = context(&input);
        assert_eq!(
            ctx.output_path(".mpg"),
            PathBuf::from("/tmp/out").join("movie.mpg")
        );
    }

    #[tokio::test]
    async fn run_tool_fails_for_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(&input, b"x").unwrap();

        let mut ctx = context(&input);
        let result = ctx
            .run_tool("mkvextract", vec!["tracks".into()], Capture::Stdout, "x")
            .await;
        assert!(result.is_err());
    }
}
