//! The conversion orchestrator: analyse a source, plan the step sequence
//! for the selected device, and drive it to completion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tx_av::{ToolInfo, ToolRegistry, Workspace};
use tx_core::config::Config;
use tx_pipeline::{build_disc_plan, build_plan, Pipeline, ProgressSender, StepContext};
use tx_probe::{TrackModel, VideoTrack};
use tx_rules::{DeviceCatalog, DeviceKind, DeviceProfile, RecodeContext};

use crate::analyzer;

/// Stateful conversion driver.
///
/// Holds the configuration, the discovered tool registry, the selected
/// target device, and the most recent analysis. Analysis is device-aware
/// (recode flags depend on the device), so changing the device re-applies
/// the rules to the cached model.
pub struct Converter {
    config: Config,
    tools: Arc<ToolRegistry>,
    device: &'static DeviceProfile,
    encode_subtitles: bool,
    ringtone: bool,
    force_video_recode: bool,
    hevc_recode: bool,
    model: Option<TrackModel>,
}

impl Converter {
    /// Create a converter, discovering the external tools from the
    /// configuration and `PATH`.
    pub fn new(config: Config) -> Self {
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        Self::with_tools(config, tools)
    }

    /// Create a converter with a pre-built tool registry.
    pub fn with_tools(config: Config, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            tools,
            device: DeviceCatalog::by_kind(DeviceKind::Generic),
            encode_subtitles: false,
            ringtone: false,
            force_video_recode: false,
            hevc_recode: false,
            model: None,
        }
    }

    // ---- Selection and flags ----

    pub fn device(&self) -> &'static DeviceProfile {
        self.device
    }

    /// Select the target device. Re-applies the device rules to any cached
    /// analysis so the recode flags stay consistent.
    pub fn set_device(&mut self, kind: DeviceKind) {
        self.device = DeviceCatalog::by_kind(kind);
        if let Some(mut model) = self.model.take() {
            let source = model.source.clone();
            self.apply_rules(&mut model, &source);
            self.model = Some(model);
        }
    }

    pub fn set_encode_subtitles(&mut self, on: bool) {
        self.encode_subtitles = on;
    }

    pub fn set_ringtone(&mut self, on: bool) {
        self.ringtone = on;
    }

    /// Recode the video even when it is device-compliant. Re-applies the
    /// device rules to any cached analysis, like [`Converter::set_device`].
    pub fn set_force_video_recode(&mut self, on: bool) {
        self.force_video_recode = on;
        if let Some(mut model) = self.model.take() {
            let source = model.source.clone();
            self.apply_rules(&mut model, &source);
            self.model = Some(model);
        }
    }

    /// Prefer an HEVC encode; the plan honors this only on devices whose
    /// profile allows HEVC.
    pub fn set_hevc_recode(&mut self, on: bool) {
        self.hevc_recode = on;
    }

    /// The most recent analysis, if any.
    pub fn model(&self) -> Option<&TrackModel> {
        self.model.as_ref()
    }

    /// Override the selected audio track by index into the analyzed list.
    pub fn select_audio_track(&mut self, index: usize) -> tx_core::Result<()> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| tx_core::Error::Validation("no analysis available".into()))?;
        if index >= model.audio.len() {
            return Err(tx_core::Error::not_found("audio track", index));
        }
        model.selected_audio = Some(index);
        Ok(())
    }

    /// Override the selected subtitle track by index into the analyzed list.
    pub fn select_subtitle_track(&mut self, index: usize) -> tx_core::Result<()> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| tx_core::Error::Validation("no analysis available".into()))?;
        if index >= model.subtitles.len() {
            return Err(tx_core::Error::not_found("subtitle track", index));
        }
        model.selected_subtitle = Some(index);
        Ok(())
    }

    /// Presence/version report for every known external tool.
    pub fn check_tools(&self) -> Vec<ToolInfo> {
        self.tools.check_all()
    }

    // ---- Analysis ----

    /// Probe `source`, apply the selected device's rules, and cache the
    /// resulting model.
    pub async fn analyse_file(&mut self, source: &Path) -> tx_core::Result<&TrackModel> {
        let mut model = analyzer::analyse(
            source,
            &self.tools,
            &self.config.conversion.preferred_language,
        )
        .await?;
        self.apply_rules(&mut model, source);
        Ok(self.model.insert(model))
    }

    fn apply_rules(&self, model: &mut TrackModel, source: &Path) {
        let ctx = RecodeContext {
            device: self.device,
            source_extension: source
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
            preferred_language: self.config.conversion.preferred_language.clone(),
            encode_subtitles: self.encode_subtitles,
            force_video_recode: self.force_video_recode,
        };
        tx_rules::apply(&ctx, model);
    }

    // ---- Conversion ----

    /// Convert `source` for the selected device.
    ///
    /// Analyses the file first unless a cached analysis for the same path
    /// exists (so callers may adjust track selection between the two
    /// phases). Returns the final artifact path.
    pub async fn convert_file(
        &mut self,
        source: &Path,
        cancellation: CancellationToken,
        progress: ProgressSender,
    ) -> tx_core::Result<PathBuf> {
        if self.model.as_ref().map(|m| m.source.as_path()) != Some(source) {
            self.analyse_file(source).await?;
        }
        let model = self
            .model
            .clone()
            .ok_or_else(|| tx_core::Error::Internal("analysis missing after analyse".into()))?;

        let mut ctx = self
            .step_context(source, model)?
            .with_cancellation(cancellation)
            .with_progress(progress);

        let pipeline = Pipeline::new(build_plan(&ctx));
        tracing::info!(
            device = self.device.name,
            steps = ?pipeline.step_names(),
            "starting conversion"
        );
        pipeline.execute(&mut ctx).await
    }

    /// Convert a disc rip folder for the selected device.
    ///
    /// Disc folders carry no probeable container, so a nominal PAL video
    /// track stands in; the disc recode floors the bitrate itself.
    pub async fn convert_disc(
        &mut self,
        disc: &Path,
        cancellation: CancellationToken,
        progress: ProgressSender,
    ) -> tx_core::Result<PathBuf> {
        if !disc.exists() {
            return Err(tx_core::Error::not_found("disc folder", disc.display()));
        }

        let mut model = TrackModel::new(disc);
        model.video.push(VideoTrack {
            width: 720,
            height: 576,
            frame_rate: 25.0,
            ..VideoTrack::default()
        });
        model.select_defaults();

        let mut ctx = self
            .step_context(disc, model)?
            .with_cancellation(cancellation)
            .with_progress(progress);

        let pipeline = Pipeline::new(build_disc_plan(&ctx));
        tracing::info!(
            device = self.device.name,
            steps = ?pipeline.step_names(),
            "starting disc conversion"
        );
        pipeline.execute(&mut ctx).await
    }

    fn step_context(&self, source: &Path, model: TrackModel) -> tx_core::Result<StepContext> {
        Ok(StepContext::new(
            Workspace::new(source)?,
            Arc::clone(&self.tools),
            model,
            self.device,
            self.config.conversion.output_dir.clone(),
        )
        .with_encode_subtitles(self.encode_subtitles)
        .with_ringtone(self.ringtone)
        .with_hevc_recode(self.hevc_recode))
    }
}
