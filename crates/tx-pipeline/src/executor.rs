//! Sequential step execution with cancellation between steps.

use std::path::PathBuf;

use crate::context::StepContext;
use crate::step::Step;

/// Runs a step sequence to completion, aborting on the first failure.
///
/// Steps never run in parallel: they share one working folder and feed each
/// other's working files. The accumulated log in the context is retained on
/// failure for diagnostics.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Execute all steps in order, returning the final artifact path.
    ///
    /// # Errors
    ///
    /// - [`tx_core::Error::Cancelled`] when the token fires between steps
    ///   or during a blocking output read.
    /// - [`tx_core::Error::Pipeline`] naming the failed step otherwise.
    pub async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<PathBuf> {
        if self.steps.is_empty() {
            return Err(tx_core::Error::pipeline(
                "executor",
                format!(
                    "no conversion defined for {} from .{}",
                    ctx.device.name, ctx.source_extension
                ),
            ));
        }

        for step in &self.steps {
            if ctx.cancellation.is_cancelled() {
                tracing::info!("conversion cancelled");
                return Err(tx_core::Error::Cancelled);
            }

            tracing::info!(step = step.name(), "starting");
            step.execute(ctx).await.map_err(|e| match e {
                tx_core::Error::Cancelled => tx_core::Error::Cancelled,
                other => tx_core::Error::pipeline(step.name(), other.to_string()),
            })?;
        }

        ctx.progress.send(100.0, "conversion complete");

        ctx.output_file
            .clone()
            .ok_or_else(|| tx_core::Error::pipeline("executor", "no output artifact produced"))
    }
}
