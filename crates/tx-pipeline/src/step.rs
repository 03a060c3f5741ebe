//! The [`Step`] trait: one stage of a conversion.

use async_trait::async_trait;

use crate::context::StepContext;

/// A single step in a conversion sequence.
///
/// Steps run strictly in order and mutate the shared [`StepContext`]:
/// setting working files on tracks they produce, deleting files they
/// consume, and recording the final artifact path when they are the
/// terminal step.
#[async_trait]
pub trait Step: Send + Sync {
    /// Short human-readable name (e.g. "extract tracks").
    fn name(&self) -> &'static str;

    /// Perform the step.
    async fn execute(&self, ctx: &mut StepContext) -> tx_core::Result<()>;
}
