//! # tx-pipeline
//!
//! Conversion step sequences for target devices.
//!
//! - **[`Step`]** trait -- one external-tool invocation (or pure
//!   bookkeeping pass) in a conversion.
//! - **[`StepContext`]** -- owned per-job state threaded through the steps:
//!   working folder, track model, device profile, flags, cancellation,
//!   progress, and the accumulated log.
//! - **[`plan`]** -- builds the step sequence for a (device, container)
//!   pair from the analyzed track model.
//! - **[`Pipeline`]** -- runs the steps sequentially, checking cancellation
//!   between steps and aborting on the first failure.

pub mod context;
pub mod executor;
pub mod plan;
pub mod step;
pub mod steps;

pub use context::{ProgressSender, StepContext};
pub use executor::Pipeline;
pub use plan::{build_disc_plan, build_plan};
pub use step::Step;
