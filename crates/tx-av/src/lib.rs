//! # tx-av
//!
//! External tool plumbing for the transmux pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to the
//!   probe, extraction, recode, and mux tools.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support, plus line-streamed execution with cancellation for long
//!   encodes.
//! - **Progress parsing** ([`ProgressParser`]) -- normalize the five
//!   progress notations the external tools emit into percent-complete
//!   events.
//! - **Working-folder management** ([`Workspace`]) -- temporary directory
//!   lifecycle for extracted streams and intermediate files.

pub mod command;
pub mod progress;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{Capture, StreamedOutput, ToolCommand, ToolOutput};
pub use progress::{ProgressEvent, ProgressParser};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::{change_extension, Workspace};
