//! # transmux
//!
//! Media analysis and device-aware conversion orchestration.
//!
//! The library surface is thin: [`analyzer`] turns a source file into a
//! [`tx_probe::TrackModel`] via the external probe tools, and
//! [`Converter`] plans and runs the conversion step sequence for a target
//! device. Everything else lives in the workspace crates:
//!
//! - `tx-core`: configuration, errors, codec identifiers
//! - `tx-probe`: probe-report parsing and the track model
//! - `tx-rules`: device catalog and recode decision rules
//! - `tx-av`: external tool discovery, execution, progress parsing
//! - `tx-pipeline`: conversion steps and plan construction

pub mod analyzer;
pub mod orchestrator;

pub use orchestrator::Converter;
