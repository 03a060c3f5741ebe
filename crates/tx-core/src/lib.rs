//! Core types shared across the transmux workspace.
//!
//! This crate holds the unified error type, the application configuration,
//! and the media-domain vocabulary (codec identifiers, track kinds, language
//! catalog) that every other crate builds on.

pub mod config;
pub mod error;
pub mod media;

pub use config::Config;
pub use error::{Error, Result};
