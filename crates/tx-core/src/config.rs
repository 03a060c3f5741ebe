//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool-path and conversion sections. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::PREFERRED_LANGUAGES;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !PREFERRED_LANGUAGES.contains(&self.conversion.preferred_language.as_str()) {
            warnings.push(format!(
                "conversion.preferred_language '{}' is not a recognized language code",
                self.conversion.preferred_language
            ));
        }

        if let Some(ref dir) = self.conversion.working_dir {
            if dir.as_os_str().is_empty() {
                warnings.push("conversion.working_dir is empty".into());
            }
        }

        for (name, path) in self.tools.overrides() {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name}_path '{}' does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools. Any unset path is resolved via `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mkvinfo_path: Option<PathBuf>,
    pub mkvextract_path: Option<PathBuf>,
    pub mkvmerge_path: Option<PathBuf>,
    pub mediainfo_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub mencoder_path: Option<PathBuf>,
    pub tsmuxer_path: Option<PathBuf>,
    pub eac3to_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Iterate over (tool name, configured override path) pairs.
    pub fn overrides(&self) -> impl Iterator<Item = (&'static str, Option<&Path>)> {
        [
            ("mkvinfo", self.mkvinfo_path.as_deref()),
            ("mkvextract", self.mkvextract_path.as_deref()),
            ("mkvmerge", self.mkvmerge_path.as_deref()),
            ("mediainfo", self.mediainfo_path.as_deref()),
            ("ffmpeg", self.ffmpeg_path.as_deref()),
            ("mencoder", self.mencoder_path.as_deref()),
            ("tsmuxer", self.tsmuxer_path.as_deref()),
            ("eac3to", self.eac3to_path.as_deref()),
        ]
        .into_iter()
    }
}

/// Conversion defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// ISO-639 code used to flag preferred audio/subtitle tracks.
    #[serde(default = "default_language")]
    pub preferred_language: String,
    /// Where finished artifacts are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Working folder for intermediate files. `None` uses a fresh temp dir
    /// per job.
    pub working_dir: Option<PathBuf>,
}

fn default_language() -> String {
    "eng".into()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            preferred_language: default_language(),
            output_dir: default_output_dir(),
            working_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.conversion.preferred_language, "eng");
        assert_eq!(cfg.conversion.output_dir, PathBuf::from("."));
        assert!(cfg.conversion.working_dir.is_none());
        assert!(cfg.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn unknown_language_warns() {
        let mut cfg = Config::default();
        cfg.conversion.preferred_language = "xx".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("preferred_language")));
    }

    #[test]
    fn missing_tool_override_warns() {
        let mut cfg = Config::default();
        cfg.tools.eac3to_path = Some(PathBuf::from("/nonexistent/eac3to"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("eac3to")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"conversion": {"preferred_language": "ger"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.conversion.preferred_language, "ger");
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.conversion.preferred_language, "eng");
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.conversion.preferred_language, "eng");
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.conversion.preferred_language, "eng");
    }
}
