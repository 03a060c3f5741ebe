//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools (the container/general probes, the extraction/merge pair, the
//! recode tools, the transport-stream muxer, and the audio specialist) and
//! provides lookup methods for the rest of the workspace.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default tool timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Known tools: registry name and executable name, which differ where the
/// vendor ships a mixed-case binary.
const KNOWN_TOOLS: &[(&str, &str)] = &[
    ("mkvinfo", "mkvinfo"),
    ("mkvextract", "mkvextract"),
    ("mkvmerge", "mkvmerge"),
    ("mediainfo", "mediainfo"),
    ("ffmpeg", "ffmpeg"),
    ("mencoder", "mencoder"),
    ("tsmuxer", "tsMuxeR"),
    ("eac3to", "eac3to"),
];

/// Configuration for a single external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Registry tool name (e.g. "tsmuxer").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Optional minimum version requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<semver::VersionReq>,
    /// Maximum execution time before the tool is killed.
    #[serde(
        default = "default_timeout",
        with = "duration_secs",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn is_default_timeout(d: &Duration) -> bool {
    *d == DEFAULT_TIMEOUT
}

/// Serde helpers to (de)serialize `Duration` as whole seconds.
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `--version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`tx_core::config::ToolsConfig`] supplies
    /// a custom path **and** that path exists, it is used directly.
    /// Otherwise [`which::which`] is used to locate the executable in
    /// `PATH`. Tools that are not found are silently omitted from the
    /// registry.
    pub fn discover(tools_config: &tx_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &(name, binary) in KNOWN_TOOLS {
            let custom_path = match name {
                "mkvinfo" => tools_config.mkvinfo_path.as_deref(),
                "mkvextract" => tools_config.mkvextract_path.as_deref(),
                "mkvmerge" => tools_config.mkvmerge_path.as_deref(),
                "mediainfo" => tools_config.mediainfo_path.as_deref(),
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "mencoder" => tools_config.mencoder_path.as_deref(),
                "tsmuxer" => tools_config.tsmuxer_path.as_deref(),
                "eac3to" => tools_config.eac3to_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(binary).ok()
                }
            } else {
                which::which(binary).ok()
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        min_version: None,
                        timeout: DEFAULT_TIMEOUT,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit tool configs (used by tests).
    pub fn from_configs(configs: impl IntoIterator<Item = ToolConfig>) -> Self {
        Self {
            tools: configs.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or a
    /// [`tx_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> tx_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| tx_core::Error::Tool {
            tool: name.to_string(),
            message: format!("{name} not found; is it installed and in PATH?"),
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&(name, _)| {
                if let Some(cfg) = self.tools.get(name) {
                    let version = detect_version(name, &cfg.path);
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version,
                        path: Some(cfg.path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }

    /// Iterate over all registered tool configs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolConfig)> {
        self.tools.iter()
    }
}

/// Run `<tool> --version` (or `-version` for ffmpeg/mencoder) and return the
/// first line of stdout. Tools without a version flag simply yield `None`.
fn detect_version(name: &str, path: &PathBuf) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" | "mencoder" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
