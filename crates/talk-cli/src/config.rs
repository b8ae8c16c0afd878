//! CLI configuration (`talk.json`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "talk.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkConfig {
    /// Extension of Talk sources, without the dot.
    pub source_extension: String,
    /// Walk directories below the ones given on the command line.
    pub recursive: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Directory names never walked into.
    pub exclude_dirs: Vec<String>,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            source_extension: "talk".to_string(),
            recursive: true,
            pretty: true,
            exclude_dirs: vec![".git".to_string(), "target".to_string()],
        }
    }
}

impl TalkConfig {
    /// `explicit` must exist; otherwise `./talk.json` is used if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: TalkConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}
