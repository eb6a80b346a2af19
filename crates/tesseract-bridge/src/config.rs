//! Bridge configuration.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid configuration. Values here only fill
//! in what a request leaves out; request arguments always take precedence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::PageSegMode;

/// File name searched for by [`BridgeConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "tesseract-bridge.toml";

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Language used when a request has no `language` argument
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Data directory used when a request has no `tessData` argument
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,

    /// Segmentation mode code used when a request's `args` has no `psm`
    #[serde(default = "default_page_seg_mode")]
    pub default_page_seg_mode: i32,

    /// Strip C0 control characters (except newline, carriage return, tab) from results
    #[serde(default = "default_true")]
    pub strip_control_characters: bool,

    /// Check `<lang>.traineddata` exists before initializing the native engine
    #[serde(default = "default_true")]
    pub validate_traineddata: bool,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_page_seg_mode() -> i32 {
    PageSegMode::DEFAULT.as_i32()
}

fn default_true() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            tessdata_dir: None,
            default_page_seg_mode: default_page_seg_mode(),
            strip_control_characters: true,
            validate_traineddata: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if the file can't be read, isn't valid TOML, or fails validation.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            BridgeError::config_with_source(format!("Invalid TOML in {}", path.as_ref().display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BridgeError::config_with_source(format!("Invalid JSON in {}", path.as_ref().display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `tesseract-bridge.toml` in the current directory and its parents.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir()?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        PageSegMode::from_i32(self.default_page_seg_mode)
            .map_err(|e| BridgeError::config_with_source("Invalid default_page_seg_mode", e))?;
        if self.default_language.trim().is_empty() {
            return Err(BridgeError::config("default_language cannot be empty"));
        }
        Ok(())
    }

    /// The configured default segmentation mode. Falls back to [`PageSegMode::DEFAULT`] for an out-of-range code.
    pub fn page_seg_mode(&self) -> PageSegMode {
        PageSegMode::from_i32(self.default_page_seg_mode).unwrap_or(PageSegMode::DEFAULT)
    }

    /// Resolve the data directory for a request.
    ///
    /// Order: the request's own value, `tessdata_dir`, `TESSDATA_PREFIX`, then well-known install locations.
    pub fn resolve_tessdata(&self, requested: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = requested {
            return Some(path.to_path_buf());
        }
        if let Some(path) = &self.tessdata_dir {
            return Some(path.clone());
        }
        if let Some(prefix) = std::env::var_os("TESSDATA_PREFIX").filter(|p| !p.is_empty()) {
            // TESSDATA_PREFIX may name the tessdata directory itself or its parent
            let prefix = PathBuf::from(prefix);
            return Some(if prefix.ends_with("tessdata") {
                prefix
            } else {
                prefix.join("tessdata")
            });
        }
        FALLBACK_TESSDATA_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| BridgeError::config_with_source(format!("Failed to read config file {}", path.display()), e))
}
