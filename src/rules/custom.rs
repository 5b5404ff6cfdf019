//! User-supplied sensitive patterns
//!
//! Loaded from a TOML file of `[[pattern]]` entries and registered with the
//! detector on top of the built-in catalog.

use crate::error::{GuardrailError, Result};
use crate::rules::secrets::{Confidence, MaskStyle};
use serde::Deserialize;
use std::path::Path;

/// A custom pattern entry
#[derive(Debug, Clone, Deserialize)]
pub struct CustomPatternEntry {
    /// Type tag reported for matches
    #[serde(rename = "type")]
    pub secret_type: String,

    /// Regex pattern to match
    pub regex: String,

    #[serde(default)]
    pub confidence: Confidence,

    #[serde(default)]
    pub mask_style: MaskStyle,
}

/// The custom pattern file structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomPatternFile {
    #[serde(default)]
    pub pattern: Vec<CustomPatternEntry>,
}

impl CustomPatternFile {
    /// Load and parse a pattern file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GuardrailError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| GuardrailError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }
}
