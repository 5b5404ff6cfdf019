//! Configuration loading for tool-guardrails
//!
//! Supports TOML configuration with embedded defaults.

use crate::cache::{CacheOptions, CachePolicies, ToolCachePolicy};
use crate::error::{GuardrailError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable the JSONL audit file
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,

    /// In-memory audit entries kept by the classifier
    pub max_audit_entries: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            audit_log: false,
            audit_path: Some("~/.local/state/tool-guardrails/audit.jsonl".to_string()),
            max_audit_entries: 1_000,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "warn" or "tool_guardrails=debug"
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Tool result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_memory_entries: usize,

    /// Bound on each durable-store read or write
    pub durable_timeout_ms: u64,

    /// Keep cached results per session
    pub session_scoped: bool,

    /// Per-tool overrides of the built-in policies; `default` sets the fallback
    pub policies: HashMap<String, ToolCachePolicy>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_entries: 1_000,
            durable_timeout_ms: 250,
            session_scoped: false,
            policies: HashMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            max_memory_entries: self.max_memory_entries,
            durable_timeout: Duration::from_millis(self.durable_timeout_ms),
            session_scoped: self.session_scoped,
        }
    }

    pub fn policies(&self) -> CachePolicies {
        CachePolicies::builtin().with_overrides(&self.policies)
    }
}

/// Output masking configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Collapse home directories to `~`
    pub mask_paths: bool,
    pub mask_emails: bool,
    pub mask_ips: bool,

    /// Byte limit on sanitized output; 0 disables truncation
    pub max_length: usize,

    /// Truncate at a line boundary
    pub preserve_lines: bool,

    /// TOML file of additional `[[pattern]]` entries
    pub custom_patterns_file: Option<String>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            mask_paths: false,
            mask_emails: true,
            mask_ips: true,
            max_length: 100_000,
            preserve_lines: true,
            custom_patterns_file: None,
        }
    }
}

/// Which tool names get which treatment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Tools whose `command` argument is classified
    pub shell: Vec<String>,

    /// Tools whose success invalidates cached reads of their path
    pub mutating: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell: vec![
                "bash".to_string(),
                "Bash".to_string(),
                "shell".to_string(),
                "execute_command".to_string(),
            ],
            mutating: vec![
                "write_file".to_string(),
                "edit_file".to_string(),
                "delete_file".to_string(),
                "Write".to_string(),
                "Edit".to_string(),
                "MultiEdit".to_string(),
            ],
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub masking: MaskingConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Standard locations, user config first
    pub fn search_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("tool-guardrails/config.toml")),
            Some(PathBuf::from("/etc/tool-guardrails/config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from `explicit` if given, else the first existing standard
    /// location, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // Return defaults
        Ok(Config::default())
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GuardrailError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| GuardrailError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Audit log path, when the audit file is enabled
    pub fn audit_path(&self) -> Option<PathBuf> {
        if !self.general.audit_log {
            return None;
        }
        self.general.audit_path.as_deref().map(Self::expand_path)
    }

    /// Custom pattern file path (expanded)
    pub fn custom_patterns_path(&self) -> Option<PathBuf> {
        self.masking
            .custom_patterns_file
            .as_deref()
            .map(Self::expand_path)
    }

    pub fn is_shell_tool(&self, tool: &str) -> bool {
        self.tools.shell.iter().any(|t| t == tool)
    }

    pub fn is_mutating_tool(&self, tool: &str) -> bool {
        self.tools.mutating.iter().any(|t| t == tool)
    }
}

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
audit_log = false
audit_path = "~/.local/state/tool-guardrails/audit.jsonl"
max_audit_entries = 1000

[logging]
level = "warn"
format = "pretty"

[cache]
max_memory_entries = 1000
durable_timeout_ms = 250
session_scoped = false

# [cache.policies.read_file]
# ttl_ms = 300000
# cacheable = true

[masking]
mask_paths = false
mask_emails = true
mask_ips = true
max_length = 100000
preserve_lines = true
# custom_patterns_file = "~/.config/tool-guardrails/patterns.toml"

[tools]
shell = ["bash", "Bash", "shell", "execute_command"]
mutating = ["write_file", "edit_file", "delete_file", "Write", "Edit", "MultiEdit"]
"#;
