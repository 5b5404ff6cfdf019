//! Pattern catalogs for tool-guardrails
//!
//! Defines the dangerous-command catalogs, the sensitive-data catalog, and the
//! user-supplied pattern file format. Built-in catalogs are immutable statics.

pub mod custom;
pub mod dangerous;
pub mod secrets;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered classification of a command's destructive potential
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Lowercase name used in JSON and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dangerous-command rule definition
#[derive(Debug, Clone)]
pub struct DangerousPattern {
    /// Short machine-readable identifier reported in security flags
    pub flag: &'static str,

    /// Risk contributed when this rule matches
    pub level: RiskLevel,

    /// Regex pattern to match against the raw command
    pub pattern: &'static str,

    /// Human-readable reason
    pub reason: &'static str,

    /// Optional safer alternative
    pub suggestion: Option<&'static str>,
}

impl DangerousPattern {
    /// Create a new rule
    pub const fn new(
        flag: &'static str,
        level: RiskLevel,
        pattern: &'static str,
        reason: &'static str,
    ) -> Self {
        Self {
            flag,
            level,
            pattern,
            reason,
            suggestion: None,
        }
    }

    /// Attach a suggestion
    pub const fn suggest(mut self, suggestion: &'static str) -> Self {
        self.suggestion = Some(suggestion);
        self
    }
}
