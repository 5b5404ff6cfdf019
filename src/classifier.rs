//! Command risk classification
//!
//! Classifies shell commands before execution against the blocked and
//! dangerous catalogs plus two heuristics, and keeps a bounded audit trail of
//! what was classified and how it ran.

use crate::parser::shell;
use crate::rules::dangerous::{blocked_patterns, dangerous_patterns};
use crate::rules::RiskLevel;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Flag added when a command reads sensitive environment values
pub const ENV_ACCESS_FLAG: &str = "env_access";

/// Flag added when a command invokes a network-capable program
pub const NETWORK_FLAG: &str = "network_operation";

static BLOCKED_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(blocked_patterns().iter().map(|r| r.pattern)).unwrap());

static DANGEROUS_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(dangerous_patterns().iter().map(|r| r.pattern)).unwrap());

/// Outcome of classifying one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub allowed: bool,

    pub risk_level: RiskLevel,

    /// Matched rule flags in evaluation order
    pub security_flags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationResult {
    fn safe() -> Self {
        Self {
            allowed: true,
            risk_level: RiskLevel::Safe,
            security_flags: Vec::new(),
            reason: None,
            suggestion: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        !self.allowed
    }

    /// Allowed, but the caller should confirm before running it
    pub fn requires_confirmation(&self) -> bool {
        self.allowed && self.risk_level >= RiskLevel::High
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.security_flags.iter().any(|f| f == flag)
    }

    fn raise_to(&mut self, level: RiskLevel) {
        self.risk_level = self.risk_level.max(level);
    }
}

/// What the executor reports back after running a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Execution details stored on an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub exit_code: i32,
    pub duration_ms: u64,
    pub success: bool,
}

impl From<ExecutionResult> for ExecutionRecord {
    fn from(result: ExecutionResult) -> Self {
        Self {
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
            success: result.exit_code == 0,
        }
    }
}

/// One classified command and, when it ran, how it went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAuditEntry {
    pub timestamp: DateTime<Utc>,

    pub command: String,

    pub validation: ValidationResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    NotRunning,
    Unknown,
}

/// Advisory snapshot of a running command's process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessMonitor {
    pub pid: u32,
    pub status: ProcessStatus,
}

/// Classify a command without recording anything
pub fn classify_command(command: &str) -> ValidationResult {
    if let Some(idx) = BLOCKED_SET.matches(command).iter().next() {
        let rule = &blocked_patterns()[idx];
        return ValidationResult {
            allowed: false,
            risk_level: RiskLevel::Critical,
            security_flags: vec![rule.flag.to_string()],
            reason: Some(rule.reason.to_string()),
            suggestion: rule.suggestion.map(str::to_string),
        };
    }

    let mut result = ValidationResult::safe();

    let rules = dangerous_patterns();
    for idx in DANGEROUS_SET.matches(command).iter() {
        let rule = &rules[idx];
        result.security_flags.push(rule.flag.to_string());
        // Equal levels keep the earlier rule's explanation
        if rule.level > result.risk_level {
            result.risk_level = rule.level;
            result.reason = Some(rule.reason.to_string());
            result.suggestion = rule.suggestion.map(str::to_string);
        }
    }

    if shell::reads_sensitive_env(command) {
        result.security_flags.push(ENV_ACCESS_FLAG.to_string());
        result.raise_to(RiskLevel::Low);
        result
            .reason
            .get_or_insert_with(|| "Reads sensitive environment variables".to_string());
    }

    let network = shell::network_programs(command);
    if !network.is_empty() {
        result.security_flags.push(NETWORK_FLAG.to_string());
        result.raise_to(RiskLevel::Low);
        result
            .reason
            .get_or_insert_with(|| format!("Uses network program: {}", network.join(", ")));
    }

    result.allowed = result.risk_level != RiskLevel::Critical;
    result
}

/// Classifies commands and keeps their audit trail
#[derive(Debug)]
pub struct CommandClassifier {
    audit: Mutex<VecDeque<CommandAuditEntry>>,
    max_audit_entries: usize,
}

impl CommandClassifier {
    pub fn new(max_audit_entries: usize) -> Self {
        Self {
            audit: Mutex::new(VecDeque::new()),
            max_audit_entries,
        }
    }

    /// Classify a command before it runs
    pub fn pre_execute(&self, command: &str) -> ValidationResult {
        let result = classify_command(command);

        if result.allowed {
            tracing::debug!(
                risk = %result.risk_level,
                flags = ?result.security_flags,
                "classified command"
            );
        } else {
            tracing::warn!(
                flags = ?result.security_flags,
                reason = result.reason.as_deref().unwrap_or_default(),
                "blocked command"
            );
        }
        result
    }

    /// Best-effort status of a spawned process. Takes no classifier locks.
    pub fn monitor(&self, pid: u32) -> ProcessMonitor {
        ProcessMonitor {
            pid,
            status: probe_process(pid),
        }
    }

    /// Record a classified command and its outcome
    pub fn post_execute(
        &self,
        command: &str,
        validation: &ValidationResult,
        execution: Option<ExecutionResult>,
        session_id: Option<&str>,
    ) -> CommandAuditEntry {
        let entry = CommandAuditEntry {
            timestamp: Utc::now(),
            command: command.to_string(),
            validation: validation.clone(),
            execution: execution.map(ExecutionRecord::from),
            session_id: session_id.map(str::to_string),
        };

        if self.max_audit_entries > 0 {
            let mut audit = self.audit.lock();
            while audit.len() >= self.max_audit_entries {
                audit.pop_front();
            }
            audit.push_back(entry.clone());
        }
        entry
    }

    /// Snapshot of the audit trail, oldest first
    pub fn audit_log(&self) -> Vec<CommandAuditEntry> {
        self.audit.lock().iter().cloned().collect()
    }

    pub fn audit_for_session(&self, session_id: &str) -> Vec<CommandAuditEntry> {
        self.audit
            .lock()
            .iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect()
    }

    pub fn clear_audit(&self) {
        self.audit.lock().clear();
    }

    /// Drop one session's entries, returning how many were removed
    pub fn clear_session(&self, session_id: &str) -> usize {
        let mut audit = self.audit.lock();
        let before = audit.len();
        audit.retain(|e| e.session_id.as_deref() != Some(session_id));
        before - audit.len()
    }
}

impl Default for CommandClassifier {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[cfg(target_os = "linux")]
fn probe_process(pid: u32) -> ProcessStatus {
    if std::path::Path::new("/proc").join(pid.to_string()).exists() {
        ProcessStatus::Running
    } else {
        ProcessStatus::NotRunning
    }
}

#[cfg(not(target_os = "linux"))]
fn probe_process(_pid: u32) -> ProcessStatus {
    ProcessStatus::Unknown
}
