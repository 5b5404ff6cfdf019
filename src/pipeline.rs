//! Guardrail pipeline
//!
//! One context object owning the classifier, result cache, and masker. It is
//! built once from [`Config`] and shared by reference across tool calls.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::audit::AuditLogger;
use crate::cache::clock::Clock;
use crate::cache::store::DurableStore;
use crate::cache::{CacheStats, ToolResult, ToolResultCache};
use crate::classifier::{CommandAuditEntry, CommandClassifier, ExecutionResult, ValidationResult};
use crate::config::Config;
use crate::detector::SensitiveDataDetector;
use crate::error::Result;
use crate::masking::{LogMasker, MaskOptions, SanitizeResult};
use crate::rules::custom::CustomPatternFile;

/// Argument fields a mutating tool may write through
const PATH_FIELDS: &[&str] = &["path", "file_path", "destination"];

/// A tool invocation as the agent requested it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Runs tools on behalf of the pipeline
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// What happened to a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// Refused before execution
    Blocked {
        validation: ValidationResult,
        audit: CommandAuditEntry,
    },

    /// Executed or served from cache; `result.content` is already sanitized
    Completed {
        result: ToolResult,
        validation: Option<ValidationResult>,
        cached: bool,
        mask_count: usize,
        truncated: bool,
    },
}

impl ToolCallOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ToolCallOutcome::Blocked { .. })
    }
}

/// Classifier, cache, and masker sequenced around each tool call
pub struct GuardrailPipeline {
    classifier: CommandClassifier,
    cache: ToolResultCache,
    masker: LogMasker,
    mask_options: MaskOptions,
    audit: Mutex<AuditLogger>,
    shell_tools: Vec<String>,
    mutating_tools: Vec<String>,
}

impl GuardrailPipeline {
    /// Build from configuration, registering the custom pattern file if one
    /// is configured and present
    pub fn new(config: &Config) -> Result<Self> {
        let detector = Arc::new(SensitiveDataDetector::new());

        if let Some(path) = config.custom_patterns_path() {
            if path.exists() {
                let file = CustomPatternFile::from_file(&path)?;
                let count = detector.register_file(&file)?;
                tracing::debug!(path = %path.display(), count, "loaded custom patterns");
            } else {
                tracing::warn!(path = %path.display(), "custom pattern file not found");
            }
        }

        Ok(Self {
            classifier: CommandClassifier::new(config.general.max_audit_entries),
            cache: ToolResultCache::new(config.cache.policies(), config.cache.options()),
            masker: LogMasker::new(detector),
            mask_options: MaskOptions::from(&config.masking),
            audit: Mutex::new(AuditLogger::new(config.audit_path().as_deref())),
            shell_tools: config.tools.shell.clone(),
            mutating_tools: config.tools.mutating.clone(),
        })
    }

    pub fn with_durable(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.cache = self.cache.with_durable(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    pub fn classifier(&self) -> &CommandClassifier {
        &self.classifier
    }

    pub fn cache(&self) -> &ToolResultCache {
        &self.cache
    }

    pub fn masker(&self) -> &LogMasker {
        &self.masker
    }

    pub fn detector(&self) -> &SensitiveDataDetector {
        self.masker.detector()
    }

    pub fn mask_options(&self) -> &MaskOptions {
        &self.mask_options
    }

    pub fn is_shell_tool(&self, tool: &str) -> bool {
        self.shell_tools.iter().any(|t| t == tool)
    }

    pub fn is_mutating_tool(&self, tool: &str) -> bool {
        self.mutating_tools.iter().any(|t| t == tool)
    }

    /// Classify a command before it runs
    pub fn classify(&self, command: &str) -> ValidationResult {
        self.classifier.pre_execute(command)
    }

    /// Record a classified command. The command is masked before it is
    /// stored or written to the audit file.
    pub fn record_outcome(
        &self,
        command: &str,
        validation: &ValidationResult,
        execution: Option<ExecutionResult>,
        session_id: Option<&str>,
    ) -> CommandAuditEntry {
        let masked = self.masker.mask_command(command);
        let entry = self
            .classifier
            .post_execute(&masked, validation, execution, session_id);

        if let Err(err) = self.audit.lock().log(&entry) {
            tracing::warn!(error = %err, "failed to write audit entry");
        }
        entry
    }

    pub async fn cache_lookup(
        &self,
        tool: &str,
        args: &Value,
        session_id: Option<&str>,
    ) -> Option<ToolResult> {
        self.cache.get(tool, args, session_id).await
    }

    pub async fn cache_store(
        &self,
        tool: &str,
        args: &Value,
        result: &ToolResult,
        ttl_ms: Option<u64>,
        session_id: Option<&str>,
    ) {
        self.cache.set(tool, args, result, ttl_ms, session_id).await;
    }

    /// Evict cached results that read `path`
    pub fn invalidate_path(&self, path: &str) -> usize {
        self.cache.invalidate_for_path(path)
    }

    pub async fn clean_expired(&self) -> usize {
        self.cache.clean_expired().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Sanitize with the configured options
    pub fn sanitize(&self, text: &str) -> SanitizeResult {
        self.masker.sanitize(text, &self.mask_options)
    }

    pub fn sanitize_with(&self, text: &str, options: &MaskOptions) -> SanitizeResult {
        self.masker.sanitize(text, options)
    }

    /// Run one tool call through every stage
    pub async fn run_tool(&self, call: &ToolCall, executor: &dyn ToolExecutor) -> ToolCallOutcome {
        let tool = call.tool_name.as_str();
        let session = call.session_id.as_deref();
        let command = self.shell_command(call);

        let validation = command.map(|command| self.classify(command));
        if let (Some(command), Some(validation)) = (command, &validation) {
            if validation.is_blocked() {
                let audit = self.record_outcome(command, validation, None, session);
                return ToolCallOutcome::Blocked {
                    validation: validation.clone(),
                    audit,
                };
            }
        }

        let (result, cached) = match self.cache.get(tool, &call.args, session).await {
            Some(result) => (result, true),
            None => {
                let started = Instant::now();
                let result = executor.execute(call).await;
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                if !result.is_failure() && self.is_mutating_tool(tool) {
                    self.invalidate_written_paths(&call.args);
                }
                self.cache.set(tool, &call.args, &result, None, session).await;

                if let (Some(command), Some(validation)) = (command, &validation) {
                    let execution = ExecutionResult {
                        exit_code: result.exit_code.unwrap_or(if result.success { 0 } else { 1 }),
                        duration_ms,
                    };
                    self.record_outcome(command, validation, Some(execution), session);
                }
                (result, false)
            }
        };

        if cached {
            if let (Some(command), Some(validation)) = (command, &validation) {
                self.record_outcome(command, validation, None, session);
            }
        }

        let sanitized = self.sanitize(&result.content);
        ToolCallOutcome::Completed {
            result: ToolResult {
                content: sanitized.text,
                metadata: result.metadata.as_ref().map(|m| self.masker.mask_object(m)),
                ..result
            },
            validation,
            cached,
            mask_count: sanitized.mask_count,
            truncated: sanitized.truncated,
        }
    }

    fn shell_command<'a>(&self, call: &'a ToolCall) -> Option<&'a str> {
        if !self.is_shell_tool(&call.tool_name) {
            return None;
        }
        call.args.get("command").and_then(Value::as_str)
    }

    fn invalidate_written_paths(&self, args: &Value) {
        for field in PATH_FIELDS {
            if let Some(path) = args.get(*field).and_then(Value::as_str) {
                self.cache.invalidate_for_path(path);
            }
        }
    }
}
