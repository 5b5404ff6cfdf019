//! Output formatting for agent hook responses
//!
//! Produces the permission-decision JSON a hook writes to stdout.

use serde::Serialize;

use crate::classifier::ValidationResult;

/// Main output structure for agent hooks
#[derive(Debug, Serialize)]
pub struct HookOutput {
    /// Hook-specific output containing the permission decision
    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,

    /// Optional system message to show the user
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

/// Hook-specific output with permission decision
#[derive(Debug, Serialize)]
pub struct HookSpecificOutput {
    /// The hook event name (typically "PreToolUse")
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,

    /// Permission decision: "allow", "ask", or "deny"
    #[serde(rename = "permissionDecision")]
    pub permission_decision: String,

    #[serde(
        rename = "permissionDecisionReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_decision_reason: Option<String>,
}

/// Decision derived from a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run it
    Allow,

    /// Allowed, but high enough risk that the user should confirm
    Ask { flags: Vec<String>, reason: String },

    /// Blocked
    Deny { flag: String, reason: String },
}

impl Decision {
    pub fn from_validation(validation: &ValidationResult) -> Self {
        let reason = validation
            .reason
            .clone()
            .unwrap_or_else(|| format!("{} risk command", validation.risk_level));

        if validation.is_blocked() {
            Decision::Deny {
                flag: validation
                    .security_flags
                    .first()
                    .cloned()
                    .unwrap_or_default(),
                reason,
            }
        } else if validation.requires_confirmation() {
            Decision::Ask {
                flags: validation.security_flags.clone(),
                reason,
            }
        } else {
            Decision::Allow
        }
    }

    /// Check if this is an allow decision
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Check if this is a deny decision
    pub fn is_deny(&self) -> bool {
        matches!(self, Decision::Deny { .. })
    }
}

impl HookOutput {
    /// Create an allow response (empty output = allow)
    pub fn allow() -> Self {
        HookOutput {
            hook_specific_output: None,
            system_message: None,
        }
    }

    /// Create a deny response with flag and reason
    pub fn deny(flag: &str, reason: &str) -> Self {
        let tag = if flag.is_empty() {
            "[guardrails]".to_string()
        } else {
            format!("[guardrails:{}]", flag)
        };
        HookOutput {
            hook_specific_output: Some(Self::specific("deny", reason)),
            system_message: Some(format!("{} Blocked: {}", tag, reason)),
        }
    }

    /// Create an ask response; the host prompts the user before running
    pub fn ask(flags: &[String], reason: &str) -> Self {
        HookOutput {
            hook_specific_output: Some(Self::specific("ask", reason)),
            system_message: Some(format!(
                "[guardrails] Confirm: {} ({})",
                reason,
                flags.join(", ")
            )),
        }
    }

    fn specific(decision: &str, reason: &str) -> HookSpecificOutput {
        HookSpecificOutput {
            hook_event_name: "PreToolUse".to_string(),
            permission_decision: decision.to_string(),
            permission_decision_reason: Some(reason.to_string()),
        }
    }

    /// Create output from a Decision
    pub fn from_decision(decision: &Decision) -> Self {
        match decision {
            Decision::Allow => HookOutput::allow(),
            Decision::Ask { flags, reason } => HookOutput::ask(flags, reason),
            Decision::Deny { flag, reason } => HookOutput::deny(flag, reason),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_command;

    #[test]
    fn test_allow_output() {
        let output = HookOutput::allow();
        assert_eq!(output.to_json(), "{}");
    }

    #[test]
    fn test_deny_output() {
        let output = HookOutput::deny("root_delete", "Deleting the filesystem root");
        let json = output.to_json();
        assert!(json.contains("\"permissionDecision\":\"deny\""));
        assert!(json.contains("[guardrails:root_delete] Blocked"));
    }

    #[test]
    fn test_from_validation_blocked() {
        let decision = Decision::from_validation(&classify_command("rm -rf /"));
        assert!(decision.is_deny());

        let output = HookOutput::from_decision(&decision);
        assert_eq!(
            output.hook_specific_output.unwrap().permission_decision,
            "deny"
        );
    }

    #[test]
    fn test_from_validation_safe() {
        let decision = Decision::from_validation(&classify_command("ls -la"));
        assert!(decision.is_allow());
        assert!(HookOutput::from_decision(&decision)
            .hook_specific_output
            .is_none());
    }

    #[test]
    fn test_from_validation_high_risk_asks() {
        let validation = classify_command("git push --force origin main");
        assert!(validation.requires_confirmation());

        let decision = Decision::from_validation(&validation);
        assert!(matches!(decision, Decision::Ask { .. }));

        let json = HookOutput::from_decision(&decision).to_json();
        assert!(json.contains("\"permissionDecision\":\"ask\""));
        assert!(json.contains("Confirm"));
    }
}
