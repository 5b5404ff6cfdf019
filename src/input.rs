//! Input parsing for agent hook JSON
//!
//! Parses the JSON tool-call description an agent host sends on stdin.

use serde::Deserialize;
use serde_json::Value;

/// Main input structure from agent hooks
#[derive(Debug, Deserialize)]
pub struct HookInput {
    /// Name of the tool being invoked (e.g., "bash", "read_file", "Write")
    pub tool_name: String,

    /// Tool-specific input parameters
    pub tool_input: ToolInput,

    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Tool-specific input, classified by shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInput {
    /// Has a `command` string
    Shell { command: String },

    /// Anything else
    Other,
}

impl<'de> Deserialize<'de> for ToolInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;

        Ok(match raw.get("command").and_then(Value::as_str) {
            Some(command) => ToolInput::Shell {
                command: command.to_string(),
            },
            None => ToolInput::Other,
        })
    }
}

impl ToolInput {
    pub fn command(&self) -> Option<&str> {
        match self {
            ToolInput::Shell { command } => Some(command),
            ToolInput::Other => None,
        }
    }
}

impl HookInput {
    /// Parse input from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
