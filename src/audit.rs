//! JSONL audit sink
//!
//! Appends one JSON object per classified command. Commands are masked by the
//! caller before they reach this writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::classifier::CommandAuditEntry;
use crate::error::{GuardrailError, Result};

/// Audit logger
#[derive(Debug, Default)]
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    /// Open (or create) the log file; an unopenable path disables logging
    pub fn new(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                writer: Some(BufWriter::new(file)),
                path: Some(path.to_path_buf()),
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "audit log disabled");
                Self::default()
            }
        }
    }

    /// Append an entry
    pub fn log(&mut self, entry: &CommandAuditEntry) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let json = serde_json::to_string(entry)?;
        let path = self.path.clone().unwrap_or_default();
        writeln!(writer, "{}", json)
            .and_then(|_| writer.flush())
            .map_err(|source| GuardrailError::Io { path, source })
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}
