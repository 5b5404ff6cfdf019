//! Log masking coordinator
//!
//! Layers generic masking on top of the sensitive-data detector. Steps run in
//! a fixed order: secrets, home paths, emails, IPv4 addresses, caller-supplied
//! replacements, then truncation.

use crate::config::MaskingConfig;
use crate::detector::{SensitiveDataDetector, REDACTION_MARKER};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Appended when output is cut
pub const TRUNCATION_MARKER: &str = "\n[... output truncated]";

/// Substituted for subtrees nested deeper than `MAX_OBJECT_DEPTH`
pub const MAX_DEPTH_MARKER: &str = "[MAX_DEPTH_EXCEEDED]";

pub const MAX_OBJECT_DEPTH: usize = 32;

/// Key fragments whose string values are redacted wholesale
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "auth",
    "private",
    "access",
    "bearer",
    "jwt",
    "session",
];

static HOME_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:/home|/Users)/[^/\s]+").unwrap());

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z0-9._%+-]+)@([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,})\b").unwrap()
});

static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap());

static SECRET_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)((?:^|\s)--?(?:[a-z0-9]+-)*(?:password|passwd|pass|token|secret|(?:api|access|secret|private)-?key|apikey|auth|credentials?)(?:-[a-z0-9]+)*)(=|\s+)("[^"]*"|'[^']*'|[^\s"'\[-]\S*)"#,
    )
    .unwrap()
});

static SECRET_ENV_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b([A-Z0-9_]*(?:KEY|SECRET|TOKEN|PASSWORD|PASSWD|CREDENTIAL|AUTH)[A-Z0-9_]*)=("[^"]*"|'[^']*'|[^\s"'\[]\S*)"#,
    )
    .unwrap()
});

static URL_PASSWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\b[a-zA-Z][a-zA-Z0-9+.-]*://[^\s:/@]+):[^\s@/\[][^\s@/]*@").unwrap()
});

/// What to mask and how to bound the output
#[derive(Debug, Clone)]
pub struct MaskOptions {
    pub mask_secrets: bool,

    /// Collapse home directories to `~`
    pub mask_paths: bool,

    /// Explicit home directory to collapse in addition to `/home/*` and `/Users/*`
    pub home_dir: Option<String>,

    pub mask_emails: bool,

    pub mask_ips: bool,

    /// Pattern and replacement pairs applied after the built-in steps
    pub custom_replacements: Vec<(Regex, String)>,

    /// Byte limit for the returned text, marker included
    pub max_length: Option<usize>,

    /// Cut at the last line boundary instead of mid-line
    pub preserve_lines: bool,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            mask_secrets: true,
            mask_paths: false,
            home_dir: None,
            mask_emails: true,
            mask_ips: true,
            custom_replacements: Vec::new(),
            max_length: None,
            preserve_lines: true,
        }
    }
}

impl From<&MaskingConfig> for MaskOptions {
    fn from(config: &MaskingConfig) -> Self {
        Self {
            mask_secrets: true,
            mask_paths: config.mask_paths,
            home_dir: config
                .mask_paths
                .then(dirs::home_dir)
                .flatten()
                .map(|p| p.to_string_lossy().into_owned()),
            mask_emails: config.mask_emails,
            mask_ips: config.mask_ips,
            custom_replacements: Vec::new(),
            max_length: (config.max_length > 0).then_some(config.max_length),
            preserve_lines: config.preserve_lines,
        }
    }
}

/// Outcome of sanitizing one piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeResult {
    pub text: String,

    /// Secrets, emails, IPs, and custom replacements applied
    pub mask_count: usize,

    /// Distinct kinds masked, first-seen order
    pub types: Vec<String>,

    pub truncated: bool,
}

impl SanitizeResult {
    fn note(&mut self, kind: &str, count: usize) {
        if count == 0 {
            return;
        }
        self.mask_count += count;
        if !self.types.iter().any(|t| t == kind) {
            self.types.push(kind.to_string());
        }
    }
}

/// Masks text, commands, and structured values before they reach logs
#[derive(Debug, Clone)]
pub struct LogMasker {
    detector: Arc<SensitiveDataDetector>,
}

impl LogMasker {
    pub fn new(detector: Arc<SensitiveDataDetector>) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &SensitiveDataDetector {
        &self.detector
    }

    /// Run every enabled masking step over `text`
    pub fn sanitize(&self, text: &str, options: &MaskOptions) -> SanitizeResult {
        let mut result = SanitizeResult::default();
        let mut current = text.to_string();

        if options.mask_secrets {
            let (masked, detection) = self.detector.mask_with_result(&current);
            for m in &detection.matches {
                result.note(&m.secret_type, 1);
            }
            current = masked;
        }

        if options.mask_paths {
            current = collapse_home(&current, options.home_dir.as_deref());
        }

        if options.mask_emails {
            let (masked, count) = mask_emails(&current);
            result.note("email", count);
            current = masked;
        }

        if options.mask_ips {
            let (masked, count) = mask_ipv4(&current);
            result.note("ip_address", count);
            current = masked;
        }

        for (pattern, replacement) in &options.custom_replacements {
            let count = pattern.find_iter(&current).count();
            if count > 0 {
                current = pattern.replace_all(&current, replacement.as_str()).into_owned();
                result.note("custom", count);
            }
        }

        if let Some(limit) = options.max_length {
            let (cut, truncated) = truncate(&current, limit, options.preserve_lines);
            current = cut;
            result.truncated = truncated;
        }

        result.text = current;
        result
    }

    /// Mask secret-bearing flags, environment assignments, and URL passwords
    /// in a shell command, then run the general detector
    pub fn mask_command(&self, command: &str) -> String {
        let masked = SECRET_FLAG.replace_all(command, |caps: &Captures| {
            format!("{}{}{}", &caps[1], &caps[2], REDACTION_MARKER)
        });
        let masked = SECRET_ENV_ASSIGNMENT.replace_all(&masked, |caps: &Captures| {
            format!("{}={}", &caps[1], REDACTION_MARKER)
        });
        let masked = URL_PASSWORD.replace_all(&masked, |caps: &Captures| {
            format!("{}:{}@", &caps[1], REDACTION_MARKER)
        });
        self.detector.mask_all(&masked)
    }

    /// Mask a JSON value, redacting strings stored under sensitive keys
    pub fn mask_object(&self, value: &Value) -> Value {
        self.mask_node(value, false, 0)
    }

    fn mask_node(&self, value: &Value, sensitive: bool, depth: usize) -> Value {
        if depth > MAX_OBJECT_DEPTH {
            return Value::String(MAX_DEPTH_MARKER.to_string());
        }

        match value {
            Value::String(_) if sensitive => Value::String(REDACTION_MARKER.to_string()),
            Value::String(s) => Value::String(self.detector.mask_all(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.mask_node(item, sensitive, depth + 1))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut masked = Map::with_capacity(map.len());
                for (key, child) in map {
                    let child_sensitive = sensitive || is_sensitive_key(key);
                    masked.insert(key.clone(), self.mask_node(child, child_sensitive, depth + 1));
                }
                Value::Object(masked)
            }
            other => other.clone(),
        }
    }
}

/// Case-insensitive substring check against the sensitive key fragments
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

fn collapse_home(text: &str, home_dir: Option<&str>) -> String {
    let text = match home_dir {
        Some(home) if !home.is_empty() && home != "/" => text.replace(home, "~"),
        _ => text.to_string(),
    };
    HOME_PATH.replace_all(&text, "~").into_owned()
}

fn mask_emails(text: &str) -> (String, usize) {
    let mut count = 0;
    let masked = EMAIL.replace_all(text, |caps: &Captures| {
        count += 1;
        let local = &caps[1];
        let kept = if local.chars().count() > 2 {
            local.chars().take(1).collect::<String>()
        } else {
            String::new()
        };
        format!("{kept}***@{}", &caps[2])
    });
    (masked.into_owned(), count)
}

fn mask_ipv4(text: &str) -> (String, usize) {
    let mut count = 0;
    let masked = IPV4.replace_all(text, |caps: &Captures| {
        let whole = &caps[0];
        match whole.parse::<Ipv4Addr>() {
            Ok(ip) if !ip.is_loopback() && !ip.is_unspecified() => {
                count += 1;
                format!("{}.***.***.{}", &caps[1], &caps[4])
            }
            _ => whole.to_string(),
        }
    });
    (masked.into_owned(), count)
}

/// Cut `text` so the result, marker included, fits in `limit` bytes
pub fn truncate(text: &str, limit: usize, preserve_lines: bool) -> (String, bool) {
    if text.len() <= limit {
        return (text.to_string(), false);
    }

    if limit < TRUNCATION_MARKER.len() {
        let cut = floor_char_boundary(text, limit);
        return (text[..cut].to_string(), true);
    }

    let mut cut = floor_char_boundary(text, limit - TRUNCATION_MARKER.len());
    if preserve_lines {
        if let Some(newline) = text[..cut].rfind('\n') {
            cut = newline;
        }
    }
    (format!("{}{}", &text[..cut], TRUNCATION_MARKER), true)
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
