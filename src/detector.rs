//! Sensitive-data detection
//!
//! Scans text against the built-in catalog, then any registered custom
//! patterns. A candidate span that intersects an already accepted span is
//! discarded, so earlier (more specific) patterns win. Every scan starts from
//! fresh iterators; no match state survives between calls.

use crate::error::{GuardrailError, Result};
use crate::rules::custom::CustomPatternFile;
use crate::rules::secrets::{sensitive_patterns, Confidence, MaskStyle};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Regex, RegexSet};
use serde::Serialize;
use std::collections::BTreeMap;

/// Constant marker substituted for masked values
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Values shorter than this fall back from partial to full masking
const PARTIAL_MIN_CHARS: usize = 12;

/// Characters kept on each side by partial masking
const PARTIAL_KEEP: usize = 4;

/// Longest structural prefix kept for patterns without known sigils
const MAX_GENERIC_PREFIX: usize = 12;

#[derive(Debug)]
struct CompiledPattern {
    secret_type: String,
    regex: Regex,
    group: usize,
    confidence: Confidence,
    mask_style: MaskStyle,
    sigils: &'static [&'static str],
}

static BUILTIN: Lazy<Vec<CompiledPattern>> = Lazy::new(|| {
    sensitive_patterns()
        .iter()
        .map(|p| CompiledPattern {
            secret_type: p.kind.as_str().to_string(),
            regex: Regex::new(p.pattern).unwrap(),
            group: p.group,
            confidence: p.confidence,
            mask_style: p.mask_style,
            sigils: p.sigils,
        })
        .collect()
});

static BUILTIN_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(sensitive_patterns().iter().map(|p| p.pattern)).unwrap());

/// A single detected sensitive span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensitiveMatch {
    #[serde(rename = "type")]
    pub secret_type: String,

    /// Byte offset of the first matched character
    pub start: usize,

    /// Byte offset one past the last matched character
    pub end: usize,

    /// Never serialized
    #[serde(skip_serializing)]
    pub original: String,

    pub masked: String,

    pub confidence: Confidence,
}

/// Outcome of scanning one piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub has_sensitive: bool,

    /// Non-overlapping, ordered by start offset
    pub matches: Vec<SensitiveMatch>,

    pub count: usize,
}

impl DetectionResult {
    /// Distinct type tags in first-seen order
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for m in &self.matches {
            if !types.contains(&m.secret_type) {
                types.push(m.secret_type.clone());
            }
        }
        types
    }
}

/// Detects and masks credentials and other sensitive values
#[derive(Debug, Default)]
pub struct SensitiveDataDetector {
    custom: RwLock<Vec<CompiledPattern>>,
}

impl SensitiveDataDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional pattern, consulted after the built-ins
    pub fn add_custom_pattern(
        &self,
        secret_type: &str,
        pattern: &str,
        confidence: Confidence,
        mask_style: MaskStyle,
    ) -> Result<()> {
        let compiled = compile_custom(secret_type, pattern, confidence, mask_style)?;
        tracing::debug!(secret_type, "registered custom sensitive pattern");
        self.custom.write().push(compiled);
        Ok(())
    }

    /// Register every entry of a pattern file.
    ///
    /// All entries are compiled before any is added, so an invalid entry
    /// leaves the registered set unchanged.
    pub fn register_file(&self, file: &CustomPatternFile) -> Result<usize> {
        let compiled = file
            .pattern
            .iter()
            .map(|entry| {
                compile_custom(
                    &entry.secret_type,
                    &entry.regex,
                    entry.confidence,
                    entry.mask_style,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let count = compiled.len();
        self.custom.write().extend(compiled);
        tracing::debug!(count, "registered custom pattern file");
        Ok(count)
    }

    pub fn custom_pattern_count(&self) -> usize {
        self.custom.read().len()
    }

    /// Find every sensitive span in `text`
    pub fn detect(&self, text: &str) -> DetectionResult {
        let mut accepted: BTreeMap<usize, SensitiveMatch> = BTreeMap::new();

        for pattern in BUILTIN.iter() {
            collect_matches(pattern, text, &mut accepted);
        }
        for pattern in self.custom.read().iter() {
            collect_matches(pattern, text, &mut accepted);
        }

        let matches: Vec<SensitiveMatch> = accepted.into_values().collect();
        let count = matches.len();
        DetectionResult {
            has_sensitive: count > 0,
            matches,
            count,
        }
    }

    /// Quick check without building a match list
    pub fn has_sensitive(&self, text: &str) -> bool {
        BUILTIN_SET.is_match(text) || self.custom.read().iter().any(|p| p.regex.is_match(text))
    }

    /// Replace every detected span with its masked form
    pub fn mask_all(&self, text: &str) -> String {
        self.mask_with_result(text).0
    }

    /// Mask `text` and also return what was found
    pub fn mask_with_result(&self, text: &str) -> (String, DetectionResult) {
        let result = self.detect(text);
        if !result.has_sensitive {
            return (text.to_string(), result);
        }

        let mut masked = text.to_string();
        for m in result.matches.iter().rev() {
            masked.replace_range(m.start..m.end, &m.masked);
        }
        (masked, result)
    }
}

fn compile_custom(
    secret_type: &str,
    pattern: &str,
    confidence: Confidence,
    mask_style: MaskStyle,
) -> Result<CompiledPattern> {
    let regex = Regex::new(pattern).map_err(|source| GuardrailError::InvalidPattern {
        name: secret_type.to_string(),
        source,
    })?;
    // Zero-width matches are never reported, so has_sensitive would disagree with detect
    if regex.is_match("") {
        return Err(GuardrailError::EmptyMatchPattern {
            name: secret_type.to_string(),
        });
    }

    Ok(CompiledPattern {
        secret_type: secret_type.to_string(),
        regex,
        group: 0,
        confidence,
        mask_style,
        sigils: &[],
    })
}

/// Accepted spans are disjoint and keyed by start, so only the nearest
/// span starting before a candidate's end can intersect it.
fn collect_matches(
    pattern: &CompiledPattern,
    text: &str,
    accepted: &mut BTreeMap<usize, SensitiveMatch>,
) {
    for caps in pattern.regex.captures_iter(text) {
        let Some(m) = caps.get(pattern.group) else {
            continue;
        };
        if m.start() == m.end() {
            continue;
        }
        let overlaps = accepted
            .range(..m.end())
            .next_back()
            .is_some_and(|(_, a)| a.end > m.start());
        if overlaps {
            continue;
        }

        accepted.insert(
            m.start(),
            SensitiveMatch {
                secret_type: pattern.secret_type.clone(),
                start: m.start(),
                end: m.end(),
                original: m.as_str().to_string(),
                masked: mask_value(m.as_str(), pattern.mask_style, pattern.sigils),
                confidence: pattern.confidence,
            },
        );
    }
}

/// Render `value` according to `style`
pub fn mask_value(value: &str, style: MaskStyle, sigils: &[&str]) -> String {
    match style {
        MaskStyle::Full => REDACTION_MARKER.to_string(),
        MaskStyle::Partial => {
            let chars: Vec<char> = value.chars().collect();
            if chars.len() < PARTIAL_MIN_CHARS {
                return REDACTION_MARKER.to_string();
            }
            let head: String = chars[..PARTIAL_KEEP].iter().collect();
            let tail: String = chars[chars.len() - PARTIAL_KEEP..].iter().collect();
            format!("{head}****{tail}")
        }
        MaskStyle::Prefix => match structural_prefix(value, sigils) {
            Some(prefix) => format!("{prefix}{REDACTION_MARKER}"),
            None => REDACTION_MARKER.to_string(),
        },
    }
}

/// Leading part of a value that identifies its kind but not its secret
fn structural_prefix<'a>(value: &'a str, sigils: &[&str]) -> Option<&'a str> {
    if let Some(sigil) = sigils
        .iter()
        .filter(|s| value.starts_with(**s))
        .max_by_key(|s| s.len())
    {
        return Some(&value[..sigil.len()]);
    }

    if let Some(idx) = value.find("://") {
        return Some(&value[..idx + 3]);
    }

    // Custom tokens like `itk_abc...` keep their leading tag
    value
        .char_indices()
        .take(MAX_GENERIC_PREFIX)
        .find(|(i, c)| *i > 0 && matches!(c, '_' | '-' | '.'))
        .map(|(i, _)| &value[..=i])
}
