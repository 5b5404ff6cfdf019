//! Shell tokenization and heuristics
//!
//! Lightweight analysis over raw command strings. Nothing here executes or
//! fully parses shell; segments are split on control operators and tokenized
//! with shlex, falling back to whitespace when quoting is unbalanced.

use once_cell::sync::Lazy;
use regex::Regex;

/// Programs that can move data across the network
pub const NETWORK_PROGRAMS: &[&str] = &[
    "curl", "wget", "nc", "ncat", "netcat", "ssh", "scp", "sftp", "rsync", "ftp", "telnet",
];

/// Prefixes that run the next word as the real program
const PASSTHROUGH_PREFIXES: &[&str] = &["sudo", "nohup", "time", "exec", "command", "builtin"];

static SEGMENT_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\(|[|;&\n()`]").unwrap());

static SENSITIVE_VAR_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{?(?i:[A-Z0-9_]*(?:KEY|SECRET|TOKEN|PASSWORD|CREDENTIAL)[A-Z0-9_]*)\}?")
        .unwrap()
});

/// Tokenize a shell command into words
/// Uses shlex for proper shell quoting handling
pub fn tokenize(command: &str) -> Option<Vec<String>> {
    shlex::split(command)
}

/// Tokenize, falling back to whitespace splitting on malformed quoting
pub fn tokenize_lossy(command: &str) -> Vec<String> {
    tokenize(command)
        .unwrap_or_else(|| command.split_whitespace().map(str::to_string).collect())
}

/// Split on pipes, lists, subshells, and substitutions, tokenizing each part
pub fn split_segments(command: &str) -> Vec<Vec<String>> {
    SEGMENT_SPLIT
        .split(command)
        .map(tokenize_lossy)
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

/// Final path component of a word
pub fn basename(word: &str) -> &str {
    word.rsplit('/').next().unwrap_or(word)
}

/// Index of the word that names the program in a segment
pub fn program_index(segment: &[String]) -> Option<usize> {
    segment.iter().position(|word| {
        !is_assignment(word) && !PASSTHROUGH_PREFIXES.contains(&basename(word))
    })
}

fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Whether the command reads sensitive environment values.
///
/// Matches `$NAME` or `${NAME}` where NAME mentions a key, secret, token,
/// password, or credential, any `printenv`, and a bare `env` dump.
pub fn reads_sensitive_env(command: &str) -> bool {
    if SENSITIVE_VAR_REF.is_match(command) {
        return true;
    }

    split_segments(command).iter().any(|segment| {
        let Some(idx) = program_index(segment) else {
            return false;
        };
        match basename(&segment[idx]) {
            "printenv" => true,
            "env" => segment[idx + 1..].iter().all(|arg| arg.starts_with('-')),
            _ => false,
        }
    })
}

/// Network-capable programs named anywhere in the command
pub fn network_programs(command: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for segment in split_segments(command) {
        for word in &segment {
            if let Some(program) = NETWORK_PROGRAMS.iter().find(|p| **p == basename(word)) {
                if !found.contains(program) {
                    found.push(*program);
                }
            }
        }
    }
    found
}
