//! tool-guardrails - Guardrails for AI agent tool calls
//!
//! # Usage
//!
//! ```bash
//! # As an agent PreToolUse hook (reads JSON from stdin, writes JSON to stdout)
//! echo '{"tool_name":"bash","tool_input":{"command":"rm -rf /"}}' | tool-guardrails hook
//!
//! # Classify a command
//! tool-guardrails classify "git push --force origin main"
//!
//! # Redact a log before sharing it
//! tool-guardrails sanitize --mask-paths < build.log
//! ```

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tool_guardrails::{
    config::Config,
    input::HookInput,
    logging,
    output::{Decision, HookOutput},
    GuardrailPipeline, MaskOptions,
};

/// Risk classification and secret masking for agent tool calls.
#[derive(Parser)]
#[command(name = "tool-guardrails")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "TOOL_GUARDRAILS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "tool_guardrails=trace".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a shell command and print the result as JSON.
    Classify {
        /// The command to classify.
        command: String,
    },

    /// Scan stdin for secrets and print the matches as JSON.
    Detect,

    /// Mask secrets in stdin and print the result.
    Sanitize {
        /// Truncate output to this many bytes.
        #[arg(long)]
        max_length: Option<usize>,

        /// Collapse home directories to `~`.
        #[arg(long)]
        mask_paths: bool,

        /// Leave email addresses alone.
        #[arg(long)]
        no_emails: bool,

        /// Leave IP addresses alone.
        #[arg(long)]
        no_ips: bool,
    },

    /// Answer an agent PreToolUse hook from stdin.
    Hook,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {} (using defaults)", e);
            Config::default()
        }
    };

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    let pipeline = match GuardrailPipeline::new(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            // SECURITY: the hook must still answer, and it answers deny
            if matches!(cli.command, Commands::Hook) {
                emit(&HookOutput::deny("config-error", &e.to_string()).to_json());
            }
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Classify { command } => {
            let validation = pipeline.classify(&command);
            match serde_json::to_string_pretty(&validation) {
                Ok(json) => emit(&json),
                Err(e) => return fail(&e),
            }
            if validation.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Commands::Detect => {
            let text = match read_stdin() {
                Ok(text) => text,
                Err(e) => return fail(&e),
            };
            let detection = pipeline.detector().detect(&text);
            match serde_json::to_string_pretty(&detection) {
                Ok(json) => emit(&json),
                Err(e) => return fail(&e),
            }
            ExitCode::SUCCESS
        }
        Commands::Sanitize {
            max_length,
            mask_paths,
            no_emails,
            no_ips,
        } => {
            let text = match read_stdin() {
                Ok(text) => text,
                Err(e) => return fail(&e),
            };
            let options = sanitize_options(
                pipeline.mask_options(),
                max_length,
                mask_paths,
                no_emails,
                no_ips,
            );
            let result = pipeline.sanitize_with(&text, &options);
            tracing::debug!(
                masked = result.mask_count,
                truncated = result.truncated,
                "sanitized input"
            );
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let _ = handle.write_all(result.text.as_bytes());
            let _ = handle.flush();
            ExitCode::SUCCESS
        }
        Commands::Hook => {
            let output = match read_stdin() {
                Ok(json) => answer_hook(&pipeline, &json),
                Err(e) => HookOutput::deny("read-error", &format!("Failed to read hook input: {}", e)),
            };
            emit(&output.to_json());
            ExitCode::SUCCESS
        }
    }
}

fn answer_hook(pipeline: &GuardrailPipeline, json: &str) -> HookOutput {
    // No input = nothing to check, allow
    if json.trim().is_empty() {
        return HookOutput::allow();
    }

    let input = match HookInput::from_json(json) {
        Ok(input) => input,
        Err(e) => {
            // SECURITY: Fail closed on parse errors
            // Malformed input could be an evasion attempt
            eprintln!("Error: Failed to parse input (denying): {}", e);
            return HookOutput::deny("parse-error", &format!("Failed to parse hook input: {}", e));
        }
    };

    let Some(command) = input
        .tool_input
        .command()
        .filter(|_| pipeline.is_shell_tool(&input.tool_name))
    else {
        tracing::debug!(tool = %input.tool_name, "not a shell tool, allowing");
        return HookOutput::allow();
    };

    let validation = pipeline.classify(command);
    pipeline.record_outcome(command, &validation, None, input.session_id.as_deref());
    HookOutput::from_decision(&Decision::from_validation(&validation))
}

fn sanitize_options(
    base: &MaskOptions,
    max_length: Option<usize>,
    mask_paths: bool,
    no_emails: bool,
    no_ips: bool,
) -> MaskOptions {
    let mut options = base.clone();
    if let Some(limit) = max_length {
        options.max_length = Some(limit);
    }
    if mask_paths {
        options.mask_paths = true;
        options.home_dir = dirs::home_dir().map(|p| p.to_string_lossy().into_owned());
    }
    options.mask_emails &= !no_emails;
    options.mask_ips &= !no_ips;
    options
}

fn read_stdin() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    Ok(input)
}

fn emit(text: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", text);
    let _ = handle.flush();
}

fn fail(err: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::FAILURE
}
