//! Sensitive-data catalog
//!
//! Ordered most specific first: provider-prefixed formats come before the
//! generic `key = value` fallbacks. The detector lets the first pattern that
//! claims a span win, so reordering this list changes detection labels on
//! ambiguous text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of built-in secret types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveType {
    PrivateKey,
    AnthropicApiKey,
    OpenaiApiKey,
    AwsAccessKey,
    AwsSecretKey,
    GithubPat,
    GithubFineGrainedPat,
    GithubToken,
    GitlabToken,
    SlackToken,
    SlackWebhook,
    StripeKey,
    GoogleApiKey,
    TwilioKey,
    SendgridKey,
    NpmToken,
    PypiToken,
    DockerToken,
    HuggingfaceToken,
    ShopifyToken,
    MailgunKey,
    AzureStorageKey,
    JwtToken,
    BearerToken,
    BasicAuth,
    DatabaseUrl,
    UrlCredentials,
    ApiKey,
    Password,
    GenericSecret,
}

impl SensitiveType {
    /// Snake-case tag reported in matches
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveType::PrivateKey => "private_key",
            SensitiveType::AnthropicApiKey => "anthropic_api_key",
            SensitiveType::OpenaiApiKey => "openai_api_key",
            SensitiveType::AwsAccessKey => "aws_access_key",
            SensitiveType::AwsSecretKey => "aws_secret_key",
            SensitiveType::GithubPat => "github_pat",
            SensitiveType::GithubFineGrainedPat => "github_fine_grained_pat",
            SensitiveType::GithubToken => "github_token",
            SensitiveType::GitlabToken => "gitlab_token",
            SensitiveType::SlackToken => "slack_token",
            SensitiveType::SlackWebhook => "slack_webhook",
            SensitiveType::StripeKey => "stripe_key",
            SensitiveType::GoogleApiKey => "google_api_key",
            SensitiveType::TwilioKey => "twilio_key",
            SensitiveType::SendgridKey => "sendgrid_key",
            SensitiveType::NpmToken => "npm_token",
            SensitiveType::PypiToken => "pypi_token",
            SensitiveType::DockerToken => "docker_token",
            SensitiveType::HuggingfaceToken => "huggingface_token",
            SensitiveType::ShopifyToken => "shopify_token",
            SensitiveType::MailgunKey => "mailgun_key",
            SensitiveType::AzureStorageKey => "azure_storage_key",
            SensitiveType::JwtToken => "jwt_token",
            SensitiveType::BearerToken => "bearer_token",
            SensitiveType::BasicAuth => "basic_auth",
            SensitiveType::DatabaseUrl => "database_url",
            SensitiveType::UrlCredentials => "url_credentials",
            SensitiveType::ApiKey => "api_key",
            SensitiveType::Password => "password",
            SensitiveType::GenericSecret => "generic_secret",
        }
    }
}

impl fmt::Display for SensitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How certain a match is to be a real credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

/// How much of the original value survives masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskStyle {
    /// Constant marker, nothing retained
    #[default]
    Full,
    /// Short prefix and suffix retained, middle redacted
    Partial,
    /// Structural prefix (provider sigil or URL scheme) retained
    Prefix,
}

/// A built-in sensitive pattern definition
#[derive(Debug, Clone)]
pub struct SensitivePattern {
    pub kind: SensitiveType,

    /// Regex pattern
    pub pattern: &'static str,

    /// Capture group whose span is reported and masked (0 = whole match)
    pub group: usize,

    pub confidence: Confidence,

    pub mask_style: MaskStyle,

    /// Known leading tokens kept by `MaskStyle::Prefix`, longest first
    pub sigils: &'static [&'static str],
}

impl SensitivePattern {
    const fn new(
        kind: SensitiveType,
        confidence: Confidence,
        mask_style: MaskStyle,
        pattern: &'static str,
    ) -> Self {
        Self {
            kind,
            pattern,
            group: 0,
            confidence,
            mask_style,
            sigils: &[],
        }
    }

    /// Report and mask only the value capture group
    const fn value_group(mut self) -> Self {
        self.group = 1;
        self
    }

    const fn sigils(mut self, sigils: &'static [&'static str]) -> Self {
        self.sigils = sigils;
        self
    }
}

use Confidence::{High, Low, Medium};
use MaskStyle::{Full, Partial, Prefix};

/// Built-in catalog in evaluation order
pub const SENSITIVE_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern::new(
        SensitiveType::PrivateKey,
        High,
        Full,
        r"-----BEGIN (?:[A-Z]+ )*PRIVATE KEY-----(?:[\s\S]*?-----END (?:[A-Z]+ )*PRIVATE KEY-----)?",
    ),
    SensitivePattern::new(
        SensitiveType::AnthropicApiKey,
        High,
        Prefix,
        r"\bsk-ant-[A-Za-z0-9_-]{20,}",
    )
    .sigils(&["sk-ant-"]),
    SensitivePattern::new(
        SensitiveType::OpenaiApiKey,
        High,
        Prefix,
        r"\bsk-(?:proj-|svcacct-|admin-)?[A-Za-z0-9_-]{32,}",
    )
    .sigils(&["sk-svcacct-", "sk-admin-", "sk-proj-", "sk-"]),
    SensitivePattern::new(
        SensitiveType::AwsAccessKey,
        High,
        Partial,
        r"\b(?:AKIA|ASIA|ABIA|ACCA)[0-9A-Z]{16}\b",
    ),
    SensitivePattern::new(
        SensitiveType::AwsSecretKey,
        High,
        Full,
        r#"(?i)aws_?secret_?(?:access_?)?key["']?\s*[=:]\s*["']?([A-Za-z0-9/+]{40})"#,
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::GithubFineGrainedPat,
        High,
        Partial,
        r"\bgithub_pat_[A-Za-z0-9_]{22,}",
    ),
    SensitivePattern::new(
        SensitiveType::GithubPat,
        High,
        Partial,
        r"\bghp_[A-Za-z0-9]{36}\b",
    ),
    SensitivePattern::new(
        SensitiveType::GithubToken,
        High,
        Partial,
        r"\bgh[ousr]_[A-Za-z0-9]{36}\b",
    ),
    SensitivePattern::new(
        SensitiveType::GitlabToken,
        High,
        Prefix,
        r"\bglpat-[A-Za-z0-9_-]{20,}",
    )
    .sigils(&["glpat-"]),
    SensitivePattern::new(
        SensitiveType::SlackToken,
        High,
        Prefix,
        r"\bxox[baprse]-[A-Za-z0-9-]{10,}",
    )
    .sigils(&["xoxb-", "xoxa-", "xoxp-", "xoxr-", "xoxs-", "xoxe-"]),
    SensitivePattern::new(
        SensitiveType::SlackWebhook,
        High,
        Prefix,
        r"https://hooks\.slack\.com/services/T[A-Z0-9]+/B[A-Z0-9]+/[A-Za-z0-9]+",
    )
    .sigils(&["https://hooks.slack.com/services/"]),
    SensitivePattern::new(
        SensitiveType::StripeKey,
        High,
        Prefix,
        r"\b(?:sk|rk|pk)_(?:live|test)_[A-Za-z0-9]{24,}",
    )
    .sigils(&["sk_live_", "sk_test_", "rk_live_", "rk_test_", "pk_live_", "pk_test_"]),
    SensitivePattern::new(
        SensitiveType::GoogleApiKey,
        High,
        Partial,
        r"\bAIza[0-9A-Za-z_-]{35}",
    ),
    SensitivePattern::new(
        SensitiveType::TwilioKey,
        Medium,
        Partial,
        r"\bSK[0-9a-fA-F]{32}\b",
    ),
    SensitivePattern::new(
        SensitiveType::SendgridKey,
        High,
        Prefix,
        r"\bSG\.[A-Za-z0-9_-]{22}\.[A-Za-z0-9_-]{43}",
    )
    .sigils(&["SG."]),
    SensitivePattern::new(
        SensitiveType::NpmToken,
        High,
        Prefix,
        r"\bnpm_[A-Za-z0-9]{36}\b",
    )
    .sigils(&["npm_"]),
    SensitivePattern::new(
        SensitiveType::PypiToken,
        High,
        Prefix,
        r"\bpypi-AgEIcHlwaS5vcmc[A-Za-z0-9_-]{50,}",
    )
    .sigils(&["pypi-"]),
    SensitivePattern::new(
        SensitiveType::DockerToken,
        High,
        Prefix,
        r"\bdckr_pat_[A-Za-z0-9_-]{20,}",
    )
    .sigils(&["dckr_pat_"]),
    SensitivePattern::new(
        SensitiveType::HuggingfaceToken,
        High,
        Prefix,
        r"\bhf_[A-Za-z0-9]{34,}\b",
    )
    .sigils(&["hf_"]),
    SensitivePattern::new(
        SensitiveType::ShopifyToken,
        High,
        Prefix,
        r"\bshp(?:at|ca|pa|ss)_[a-fA-F0-9]{32}\b",
    )
    .sigils(&["shpat_", "shpca_", "shppa_", "shpss_"]),
    SensitivePattern::new(
        SensitiveType::MailgunKey,
        Medium,
        Prefix,
        r"\bkey-[0-9a-f]{32}\b",
    )
    .sigils(&["key-"]),
    SensitivePattern::new(
        SensitiveType::AzureStorageKey,
        High,
        Full,
        r"(?i)AccountKey=([A-Za-z0-9+/=]{40,})",
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::JwtToken,
        Medium,
        Partial,
        r"\beyJ[A-Za-z0-9_-]{8,}\.eyJ[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}",
    ),
    SensitivePattern::new(
        SensitiveType::BearerToken,
        Medium,
        Full,
        r"(?i)\bbearer\s+([A-Za-z0-9_\-.=~+/]{16,})",
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::BasicAuth,
        Medium,
        Full,
        r#"(?i)authorization["']?\s*[:=]\s*["']?basic\s+([A-Za-z0-9+/]{8,}={0,2})"#,
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::DatabaseUrl,
        High,
        Prefix,
        r#"(?i)\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|rediss?|amqps?|mssql|sqlserver)://[^\s:/@]+:[^\s@\[][^\s@]*@[^\s"'<>]+"#,
    ),
    SensitivePattern::new(
        SensitiveType::UrlCredentials,
        Medium,
        Prefix,
        r#"\b[a-zA-Z][a-zA-Z0-9+.-]*://[^\s:/@]+:[^\s@/\[][^\s@/]*@[^\s"'<>]+"#,
    ),
    SensitivePattern::new(
        SensitiveType::ApiKey,
        Medium,
        Full,
        r#"(?i)(?:api[_-]?key|apikey)["']?\s*[=:]\s*["']?([A-Za-z0-9_\-.]{16,})"#,
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::Password,
        Medium,
        Full,
        r#"(?i)(?:^|[^a-z0-9])(?:password|passwd|pwd)["']?\s*[=:]\s*["']?([^\s"'\[<>(){}&,;]{8,})"#,
    )
    .value_group(),
    SensitivePattern::new(
        SensitiveType::GenericSecret,
        Low,
        Full,
        r#"(?i)(?:secret|token|credential)s?[a-z0-9_-]*["']?\s*[=:]\s*["']?([^\s"'\[<>(){}&,;]{12,})"#,
    )
    .value_group(),
];

/// Built-in catalog in evaluation order
pub fn sensitive_patterns() -> &'static [SensitivePattern] {
    SENSITIVE_PATTERNS
}
