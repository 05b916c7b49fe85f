//! Semantic validation of a loaded configuration.
//!
//! Parsing already rejects malformed files; this pass catches values that
//! deserialize fine but would make the bot misbehave at runtime.

use {secrecy::ExposeSecret, synapse_common::Role};

use crate::schema::{ModelConfig, SynapseConfig};

/// Discord refuses messages longer than this many characters.
pub const DISCORD_MAX_MESSAGE_CHARS: usize = 2000;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "discord.reply_chunk_chars"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a configuration, returning every problem found.
#[must_use]
pub fn validate(config: &SynapseConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.discord.token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "discord.token",
            "bot token is required (or set DISCORD_BOT_TOKEN)",
        );
    }
    match config.discord.channel_id {
        None => result.push(
            Severity::Error,
            "discord.channel_id",
            "relay channel is required (or set SYNAPSE_CHANNEL_ID)",
        ),
        Some(id) if id.get() == 0 => result.push(
            Severity::Error,
            "discord.channel_id",
            "channel id must be non-zero",
        ),
        Some(_) => {},
    }
    if config.discord.command_prefix.trim().is_empty() {
        result.push(
            Severity::Error,
            "discord.command_prefix",
            "command prefix must not be empty",
        );
    }
    let chunk = config.discord.reply_chunk_chars;
    if chunk == 0 || chunk > DISCORD_MAX_MESSAGE_CHARS {
        result.push(
            Severity::Error,
            "discord.reply_chunk_chars",
            format!("must be between 1 and {DISCORD_MAX_MESSAGE_CHARS}, got {chunk}"),
        );
    }

    if config.gemini.api_key.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "gemini.api_key",
            "API key is required (or set GEMINI_API_KEY)",
        );
    }
    if !config.gemini.base_url.starts_with("http://")
        && !config.gemini.base_url.starts_with("https://")
    {
        result.push(
            Severity::Error,
            "gemini.base_url",
            format!("not an http(s) URL: {}", config.gemini.base_url),
        );
    }
    if config.gemini.request_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "gemini.request_timeout_secs",
            "must be greater than zero",
        );
    }
    check_model(&config.gemini.text, "gemini.text", &mut result);
    check_model(&config.gemini.image, "gemini.image", &mut result);
    if config.gemini.safety.is_empty() {
        result.push(
            Severity::Warning,
            "gemini.safety",
            "no safety settings; the API defaults apply",
        );
    }

    let conv = &config.conversation;
    if conv.idle_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "conversation.idle_timeout_secs",
            "must be greater than zero",
        );
    }
    if conv.reap_interval_secs == 0 {
        result.push(
            Severity::Error,
            "conversation.reap_interval_secs",
            "must be greater than zero",
        );
    }
    if conv
        .preamble
        .windows(2)
        .any(|pair| pair[0].role == pair[1].role)
    {
        result.push(
            Severity::Error,
            "conversation.preamble",
            "turns must alternate between user and model",
        );
    }
    if conv.preamble.last().is_some_and(|t| t.role == Role::User) {
        result.push(
            Severity::Error,
            "conversation.preamble",
            "must end with a model turn",
        );
    }

    result
}

fn check_model(model: &ModelConfig, path: &str, result: &mut ValidationResult) {
    if model.model.trim().is_empty() {
        result.push(Severity::Error, format!("{path}.model"), "model id is required");
    }
    if !(0.0..=2.0).contains(&model.temperature) {
        result.push(
            Severity::Error,
            format!("{path}.temperature"),
            format!("must be within 0.0..=2.0, got {}", model.temperature),
        );
    }
    if !(0.0..=1.0).contains(&model.top_p) {
        result.push(
            Severity::Error,
            format!("{path}.top_p"),
            format!("must be within 0.0..=1.0, got {}", model.top_p),
        );
    }
    if model.max_output_tokens == 0 {
        result.push(
            Severity::Error,
            format!("{path}.max_output_tokens"),
            "must be greater than zero",
        );
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        secrecy::Secret,
        synapse_common::{ChannelId, Turn},
    };

    fn valid_config() -> SynapseConfig {
        let mut cfg = SynapseConfig::default();
        cfg.discord.token = Secret::new("token".into());
        cfg.discord.channel_id = Some(ChannelId(1));
        cfg.gemini.api_key = Secret::new("key".into());
        cfg
    }

    fn paths(result: &ValidationResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn complete_config_is_clean() {
        let result = validate(&valid_config());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn default_config_misses_credentials() {
        let result = validate(&SynapseConfig::default());
        assert!(result.has_errors());
        assert_eq!(result.count(Severity::Error), 3);
        assert_eq!(paths(&result), vec![
            "discord.token",
            "discord.channel_id",
            "gemini.api_key"
        ]);
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let mut cfg = valid_config();
        cfg.gemini.request_timeout_secs = 0;
        assert_eq!(paths(&validate(&cfg)), vec!["gemini.request_timeout_secs"]);
    }

    #[test]
    fn zero_channel_id_is_rejected() {
        let mut cfg = valid_config();
        cfg.discord.channel_id = Some(ChannelId(0));
        assert_eq!(paths(&validate(&cfg)), vec!["discord.channel_id"]);
    }

    #[test]
    fn chunk_size_must_fit_discord_limit() {
        let mut cfg = valid_config();
        cfg.discord.reply_chunk_chars = 2001;
        assert_eq!(paths(&validate(&cfg)), vec!["discord.reply_chunk_chars"]);

        cfg.discord.reply_chunk_chars = 0;
        assert!(validate(&cfg).has_errors());

        cfg.discord.reply_chunk_chars = 2000;
        assert!(!validate(&cfg).has_errors());
    }

    #[test]
    fn model_parameters_are_range_checked() {
        let mut cfg = valid_config();
        cfg.gemini.image.temperature = 3.0;
        cfg.gemini.text.max_output_tokens = 0;
        assert_eq!(paths(&validate(&cfg)), vec![
            "gemini.text.max_output_tokens",
            "gemini.image.temperature"
        ]);
    }

    #[test]
    fn preamble_must_alternate_and_end_on_model() {
        let mut cfg = valid_config();
        cfg.conversation.preamble = vec![Turn::user("a"), Turn::user("b")];
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);

        cfg.conversation.preamble = Vec::new();
        assert!(!validate(&cfg).has_errors());
    }

    #[test]
    fn empty_safety_is_only_a_warning() {
        let mut cfg = valid_config();
        cfg.gemini.safety.clear();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "warning: gemini.safety: no safety settings; the API defaults apply"
        );
    }
}
