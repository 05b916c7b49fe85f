/// Config schema types (discord, gemini, conversation).
use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
    synapse_common::{ChannelId, Turn},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    pub discord: DiscordConfig,
    pub gemini: GeminiConfig,
    pub conversation: ConversationConfig,
}

/// Discord bot account and relay channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal.
    pub token: Secret<String>,
    /// The only channel the bot relays to the model.
    pub channel_id: Option<ChannelId>,
    /// Prefix for text commands (`!forget`).
    pub command_prefix: String,
    /// Maximum characters per outbound reply. Discord caps messages at 2000.
    pub reply_chunk_chars: usize,
    /// "Playing …" presence shown once connected. `None` leaves it unset.
    pub activity: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            channel_id: None,
            command_prefix: "!".into(),
            reply_chunk_chars: 1700,
            activity: Some("Discord".into()),
        }
    }
}

/// Gemini API access and per-model generation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    /// Upper bound on one `generateContent` exchange.
    pub request_timeout_secs: u64,
    /// Model used for text conversations.
    pub text: ModelConfig,
    /// Model used for single-shot image + text prompts.
    pub image: ModelConfig,
    /// Content-safety thresholds sent with every request.
    pub safety: Vec<SafetySetting>,
}

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            base_url: DEFAULT_GEMINI_BASE_URL.into(),
            request_timeout_secs: 60,
            text: ModelConfig::default(),
            image: ModelConfig {
                temperature: 0.4,
                top_k: 32,
                ..ModelConfig::default()
            },
            safety: HarmCategory::ALL
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: HarmBlockThreshold::BlockNone,
                })
                .collect(),
        }
    }
}

/// Model id plus generation parameters.
///
/// Fields missing from a `[gemini.text]` or `[gemini.image]` section fall
/// back to the text-model defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            temperature: 0.9,
            top_p: 1.0,
            top_k: 1,
            max_output_tokens: 512,
        }
    }
}

/// Harm categories accepted by the Gemini safety filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [Self; 4] = [
        Self::Harassment,
        Self::HateSpeech,
        Self::SexuallyExplicit,
        Self::DangerousContent,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Conversation lifecycle: idle eviction and the scripted preamble.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// A conversation idle for longer than this is forgotten.
    pub idle_timeout_secs: u64,
    /// How often the reaper looks for idle conversations.
    pub reap_interval_secs: u64,
    /// Turns every new conversation is seeded with.
    pub preamble: Vec<Turn>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            reap_interval_secs: 300,
            preamble: default_preamble(),
        }
    }
}

/// Scripted identity exchange the bot starts every conversation with.
#[must_use]
pub fn default_preamble() -> Vec<Turn> {
    vec![
        Turn::user("who are you"),
        Turn::model(
            "You are Synapse, Support Assistant AI ChatBot of Kito. Your purpose is to support \
             people with their issues and doubts!",
        ),
        Turn::user("about Kito"),
        Turn::model(
            "Kito AKA Krtish Vaidhyan is an AI / ML Developer studying in class 12th and \
             preparing for JEE entrance exam.",
        ),
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, synapse_common::Role};

    #[test]
    fn defaults_match_relay_bot() {
        let cfg = SynapseConfig::default();
        assert_eq!(cfg.discord.command_prefix, "!");
        assert_eq!(cfg.discord.reply_chunk_chars, 1700);
        assert!(cfg.discord.channel_id.is_none());
        assert_eq!(cfg.gemini.text.top_k, 1);
        assert_eq!(cfg.gemini.image.top_k, 32);
        assert!((cfg.gemini.image.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(cfg.gemini.safety.len(), 4);
        assert!(
            cfg.gemini
                .safety
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockNone)
        );
        assert_eq!(cfg.conversation.idle_timeout_secs, 300);
        assert_eq!(cfg.conversation.preamble.len(), 4);
        assert_eq!(cfg.conversation.preamble[0].role, Role::User);
        assert_eq!(cfg.conversation.preamble[3].role, Role::Model);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [discord]
            token = "abc"
            channel_id = 1183754224384213062

            [gemini]
            api_key = "key"

            [gemini.image]
            model = "gemini-1.5-pro"

            [[gemini.safety]]
            category = "HARM_CATEGORY_HARASSMENT"
            threshold = "BLOCK_MEDIUM_AND_ABOVE"
        "#;
        let cfg: SynapseConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "abc");
        assert_eq!(
            cfg.discord.channel_id,
            Some(ChannelId(1_183_754_224_384_213_062))
        );
        assert_eq!(cfg.gemini.image.model, "gemini-1.5-pro");
        assert_eq!(cfg.gemini.text.model, "gemini-2.0-flash");
        assert_eq!(cfg.gemini.safety, vec![SafetySetting {
            category: HarmCategory::Harassment,
            threshold: HarmBlockThreshold::BlockMediumAndAbove,
        }]);
        assert_eq!(cfg.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let mut cfg = SynapseConfig::default();
        cfg.discord.token = Secret::new("super-secret-token".into());
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret-token"));
    }
}
