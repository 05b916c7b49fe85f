//! Configuration loading, validation, and env substitution.
//!
//! Config files: `synapse.toml`, `synapse.yaml`, or `synapse.json`
//! Searched in `./` then `~/.config/synapse/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        ConversationConfig, DiscordConfig, GeminiConfig, HarmBlockThreshold, HarmCategory,
        ModelConfig, SafetySetting, SynapseConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
