use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::SynapseConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "synapse.toml",
    "synapse.yaml",
    "synapse.yml",
    "synapse.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SynapseConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./synapse.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/synapse/synapse.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SynapseConfig::default()` if no config file is found, so a bot
/// configured purely through the environment still starts. A file that is
/// found but cannot be read or parsed is an error.
pub fn discover_and_load() -> anyhow::Result<SynapseConfig> {
    load_discovered(find_config_file())
}

fn load_discovered(path: Option<PathBuf>) -> anyhow::Result<SynapseConfig> {
    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(SynapseConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

/// Override file values with `DISCORD_BOT_TOKEN`, `GEMINI_API_KEY` and
/// `SYNAPSE_CHANNEL_ID` when they are set and non-empty.
pub fn apply_env_overrides(config: &mut SynapseConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut SynapseConfig, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = lookup("DISCORD_BOT_TOKEN") {
        config.discord.token = Secret::new(token);
    }
    if let Some(key) = lookup("GEMINI_API_KEY") {
        config.gemini.api_key = Secret::new(key);
    }
    if let Some(raw) = lookup("SYNAPSE_CHANNEL_ID") {
        match raw.parse() {
            Ok(id) => config.discord.channel_id = Some(id),
            Err(e) => warn!(error = %e, "ignoring SYNAPSE_CHANNEL_ID"),
        }
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/synapse/
    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/synapse/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "synapse").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SynapseConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, synapse_common::ChannelId};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synapse.toml");
        std::fs::write(
            &path,
            "[discord]\ntoken = \"tok\"\nchannel_id = 42\nreply_chunk_chars = 1000\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "tok");
        assert_eq!(cfg.discord.channel_id, Some(ChannelId(42)));
        assert_eq!(cfg.discord.reply_chunk_chars, 1000);
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("synapse.yaml");
        std::fs::write(&yaml, "conversation:\n  idle_timeout_secs: 60\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().conversation.idle_timeout_secs, 60);

        let json = dir.path().join("synapse.json");
        std::fs::write(&json, r#"{"discord": {"command_prefix": "?"}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().discord.command_prefix, "?");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synapse.ini");
        std::fs::write(&path, "token=abc").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn malformed_file_names_path_and_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synapse.toml");
        std::fs::write(&path, "[discord\ntoken = 1\n").unwrap();

        let err = load_discovered(Some(path.clone())).unwrap_err().to_string();
        assert!(err.contains("failed to parse"));
        assert!(err.contains(&path.display().to_string()));
    }

    #[test]
    fn no_discovered_file_means_defaults() {
        let cfg = load_discovered(None).unwrap();
        assert_eq!(
            cfg.discord.command_prefix,
            SynapseConfig::default().discord.command_prefix
        );
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = SynapseConfig::default();
        cfg.discord.token = Secret::new("from-file".into());
        apply_env_overrides_with(&mut cfg, |name| match name {
            "DISCORD_BOT_TOKEN" => Some("from-env".into()),
            "GEMINI_API_KEY" => Some("   ".into()),
            "SYNAPSE_CHANNEL_ID" => Some("7".into()),
            _ => None,
        });
        assert_eq!(cfg.discord.token.expose_secret(), "from-env");
        assert_eq!(cfg.gemini.api_key.expose_secret(), "");
        assert_eq!(cfg.discord.channel_id, Some(ChannelId(7)));
    }

    #[test]
    fn invalid_channel_override_is_ignored() {
        let mut cfg = SynapseConfig::default();
        cfg.discord.channel_id = Some(ChannelId(1));
        apply_env_overrides_with(&mut cfg, |name| {
            (name == "SYNAPSE_CHANNEL_ID").then(|| "general".to_string())
        });
        assert_eq!(cfg.discord.channel_id, Some(ChannelId(1)));
    }
}
