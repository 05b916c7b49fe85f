use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    secrecy::ExposeSecret,
    synapse_config::{Severity, SynapseConfig},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "synapse", about = "Synapse: Discord relay bot backed by Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./synapse.toml, then the user config dir).
    #[arg(long, global = true, env = "SYNAPSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Connect to Discord and relay messages (default when no subcommand is provided).
    Run,
    /// Validate the configuration and print diagnostics.
    CheckConfig,
    /// List Gemini models that support content generation.
    Models,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file (explicit or discovered) and apply env overrides.
fn load_settings(path: Option<&Path>) -> anyhow::Result<SynapseConfig> {
    let mut config = match path {
        Some(path) => synapse_config::load_config(path)?,
        None => synapse_config::discover_and_load()?,
    };
    synapse_config::apply_env_overrides(&mut config);
    Ok(config)
}

/// Print diagnostics; returns `false` when any of them is an error.
fn report_diagnostics(config: &SynapseConfig) -> bool {
    let result = synapse_config::validate(config);
    for diagnostic in &result.diagnostics {
        match diagnostic.severity {
            Severity::Error => eprintln!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
        }
    }
    !result.has_errors()
}

async fn run(config: SynapseConfig) -> anyhow::Result<()> {
    anyhow::ensure!(
        report_diagnostics(&config),
        "invalid configuration, run `synapse check-config` for details"
    );

    let models = synapse_agents::gemini_models(&config.gemini);
    info!(
        text_model = models.text.id(),
        image_model = models.image.id(),
        "gemini models configured"
    );

    let bot = synapse_discord::start_bot(&config, models)
        .await
        .context("failed to start discord relay")?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    bot.shutdown().await;
    Ok(())
}

fn check_config(config: &SynapseConfig) -> anyhow::Result<()> {
    let result = synapse_config::validate(config);
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }
    println!(
        "{} error(s), {} warning(s)",
        result.count(Severity::Error),
        result.count(Severity::Warning)
    );
    anyhow::ensure!(!result.has_errors(), "configuration has errors");
    Ok(())
}

async fn list_models(config: &SynapseConfig) -> anyhow::Result<()> {
    let api_key = config.gemini.api_key.expose_secret();
    anyhow::ensure!(!api_key.is_empty(), "gemini.api_key is not set");

    let models = synapse_agents::providers::gemini::list_models(
        api_key,
        config.gemini.base_url.trim_end_matches('/'),
    )
    .await?;
    for model in &models {
        println!("{:<40} {}", model.model_id(), model.display_name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "synapse starting");

    let config = load_settings(cli.config.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::CheckConfig) => check_config(&config),
        Some(Commands::Models) => list_models(&config).await,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["synapse"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from([
            "synapse",
            "check-config",
            "--config",
            "/tmp/synapse.toml",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/synapse.toml")));
        assert!(cli.json_logs);
    }

    #[test]
    fn load_settings_reads_explicit_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[discord]\ncommand_prefix = \"?\"").unwrap();

        let config = load_settings(Some(file.path())).unwrap();
        assert_eq!(config.discord.command_prefix, "?");
    }

    #[test]
    fn load_settings_fails_on_missing_explicit_file() {
        assert!(load_settings(Some(Path::new("/nonexistent/synapse.toml"))).is_err());
    }

    #[test]
    fn load_settings_reports_parse_errors() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[discord\ncommand_prefix = ").unwrap();

        let err = load_settings(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn check_config_rejects_defaults() {
        assert!(check_config(&SynapseConfig::default()).is_err());
    }
}
