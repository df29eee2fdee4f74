use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use storage_pubsub::PubSubStorageConfig;

use crate::error::AppError;

#[derive(Parser)]
#[command(name = "chains-publisher", about = "Inspect where signed attestations are published")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the topic URL the configuration resolves to
    Resolve(ResolveArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "chains.toml", env = "CHAINS_CONFIG")]
    pub config: String,
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

// ---- TOML Config ----

#[derive(Debug, Default, Deserialize)]
pub struct ChainsConfig {
    #[serde(default)]
    pub storage: StorageConfigs,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfigs {
    #[serde(default)]
    pub pubsub: PubSubStorageConfig,
}

impl ChainsConfig {
    pub fn load(path: &str) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| AppError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use storage_pubsub::MessageBody;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_pubsub_section() {
        let cfg = ChainsConfig::parse(
            r#"
            [storage.pubsub]
            provider = "inmemory"
            topic = "test"
            message_body = "payload"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.pubsub.provider, "inmemory");
        assert_eq!(cfg.storage.pubsub.topic, "test");
        assert_eq!(cfg.storage.pubsub.message_body, MessageBody::Payload);
    }

    #[test]
    fn missing_section_defaults_to_empty() {
        let cfg = ChainsConfig::parse("").unwrap();
        assert_eq!(cfg.storage.pubsub, PubSubStorageConfig::default());
    }

    #[test]
    fn only_resolve_is_exposed() {
        assert!(Cli::try_parse_from(["chains-publisher", "publish", "--signature", "sig"]).is_err());

        let cli = Cli::try_parse_from(["chains-publisher", "resolve", "--config", "ci.toml"]).unwrap();
        let Commands::Resolve(args) = cli.command;
        assert_eq!(args.config.config, "ci.toml");
    }
}
