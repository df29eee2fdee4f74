use chains_api::TopicUrl;
use storage_pubsub::resolve;

use crate::config::{ChainsConfig, ResolveArgs};
use crate::error::AppError;

pub fn run(args: ResolveArgs) -> Result<(), AppError> {
    let config = ChainsConfig::load(&args.config.config)?;
    let url = topic_url(&config)?;
    println!("{url}");
    Ok(())
}

/// Topic URL `[storage.pubsub]` resolves to.
pub fn topic_url(config: &ChainsConfig) -> Result<TopicUrl, AppError> {
    let url = resolve(&config.storage.pubsub)?;
    tracing::debug!(provider = %config.storage.pubsub.provider, url = %url, "resolved topic");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_configured_topic() {
        let config = ChainsConfig::parse(
            r#"
            [storage.pubsub]
            provider = "gcppubsub"
            topic = "attestations"

            [storage.pubsub.gcp]
            project = "acme"
            "#,
        )
        .unwrap();
        let url = topic_url(&config).unwrap();
        assert_eq!(url.to_string(), "gcppubsub://projects/acme/topics/attestations");
    }

    #[test]
    fn empty_config_is_an_error() {
        let err = topic_url(&ChainsConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "pubsub provider is empty");
    }
}
