use chains_api::TopicUrl;

use crate::config::PubSubStorageConfig;
use crate::error::ConfigError;

/// Supported message-bus providers and their URL schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    InMemory,
    Kafka,
    GcpPubSub,
    Nats,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Provider::InMemory, Provider::Kafka, Provider::GcpPubSub, Provider::Nats];

    /// Configuration name of the provider.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::InMemory => "inmemory",
            Provider::Kafka => "kafka",
            Provider::GcpPubSub => "gcppubsub",
            Provider::Nats => "nats",
        }
    }

    /// URL scheme the driver for this provider registers under.
    pub fn scheme(&self) -> &'static str {
        match self {
            Provider::InMemory => "mem",
            Provider::Kafka => "kafka",
            Provider::GcpPubSub => "gcppubsub",
            Provider::Nats => "nats",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConfigError::EmptyProvider);
        }
        match s.to_ascii_lowercase().as_str() {
            "inmemory" | "mem" => Ok(Provider::InMemory),
            "kafka" => Ok(Provider::Kafka),
            "gcppubsub" | "gcp" => Ok(Provider::GcpPubSub),
            "nats" => Ok(Provider::Nats),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Map the configured provider and topic to the URL the bus mux opens.
///
/// - `inmemory`  → `mem://<topic>`
/// - `kafka`     → `kafka://<topic>?brokers=<a,b>`
/// - `gcppubsub` → `gcppubsub://projects/<project>/topics/<topic>`
/// - `nats`      → `nats://<topic>`
pub fn resolve(cfg: &PubSubStorageConfig) -> Result<TopicUrl, ConfigError> {
    let provider: Provider = cfg.provider.parse()?;
    let topic = validate_topic(&cfg.topic)?;

    let url = match provider {
        Provider::InMemory | Provider::Nats => new_url(provider, topic, topic)?,
        Provider::Kafka => {
            let brokers = cfg
                .kafka
                .as_ref()
                .map(|k| k.bootstrap_servers.join(","))
                .filter(|b| !b.is_empty())
                .ok_or(ConfigError::MissingField {
                    provider: provider.name(),
                    field: "kafka.bootstrap_servers",
                })?;
            new_url(provider, topic, topic)?.with_query("brokers", brokers)
        }
        Provider::GcpPubSub => {
            let project = cfg
                .gcp
                .as_ref()
                .map(|g| g.project.trim())
                .filter(|p| !p.is_empty())
                .ok_or(ConfigError::MissingField {
                    provider: provider.name(),
                    field: "gcp.project",
                })?;
            new_url(provider, topic, format!("projects/{project}/topics/{topic}"))?
        }
    };
    Ok(url)
}

fn validate_topic(topic: &str) -> Result<&str, ConfigError> {
    if topic.trim().is_empty() {
        return Err(ConfigError::EmptyTopic);
    }
    let invalid = |reason: &str| ConfigError::InvalidTopic {
        topic: topic.to_string(),
        reason: reason.to_string(),
    };
    if topic.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    if topic.contains(['?', '&', '#']) || topic.contains("://") {
        return Err(invalid("contains url delimiters"));
    }
    Ok(topic)
}

fn new_url(provider: Provider, topic: &str, path: impl Into<String>) -> Result<TopicUrl, ConfigError> {
    TopicUrl::new(provider.scheme(), path).map_err(|e| ConfigError::InvalidTopic {
        topic: topic.to_string(),
        reason: e.message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GcpConfig, KafkaConfig};

    #[test]
    fn inmemory_maps_to_mem_scheme() {
        let url = resolve(&PubSubStorageConfig::new("inmemory", "test")).unwrap();
        assert_eq!(url.to_string(), "mem://test");
    }

    #[test]
    fn resolve_is_pure() {
        let cfg = PubSubStorageConfig::new("nats", "chains.attestations");
        assert_eq!(resolve(&cfg).unwrap(), resolve(&cfg).unwrap());
    }

    #[test]
    fn kafka_carries_brokers() {
        let mut cfg = PubSubStorageConfig::new("kafka", "attestations");
        assert_eq!(
            resolve(&cfg).unwrap_err(),
            ConfigError::MissingField { provider: "kafka", field: "kafka.bootstrap_servers" }
        );

        cfg.kafka = Some(KafkaConfig {
            bootstrap_servers: vec!["b0:9092".into(), "b1:9092".into()],
        });
        let url = resolve(&cfg).unwrap();
        assert_eq!(url.to_string(), "kafka://attestations?brokers=b0:9092,b1:9092");
    }

    #[test]
    fn gcp_is_project_qualified() {
        let mut cfg = PubSubStorageConfig::new("GCP", "attestations");
        assert!(matches!(resolve(&cfg), Err(ConfigError::MissingField { field: "gcp.project", .. })));

        cfg.gcp = Some(GcpConfig { project: "acme".into() });
        let url = resolve(&cfg).unwrap();
        assert_eq!(url.scheme(), "gcppubsub");
        assert_eq!(url.path(), "projects/acme/topics/attestations");
    }

    #[test]
    fn empty_and_unknown_inputs() {
        assert_eq!(resolve(&PubSubStorageConfig::new("", "t")).unwrap_err(), ConfigError::EmptyProvider);
        assert_eq!(resolve(&PubSubStorageConfig::new("  ", "t")).unwrap_err(), ConfigError::EmptyProvider);
        assert_eq!(resolve(&PubSubStorageConfig::new("inmemory", "")).unwrap_err(), ConfigError::EmptyTopic);
        assert_eq!(
            resolve(&PubSubStorageConfig::new("sqs", "t")).unwrap_err(),
            ConfigError::UnknownProvider("sqs".into())
        );
    }

    #[test]
    fn rejects_topics_that_break_the_url() {
        for topic in ["a b", "a?b", "a&b", "x://y"] {
            let err = resolve(&PubSubStorageConfig::new("inmemory", topic)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTopic { .. }), "{topic}");
        }
    }

    #[test]
    fn provider_names_round_trip() {
        for p in Provider::ALL {
            assert_eq!(p.name().parse::<Provider>().unwrap(), p);
        }
    }
}
