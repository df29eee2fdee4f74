use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  PubSub storage config
// ═══════════════════════════════════════════════════════════════

/// Destination of published attestations: `[storage.pubsub]`.
///
/// Resolved once at startup and handed to the backend; immutable for
/// the lifetime of a store call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubSubStorageConfig {
    /// Provider name: `inmemory`, `kafka`, `gcppubsub` or `nats`.
    #[serde(default)]
    pub provider: String,
    /// Topic identifier within the provider.
    #[serde(default)]
    pub topic: String,
    /// What goes into the message body.
    #[serde(default)]
    pub message_body: MessageBody,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub gcp: Option<GcpConfig>,
}

impl PubSubStorageConfig {
    pub fn new(provider: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_message_body(mut self, body: MessageBody) -> Self {
        self.message_body = body;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default)]
    pub bootstrap_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpConfig {
    #[serde(default)]
    pub project: String,
}

/// Content of the published message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    /// Detached signature only.
    #[default]
    Signature,
    /// Raw attestation payload bytes.
    Payload,
    /// JSON object carrying payload type, base64 payload and signature.
    Envelope,
}

impl std::fmt::Display for MessageBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageBody::Signature => f.write_str("signature"),
            MessageBody::Payload => f.write_str("payload"),
            MessageBody::Envelope => f.write_str("envelope"),
        }
    }
}
