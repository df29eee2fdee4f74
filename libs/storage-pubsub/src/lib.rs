//! Publishes signed attestations onto a message-bus topic.
//!
//! The backend resolves `[storage.pubsub]` to a topic URL, opens a handle
//! through the [`TopicMux`](topic_engine::TopicMux), sends one message and
//! shuts the handle down before returning.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod resolver;

pub use backend::{PubSubBackend, StorageBackend, META_PAYLOAD_FORMAT, STORAGE_BACKEND_PUBSUB};
pub use config::{GcpConfig, KafkaConfig, MessageBody, PubSubStorageConfig};
pub use context::{CallContext, Done};
pub use error::{ConfigError, StorageError};
pub use resolver::{resolve, Provider};
