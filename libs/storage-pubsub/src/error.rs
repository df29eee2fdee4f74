use chains_api::{BusError, ErrorKind};

/// Malformed or incomplete `[storage.pubsub]` configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("pubsub provider is empty")]
    EmptyProvider,

    #[error("pubsub topic is empty")]
    EmptyTopic,

    #[error("unrecognized pubsub provider '{0}'")]
    UnknownProvider(String),

    #[error("pubsub provider '{provider}' requires '{field}'")]
    MissingField { provider: &'static str, field: &'static str },

    #[error("invalid pubsub topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("open topic '{url}': {source}")]
    Connect { url: String, source: BusError },

    #[error("publish to '{url}': {source}")]
    Publish { url: String, source: BusError },

    #[error("not implemented for storage backend '{0}'")]
    NotImplemented(&'static str),
}

impl StorageError {
    /// The call was aborted by its context (cancel or deadline).
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.bus_kind(),
            Some(ErrorKind::Cancelled | ErrorKind::DeadlineExceeded)
        )
    }

    /// Transport-level failure the caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self.bus_kind(), Some(ErrorKind::Io))
    }

    fn bus_kind(&self) -> Option<ErrorKind> {
        match self {
            StorageError::Connect { source, .. } | StorageError::Publish { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_bus_failures() {
        let err = StorageError::Publish {
            url: "mem://test".into(),
            source: BusError::cancelled("store cancelled"),
        };
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "publish to 'mem://test': store cancelled");

        let err = StorageError::Connect {
            url: "kafka://builds".into(),
            source: BusError::io("broker unreachable"),
        };
        assert!(err.is_retryable());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn config_errors_are_not_retryable() {
        let err = StorageError::from(ConfigError::EmptyTopic);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "config: pubsub topic is empty");
    }
}
