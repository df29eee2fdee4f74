use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use serde::Serialize;
use tracing::Instrument;

use chains_api::{BusError, Message, RunIdentity, StorageOpts, TopicHandle, TopicUrl};
use topic_engine::TopicMux;

use crate::config::{MessageBody, PubSubStorageConfig};
use crate::context::CallContext;
use crate::error::{ConfigError, StorageError};
use crate::resolver::resolve;

/// Type tag of this storage backend.
pub const STORAGE_BACKEND_PUBSUB: &str = "pubsub";

/// Metadata key carrying the payload format tag.
pub const META_PAYLOAD_FORMAT: &str = "payload-format";

// ═══════════════════════════════════════════════════════════════
//  StorageBackend
// ═══════════════════════════════════════════════════════════════

/// Destination for signed attestations.
pub trait StorageBackend: Send + Sync {
    /// Short type tag, e.g. `"pubsub"`.
    fn backend_type(&self) -> &'static str;

    /// Store one signed payload produced for `run`.
    fn store_payload<'a>(
        &'a self,
        ctx: &'a CallContext,
        run: &'a RunIdentity,
        raw_payload: &'a [u8],
        signature: &'a str,
        opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    /// Payloads previously stored for `run`, keyed by artifact.
    fn retrieve_payloads<'a>(
        &'a self,
        ctx: &'a CallContext,
        run: &'a RunIdentity,
        opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<String, String>, StorageError>> + Send + 'a>>;

    /// Signatures previously stored for `run`, keyed by artifact.
    #[allow(clippy::type_complexity)]
    fn retrieve_signatures<'a>(
        &'a self,
        ctx: &'a CallContext,
        run: &'a RunIdentity,
        opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<String, Vec<String>>, StorageError>> + Send + 'a>>;
}

// ═══════════════════════════════════════════════════════════════
//  PubSubBackend
// ═══════════════════════════════════════════════════════════════

/// Publishes each signed payload as one message on the configured topic.
///
/// Holds no per-call state: every store opens its own topic handle,
/// sends exactly once and shuts the handle down before returning.
#[derive(Debug)]
pub struct PubSubBackend {
    config: PubSubStorageConfig,
    mux: Arc<TopicMux>,
    span: tracing::Span,
}

impl PubSubBackend {
    pub fn new(config: PubSubStorageConfig, mux: Arc<TopicMux>) -> Self {
        let span = tracing::info_span!("storage", backend = STORAGE_BACKEND_PUBSUB);
        Self { config, mux, span }
    }

    /// Logging context every call is instrumented with.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// URL of the destination topic.
    pub fn topic_url(&self) -> Result<TopicUrl, ConfigError> {
        resolve(&self.config)
    }

    /// Build the outgoing message according to the configured body policy.
    pub fn build_message(
        &self,
        raw_payload: &[u8],
        signature: &str,
        opts: &StorageOpts,
    ) -> Result<Message, StorageError> {
        let body = match self.config.message_body {
            MessageBody::Signature => signature.as_bytes().to_vec(),
            MessageBody::Payload => raw_payload.to_vec(),
            MessageBody::Envelope => serde_json::to_vec(&Envelope {
                payload_type: opts.payload_format.as_str(),
                payload: base64::engine::general_purpose::STANDARD.encode(raw_payload),
                signature,
            })?,
        };

        let mut message = Message::new(body);
        if !opts.payload_format.as_str().is_empty() {
            message = message.with_metadata(META_PAYLOAD_FORMAT, opts.payload_format.as_str());
        }
        Ok(message)
    }

    /// Resolve → open → send → shut down.
    ///
    /// The handle, once opened, is shut down on every path before this
    /// returns; a failed shutdown is logged and does not change the result.
    pub async fn store(
        &self,
        ctx: &CallContext,
        run: &RunIdentity,
        raw_payload: &[u8],
        signature: &str,
        opts: &StorageOpts,
    ) -> Result<(), StorageError> {
        let url = self.topic_url()?;
        let message = self.build_message(raw_payload, signature, opts)?;
        tracing::info!(
            run = %run,
            url = %url,
            format = %opts.payload_format,
            body = %self.config.message_body,
            "storing payload"
        );

        let handle = match ctx.run(self.mux.open_topic(&url)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(source)) => {
                return Err(StorageError::Connect { url: url.to_string(), source });
            }
            Err(done) => {
                return Err(StorageError::Publish {
                    url: url.to_string(),
                    source: done.into_bus_error("open topic"),
                });
            }
        };

        let lease = TopicLease::new(handle, &url);
        let sent = match ctx.run(lease.send(message)).await {
            Ok(result) => result,
            Err(done) => Err(done.into_bus_error("send")),
        };
        lease.release().await;

        sent.map_err(|source| StorageError::Publish { url: url.to_string(), source })?;
        tracing::debug!(run = %run, url = %url, "payload published");
        Ok(())
    }
}

impl StorageBackend for PubSubBackend {
    fn backend_type(&self) -> &'static str {
        STORAGE_BACKEND_PUBSUB
    }

    fn store_payload<'a>(
        &'a self,
        ctx: &'a CallContext,
        run: &'a RunIdentity,
        raw_payload: &'a [u8],
        signature: &'a str,
        opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(
            self.store(ctx, run, raw_payload, signature, opts)
                .instrument(self.span.clone()),
        )
    }

    fn retrieve_payloads<'a>(
        &'a self,
        _ctx: &'a CallContext,
        _run: &'a RunIdentity,
        _opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<String, String>, StorageError>> + Send + 'a>> {
        Box::pin(async { Err(StorageError::NotImplemented(STORAGE_BACKEND_PUBSUB)) })
    }

    fn retrieve_signatures<'a>(
        &'a self,
        _ctx: &'a CallContext,
        _run: &'a RunIdentity,
        _opts: &'a StorageOpts,
    ) -> Pin<Box<dyn Future<Output = Result<HashMap<String, Vec<String>>, StorageError>> + Send + 'a>> {
        Box::pin(async { Err(StorageError::NotImplemented(STORAGE_BACKEND_PUBSUB)) })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    payload_type: &'a str,
    payload: String,
    signature: &'a str,
}

// ═══════════════════════════════════════════════════════════════
//  TopicLease — scoped ownership of one open handle
// ═══════════════════════════════════════════════════════════════

/// Owns a topic handle for the duration of one store call.
///
/// `release` shuts the handle down. If the lease is dropped unreleased
/// (the store future itself was dropped), shutdown is spawned on the
/// current runtime instead.
struct TopicLease {
    handle: Option<Box<dyn TopicHandle>>,
    url: String,
}

impl TopicLease {
    fn new(handle: Box<dyn TopicHandle>, url: &TopicUrl) -> Self {
        Self {
            handle: Some(handle),
            url: url.to_string(),
        }
    }

    async fn send(&self, message: Message) -> Result<(), BusError> {
        match &self.handle {
            Some(handle) => handle.send(message).await,
            None => Err(BusError::closed("topic lease already released")),
        }
    }

    /// The handle stays in the lease until shutdown returns, so a store
    /// dropped mid-release still hands it to the `Drop` fallback.
    async fn release(mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.shutdown().await {
                tracing::warn!(url = %self.url, error = %e, "failed to shut down topic handle");
            }
        }
        self.handle = None;
    }
}

impl Drop for TopicLease {
    fn drop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        let url = std::mem::take(&mut self.url);
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    if let Err(e) = handle.shutdown().await {
                        tracing::warn!(url = %url, error = %e, "failed to shut down abandoned topic handle");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(url = %url, "topic handle dropped outside a runtime, not shut down");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chains_api::PayloadFormat;
    use topic_engine::MemBus;

    fn backend(body: MessageBody) -> PubSubBackend {
        let mux = Arc::new(TopicMux::new().with_driver(Arc::new(MemBus::new())));
        PubSubBackend::new(PubSubStorageConfig::new("inmemory", "test").with_message_body(body), mux)
    }

    #[test]
    fn signature_body_is_default() {
        let b = backend(MessageBody::Signature);
        let msg = b
            .build_message(b"{}", "signature", &StorageOpts::with_format(PayloadFormat::IN_TOTO))
            .unwrap();
        assert_eq!(msg.body_str(), Some("signature"));
        assert_eq!(msg.metadata.get(META_PAYLOAD_FORMAT).map(String::as_str), Some("in-toto"));
    }

    #[test]
    fn payload_body_carries_raw_bytes() {
        let b = backend(MessageBody::Payload);
        let msg = b.build_message(b"\x00\x01statement", "sig", &StorageOpts::default()).unwrap();
        assert_eq!(msg.body, b"\x00\x01statement");
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn envelope_body_is_json() {
        let b = backend(MessageBody::Envelope);
        let msg = b
            .build_message(b"{\"_type\":\"x\"}", "sig", &StorageOpts::with_format("slsa/v1"))
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&msg.body).unwrap();
        assert_eq!(v["payloadType"], "slsa/v1");
        assert_eq!(v["signature"], "sig");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(v["payload"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, b"{\"_type\":\"x\"}");
    }

    #[tokio::test]
    async fn retrieval_is_not_implemented() {
        let b = backend(MessageBody::Signature);
        let ctx = CallContext::new();
        let run = RunIdentity::task_run("bar", "foo");
        let opts = StorageOpts::default();
        assert_eq!(b.backend_type(), "pubsub");
        assert!(matches!(
            b.retrieve_payloads(&ctx, &run, &opts).await,
            Err(StorageError::NotImplemented("pubsub"))
        ));
        assert!(matches!(
            b.retrieve_signatures(&ctx, &run, &opts).await,
            Err(StorageError::NotImplemented("pubsub"))
        ));
    }
}
