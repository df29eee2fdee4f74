use std::future::Future;
use std::pin::Pin;

use crate::{BusError, Message, TopicUrl};

// ════════════════════════════════════════════════════════════════
//  Message-bus contract
// ════════════════════════════════════════════════════════════════

/// Provider of topics for one URL scheme (`mem`, `kafka`, `gcppubsub`, ...).
///
/// Drivers are registered in a mux and selected by the scheme of the
/// URL being opened. The rest of the URL is the driver's business.
pub trait TopicDriver: Send + Sync {
    /// URL scheme this driver serves.
    fn scheme(&self) -> &str;

    /// Open a handle to the topic addressed by `url`.
    ///
    /// Dropping the returned future aborts the open; no handle leaks.
    #[allow(clippy::type_complexity)]
    fn open_topic(
        &self,
        url: &TopicUrl,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn TopicHandle>, BusError>> + Send + '_>>;
}

/// Open, resource-bearing connection to one topic.
///
/// Must be released with `shutdown` exactly once.
pub trait TopicHandle: Send + Sync {
    /// Send one message. Resolves once the provider accepted it.
    fn send(&self, message: Message) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>>;

    /// Flush and release the handle. Later sends fail with `ErrorKind::Closed`.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>>;
}
