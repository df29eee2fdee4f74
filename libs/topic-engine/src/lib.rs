pub mod error;
pub mod mem;

use std::collections::HashMap;
use std::sync::Arc;

use chains_api::{BusError, TopicDriver, TopicHandle, TopicUrl};

pub use error::TopicError;
pub use mem::{MemBus, MemSubscription, MemTopicHandle, MEM_SCHEME};

// ═══════════════════════════════════════════════════════════════
//  TopicMux
// ═══════════════════════════════════════════════════════════════

/// Реестр драйверов по URL scheme.
///
/// Открывает topic по URL, выбирая драйвер по схеме. Сам мультиплексор
/// не знает конкретных провайдеров.
#[derive(Default)]
pub struct TopicMux {
    drivers: HashMap<String, Arc<dyn TopicDriver>>,
}

impl std::fmt::Debug for TopicMux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicMux").field("schemes", &self.schemes()).finish()
    }
}

impl TopicMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its scheme, replacing any previous one.
    pub fn register(&mut self, driver: Arc<dyn TopicDriver>) -> Option<Arc<dyn TopicDriver>> {
        let scheme = driver.scheme().to_string();
        let previous = self.drivers.insert(scheme.clone(), driver);
        if previous.is_some() {
            tracing::warn!(%scheme, "replaced topic driver");
        } else {
            tracing::debug!(%scheme, "registered topic driver");
        }
        previous
    }

    pub fn with_driver(mut self, driver: Arc<dyn TopicDriver>) -> Self {
        self.register(driver);
        self
    }

    pub fn driver(&self, scheme: &str) -> Option<Arc<dyn TopicDriver>> {
        self.drivers.get(scheme).cloned()
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.drivers.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Open a topic handle through the driver serving `url`'s scheme.
    pub async fn open_topic(&self, url: &TopicUrl) -> Result<Box<dyn TopicHandle>, BusError> {
        let driver = self
            .driver(url.scheme())
            .ok_or_else(|| TopicError::NoDriver(url.scheme().to_string()))?;
        driver.open_topic(url).await
    }
}
