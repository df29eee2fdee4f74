use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use chains_api::{BusError, Message, OverflowPolicy, TopicDriver, TopicHandle, TopicUrl};

use crate::TopicError;

/// URL scheme of the in-process driver.
pub const MEM_SCHEME: &str = "mem";

const DEFAULT_SUBSCRIPTION_BUFFER: usize = 1024;

// ═══════════════════════════════════════════════════════════════
//  Subscriber
// ═══════════════════════════════════════════════════════════════

struct Subscriber {
    tx: mpsc::Sender<Message>,
    overflow: OverflowPolicy,
}

// ═══════════════════════════════════════════════════════════════
//  MemTopic
// ═══════════════════════════════════════════════════════════════

/// Именованный in-process topic: список подписчиков + счётчик
/// открытых handle'ов.
///
/// Сообщение, отправленное без подписчиков, теряется.
struct MemTopic {
    name: String,
    subscribers: RwLock<Vec<Subscriber>>,
    live_handles: AtomicUsize,
}

impl MemTopic {
    fn new(name: String) -> Self {
        Self {
            name,
            subscribers: RwLock::new(Vec::new()),
            live_handles: AtomicUsize::new(0),
        }
    }

    async fn subscribe(&self, buffer: usize, overflow: OverflowPolicy) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mut subs = self.subscribers.write().await;
        subs.push(Subscriber { tx, overflow });
        rx
    }

    /// Доставить сообщение всем подписчикам. Возвращает число доставок.
    ///
    /// BackPressure-подписчики блокируют отправителя, пока в их канале
    /// не появится место.
    async fn publish(&self, message: Message) -> usize {
        // Snapshot under the lock; back-pressure sends must not hold it.
        let targets: Vec<(mpsc::Sender<Message>, OverflowPolicy)> = {
            let mut subs = self.subscribers.write().await;
            subs.retain(|s| !s.tx.is_closed());
            subs.iter().map(|s| (s.tx.clone(), s.overflow)).collect()
        };

        let mut delivered = 0;
        for (tx, overflow) in targets {
            match overflow {
                OverflowPolicy::Drop => match tx.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(topic = %self.name, "subscriber channel full, dropping");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                },
                OverflowPolicy::BackPressure => {
                    if tx.send(message.clone()).await.is_ok() {
                        delivered += 1;
                    } else {
                        tracing::debug!(topic = %self.name, "subscriber closed during back-pressure send");
                    }
                }
            }
        }
        delivered
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemBus — driver for `mem://<topic>`
// ═══════════════════════════════════════════════════════════════

/// In-process message bus.
///
/// Topics are created on first `open_topic`. Subscriptions can only be
/// opened on an existing topic and see messages sent after they opened.
pub struct MemBus {
    topics: std::sync::RwLock<HashMap<String, Arc<MemTopic>>>,
    buffer: usize,
    overflow: OverflowPolicy,
}

impl std::fmt::Debug for MemBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemBus")
            .field("topics", &self.topic_names())
            .field("buffer", &self.buffer)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl Default for MemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemBus {
    pub fn new() -> Self {
        Self::with_defaults(DEFAULT_SUBSCRIPTION_BUFFER, OverflowPolicy::BackPressure)
    }

    /// Buffer size and overflow policy used by `open_subscription`.
    pub fn with_defaults(buffer: usize, overflow: OverflowPolicy) -> Self {
        Self {
            topics: std::sync::RwLock::new(HashMap::new()),
            buffer,
            overflow,
        }
    }

    fn get(&self, name: &str) -> Option<Arc<MemTopic>> {
        let guard = match self.topics.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("mem bus read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.get(name).cloned()
    }

    fn get_or_create(&self, name: &str) -> Arc<MemTopic> {
        let mut guard = match self.topics.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("mem bus write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemTopic::new(name.to_string())))
            .clone()
    }

    pub fn topic_names(&self) -> Vec<String> {
        let guard = match self.topics.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of handles opened on `topic` and not yet shut down.
    pub fn live_handles(&self, topic: &str) -> usize {
        self.get(topic)
            .map(|t| t.live_handles.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn topic_name(url: &TopicUrl) -> Result<&str, TopicError> {
        if url.scheme() != MEM_SCHEME {
            return Err(TopicError::WrongScheme {
                url: url.to_string(),
                expected: MEM_SCHEME,
            });
        }
        Ok(url.path())
    }

    /// Открыть handle на topic (создаётся при первом открытии).
    pub fn open(&self, url: &TopicUrl) -> Result<MemTopicHandle, BusError> {
        let name = Self::topic_name(url)?;
        let topic = self.get_or_create(name);
        topic.live_handles.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(topic = %name, "opened mem topic");
        Ok(MemTopicHandle { topic, shut_down: false })
    }

    /// Подписаться на существующий topic с буфером и policy по умолчанию.
    pub async fn open_subscription(&self, url: &TopicUrl) -> Result<MemSubscription, BusError> {
        self.open_subscription_with(url, self.buffer, self.overflow).await
    }

    /// Подписаться на существующий topic.
    ///
    /// - `buffer`: размер буфера канала
    /// - `overflow`: стратегия при переполнении (Drop или BackPressure)
    pub async fn open_subscription_with(
        &self,
        url: &TopicUrl,
        buffer: usize,
        overflow: OverflowPolicy,
    ) -> Result<MemSubscription, BusError> {
        let name = Self::topic_name(url)?;
        let topic = self
            .get(name)
            .ok_or_else(|| TopicError::NotFound(name.to_string()))?;
        let rx = topic.subscribe(buffer, overflow).await;
        Ok(MemSubscription {
            topic: topic.name.clone(),
            rx,
            shut_down: false,
        })
    }
}

impl TopicDriver for MemBus {
    fn scheme(&self) -> &str {
        MEM_SCHEME
    }

    fn open_topic(
        &self,
        url: &TopicUrl,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn TopicHandle>, BusError>> + Send + '_>> {
        let url = url.clone();
        Box::pin(async move {
            let handle = self.open(&url)?;
            Ok(Box::new(handle) as Box<dyn TopicHandle>)
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemTopicHandle
// ═══════════════════════════════════════════════════════════════

pub struct MemTopicHandle {
    topic: Arc<MemTopic>,
    shut_down: bool,
}

impl MemTopicHandle {
    pub fn topic(&self) -> &str {
        &self.topic.name
    }
}

impl TopicHandle for MemTopicHandle {
    fn send(&self, message: Message) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move {
            if self.shut_down {
                return Err(TopicError::Closed("topic handle").into_bus_error());
            }
            let delivered = self.topic.publish(message).await;
            tracing::trace!(topic = %self.topic.name, delivered, "mem send");
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move {
            if self.shut_down {
                return Err(TopicError::Closed("topic handle").into_bus_error());
            }
            self.shut_down = true;
            self.topic.live_handles.fetch_sub(1, Ordering::AcqRel);
            Ok(())
        })
    }
}

impl Drop for MemTopicHandle {
    fn drop(&mut self) {
        if !self.shut_down {
            self.topic.live_handles.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemSubscription
// ═══════════════════════════════════════════════════════════════

/// Подписка на mem topic — асинхронный поток сообщений.
#[derive(Debug)]
pub struct MemSubscription {
    topic: String,
    rx: mpsc::Receiver<Message>,
    shut_down: bool,
}

impl MemSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Получить следующее сообщение. None = подписка закрыта и буфер пуст.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Non-blocking receive; `None` when nothing is buffered right now.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving new messages. Already buffered ones stay readable.
    pub fn shutdown(&mut self) -> Result<(), BusError> {
        if self.shut_down {
            return Err(TopicError::Closed("subscription").into_bus_error());
        }
        self.shut_down = true;
        self.rx.close();
        Ok(())
    }
}
