//! # Broadcast Bus
//!
//! The publish/subscribe distribution layer. Producers anywhere in the
//! process call [`BroadcastBus::publish`]; each subscribed handler (normally
//! one [`SessionFanout`] per process, registered once at startup) receives
//! every event and evaluates its targeting predicate against the process's
//! own local sessions.
//!
//! ## Delivery contract
//!
//! - At-least-once delivery to every subscribed handler
//! - FIFO per single producer (one dispatch queue; a producer's own events
//!   are dispatched in emission order)
//! - No ordering guarantee across independent producers
//! - A handler error is logged and never desynchronizes the dispatch task

mod fanout;
mod target;

pub use fanout::SessionFanout;
pub use target::{BroadcastEvent, Target};

use crate::error::WorldError;
use crate::events::EventError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// Handler invoked for every published event.
///
/// Implementations evaluate the event's target against local state and
/// perform the actual deliveries.
#[async_trait]
pub trait BusSubscriber: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Processes one published event.
    async fn deliver(&self, event: &BroadcastEvent) -> Result<(), EventError>;
}

/// Counters for bus monitoring.
#[derive(Debug, Default)]
pub struct BusStats {
    published: AtomicU64,
    dispatched: AtomicU64,
    handler_errors: AtomicU64,
}

impl BusStats {
    /// Events accepted by `publish`.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Handler invocations that completed (successfully or not).
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Handler invocations that returned an error.
    pub fn handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }
}

/// The process-local broadcast bus.
///
/// One long-lived dispatch task drains the publish queue and hands each event
/// to every subscriber in registration order.
pub struct BroadcastBus {
    tx: mpsc::UnboundedSender<BroadcastEvent>,
    subscribers: Arc<RwLock<Vec<Arc<dyn BusSubscriber>>>>,
    stats: Arc<BusStats>,
}

impl std::fmt::Debug for BroadcastBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastBus")
            .field("published", &self.stats.published())
            .field("dispatched", &self.stats.dispatched())
            .finish()
    }
}

impl BroadcastBus {
    /// Creates the bus and spawns its dispatch task.
    pub fn new() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<BroadcastEvent>();
        let subscribers: Arc<RwLock<Vec<Arc<dyn BusSubscriber>>>> = Arc::new(RwLock::new(Vec::new()));
        let stats = Arc::new(BusStats::default());

        let dispatch_subscribers = subscribers.clone();
        let dispatch_stats = stats.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let handlers = dispatch_subscribers.read().await.clone();
                for handler in handlers {
                    dispatch_stats.dispatched.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = handler.deliver(&event).await {
                        dispatch_stats.handler_errors.fetch_add(1, Ordering::Relaxed);
                        warn!("🟡 Bus handler '{}' failed: {}", handler.name(), e);
                    }
                }
            }
        });

        Arc::new(Self { tx, subscribers, stats })
    }

    /// Registers a subscriber. Called once per process at startup for the
    /// standard session fan-out; additional handlers (metrics taps, bridge to
    /// an external broker) may also register before traffic starts.
    pub async fn subscribe(&self, handler: Arc<dyn BusSubscriber>) {
        info!("📝 Bus subscriber registered: {}", handler.name());
        self.subscribers.write().await.push(handler);
    }

    /// Publishes a fire-and-forget event.
    ///
    /// Never blocks the producer; fails only if the dispatch task is gone.
    pub fn publish(&self, event: BroadcastEvent) -> Result<(), WorldError> {
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(event)
            .map_err(|_| WorldError::Bus("dispatch task stopped".to_string()))
    }

    /// Current bus counters.
    pub fn stats(&self) -> Arc<BusStats> {
        self.stats.clone()
    }
}
