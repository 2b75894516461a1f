//! Store lifecycle events and their subscribers.

use crate::record::Record;
use crate::store::params::LoadParams;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle event emitted by a [`TreeStore`](crate::store::TreeStore)
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A load is about to be issued with these parameters
    BeforeLoad(LoadParams),
    /// A load completed and replaced the data set
    Load { count: usize, total: usize },
    /// The visible data changed and should be repainted
    Update,
    /// A record's children were installed or re-sorted/filtered
    UpdateChildren(Record),
}

/// Subscription handle returned by [`EventBus::subscribe`]
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Ordered list of event subscribers
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver `event` to every subscriber in subscription order.
    pub fn emit(&self, event: &StoreEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while handling.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}
