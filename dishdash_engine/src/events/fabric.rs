//! # Realtime notification fabric
//!
//! A scoped, push-based change feed. Writers [`publish`](NotificationFabric::publish) a [`ChangeEvent`] after every
//! committed change; each live [`Subscription`] whose [`Scope`] matches the event gets a copy.
//!
//! Delivery is at-least-once and unordered. Subscribers never apply events as deltas; they refetch. That makes it safe
//! to drop events for a subscriber whose queue is already full: a queued event is already going to trigger a refetch
//! that observes the newer state.
//!
//! A subscription is a scoped resource. Dropping it unregisters it.
use std::{
    collections::{BTreeSet, HashMap},
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        Weak,
    },
    task::{Context, Poll},
};

use futures_util::Stream;
use log::*;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::events::ChangeEvent;

/// Per-subscription queue length.
pub const DEFAULT_QUEUE_SIZE: usize = 8;

/// What a subscriber wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Orders belonging to one customer.
    OrdersForCustomer(i64),
    /// Orders placed with any restaurant in the set.
    OrdersForRestaurants(BTreeSet<i64>),
    /// Availability requests addressed to any restaurant in the set.
    AvailabilityForRestaurants(BTreeSet<i64>),
    /// A single availability request.
    AvailabilityRequest(i64),
}

impl Scope {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match (self, event) {
            (Scope::OrdersForCustomer(id), ChangeEvent::Order { customer_id, .. }) => id == customer_id,
            (Scope::OrdersForRestaurants(ids), ChangeEvent::Order { restaurant_id, .. }) => ids.contains(restaurant_id),
            (Scope::AvailabilityForRestaurants(ids), ChangeEvent::Availability { restaurant_id, .. }) => {
                ids.contains(restaurant_id)
            },
            (Scope::AvailabilityRequest(id), ChangeEvent::Availability { request_id, .. }) => id == request_id,
            _ => false,
        }
    }
}

struct Subscriber {
    scope: Scope,
    sender: mpsc::Sender<ChangeEvent>,
}

struct FabricInner {
    next_id: AtomicU64,
    queue_size: usize,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl FabricInner {
    // A panic while holding the lock cannot leave the map half-updated, so a poisoned lock is still usable
    fn subscribers(&self) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct NotificationFabric {
    inner: Arc<FabricInner>,
}

impl Default for NotificationFabric {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SIZE)
    }
}

impl std::fmt::Debug for NotificationFabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationFabric({} subscribers)", self.subscriber_count())
    }
}

impl NotificationFabric {
    pub fn new(queue_size: usize) -> Self {
        let inner = FabricInner {
            next_id: AtomicU64::new(1),
            queue_size: queue_size.max(1),
            subscribers: Mutex::new(HashMap::new()),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn subscribe(&self, scope: Scope) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.queue_size);
        debug!("📬️ Subscription #{id} opened for {scope:?}");
        self.inner.subscribers().insert(id, Subscriber { scope, sender });
        Subscription { id, receiver, fabric: Arc::downgrade(&self.inner) }
    }

    /// Fans `event` out to every matching subscription. Returns the number of subscriptions that received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.inner.subscribers();
        subscribers.retain(|id, sub| {
            if !sub.scope.matches(&event) {
                return !sub.sender.is_closed();
            }
            match sub.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                },
                Err(TrySendError::Full(_)) => {
                    trace!("📬️ Subscription #{id} already has a refetch pending. Event coalesced");
                    true
                },
                Err(TrySendError::Closed(_)) => {
                    trace!("📬️ Subscription #{id} is closed. Pruning");
                    false
                },
            }
        });
        trace!("📬️ {event:?} delivered to {delivered} subscriptions");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

/// A live subscription to the fabric. It is a [`Stream`] of [`ChangeEvent`]s and unsubscribes when dropped.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<ChangeEvent>,
    fabric: Weak<FabricInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. Returns `None` once the fabric has gone away.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Discards any events already queued and returns how many there were. Call after a refetch has started: the
    /// refetch observes everything those events announced.
    pub fn drain_pending(&mut self) -> usize {
        let mut n = 0;
        while self.receiver.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.fabric.upgrade() {
            inner.subscribers().remove(&self.id);
            debug!("📬️ Subscription #{} closed", self.id);
        }
    }
}
