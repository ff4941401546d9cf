// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! `EventBus`: an explicit topic registry of subscriber callbacks in place
//! of emitter inheritance — `subscribe` returns a [`Disposer`] instead of
//! requiring callers to track their own unsubscribe handle. Delivery is
//! synchronous fan-out on the publisher's thread; subscribers must not
//! block, and there is no back-pressure or buffering.

use foreman_core::{Event, SessionStatus, Topic};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<Topic, Vec<(u64, Subscriber)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }

    /// Subscribe `callback` to `topic`. The returned [`Disposer`] removes it
    /// again; dropping the disposer without calling `dispose()` leaves the
    /// subscription in place (catch-up after disconnect is the caller's
    /// responsibility via polling).
    pub fn subscribe(
        self: &Arc<Self>,
        topic: Topic,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Disposer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().entry(topic).or_default().push((id, Box::new(callback)));
        Disposer { bus: Arc::downgrade(self), topic, id }
    }

    /// Fan out `event` to every subscriber of its topic, on the calling
    /// thread. `SessionStatusChanged` transitions into `need_clarification`
    /// additionally fan out on `Topic::NeedsClarification`.
    pub fn publish(&self, event: &Event) {
        if let Some(topic) = event.topic() {
            self.dispatch(topic, event);
        }
        if let Event::SessionStatusChanged { to: SessionStatus::NeedClarification, .. } = event {
            self.dispatch(Topic::NeedsClarification, event);
        }
    }

    fn dispatch(&self, topic: Topic, event: &Event) {
        let subscribers = self.subscribers.read();
        if let Some(list) = subscribers.get(&topic) {
            for (_, callback) in list {
                callback(event);
            }
        }
    }

    /// Current subscriber count for `topic`, for tests and diagnostics.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers.read().get(&topic).map_or(0, Vec::len)
    }
}

/// Disposes a subscription when `dispose()` is called. A [`Weak`] handle
/// back to the bus so a disposer outliving its bus is a no-op rather than
/// a dangling reference.
pub struct Disposer {
    bus: Weak<EventBus>,
    topic: Topic,
    id: u64,
}

impl Disposer {
    pub fn dispose(self) {
        let Some(bus) = self.bus.upgrade() else { return };
        if let Some(list) = bus.subscribers.write().get_mut(&self.topic) {
            list.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
