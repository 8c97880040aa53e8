//! Real-time delivery of login events to observing clients.
//!
//! The primary contract is cursor-based pull: clients poll with the last
//! id they have seen and receive only strictly newer events, oldest
//! first. A push broadcast channel is offered as a superset for in-process
//! subscribers; the pull path remains available for parity and recovery.
//!
//! Known limitation, accepted: if writes outpace polling beyond the page
//! limit, a slow poller catches up over multiple polls but has no
//! stronger-than-cursor guarantee.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::DeliveryConfig;
use crate::models::LoginEvent;
use crate::persistence::{PersistenceError, RiskStore};

/// One page of the cursor feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Events strictly newer than the supplied cursor, oldest first
    pub items: Vec<LoginEvent>,
    /// Cursor to supply on the next poll; unchanged when the page is empty
    pub next_cursor: Option<i64>,
}

/// Stateless-per-poll incremental read over the event store
pub struct EventFeed {
    store: Arc<dyn RiskStore>,
    default_limit: usize,
    max_limit: usize,
}

impl EventFeed {
    pub fn new(store: Arc<dyn RiskStore>, config: &DeliveryConfig) -> Self {
        EventFeed {
            store,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Fetch events with `id > since`, oldest first, capped at `limit`
    pub fn poll(
        &self,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> Result<FeedPage, PersistenceError> {
        let limit = limit.unwrap_or(self.default_limit).min(self.max_limit);
        let items = self.store.events_after(since, limit)?;
        let next_cursor = items.last().map(|e| e.id).or(since);
        Ok(FeedPage { items, next_cursor })
    }
}

/// Client-side merge buffer for poll responses.
///
/// Incoming events are deduplicated by id before being appended; the
/// buffer keeps only the most recent `capacity` events to bound memory.
pub struct EventBuffer {
    capacity: usize,
    events: VecDeque<LoginEvent>,
    seen: HashSet<i64>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        EventBuffer {
            capacity,
            events: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Merge a poll response; returns how many events were actually new
    pub fn merge(&mut self, incoming: Vec<LoginEvent>) -> usize {
        let mut added = 0;
        for event in incoming {
            if !self.seen.insert(event.id) {
                continue;
            }
            self.events.push_back(event);
            added += 1;
        }
        while self.events.len() > self.capacity {
            if let Some(dropped) = self.events.pop_front() {
                self.seen.remove(&dropped.id);
            }
        }
        added
    }

    /// Highest id seen so far; feed this back as the next poll cursor
    pub fn cursor(&self) -> Option<i64> {
        self.events.iter().map(|e| e.id).max()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Buffered events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &LoginEvent> {
        self.events.iter()
    }
}

/// In-process push stream of newly recorded events.
///
/// Lossy by design: a lagging subscriber misses events and should fall
/// back to the pull feed to catch up.
pub struct EventBroadcaster {
    tx: broadcast::Sender<LoginEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        EventBroadcaster { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoginEvent> {
        self.tx.subscribe()
    }

    /// Publish a freshly recorded event. Having no subscribers is normal.
    pub fn publish(&self, event: &LoginEvent) {
        if self.tx.send(event.clone()).is_err() {
            log::debug!("No live subscribers for event {}", event.id);
        }
    }
}
