use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Mention;

/// Listener notified once per mention seen by a worker.
pub trait MentionObserver: Send + Sync {
    fn update(&self, mention: &Mention);
}

/// Ordered set of observers, each registered at most once.
#[derive(Clone, Default)]
pub struct Observers {
    inner: Vec<Arc<dyn MentionObserver>>,
}

impl Observers {
    pub fn add(&mut self, observer: Arc<dyn MentionObserver>) {
        if self.inner.iter().any(|known| Arc::ptr_eq(known, &observer)) {
            return;
        }
        tracing::debug!(count = self.inner.len() + 1, "adding observer");
        self.inner.push(observer);
    }

    pub fn notify(&self, mention: &Mention) {
        for observer in &self.inner {
            observer.update(mention);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub max_id: u64,
    pub earliest_received: Option<DateTime<Utc>>,
    pub latest_received: Option<DateTime<Utc>>,
    pub all_senders: BTreeSet<String>,
    pub unique_mentions: BTreeSet<u64>,
    pub mentions_seen: u64,
}

/// Running statistics over every mention observed by the fetch and
/// persistence stages.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    state: RwLock<MetricsSnapshot>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MentionObserver for MetricsObserver {
    fn update(&self, mention: &Mention) {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::trace!(id = mention.id, "observing mention");

        if mention.id > state.max_id {
            state.max_id = mention.id;
        }

        if let Some(received) = mention.received {
            if state.earliest_received.is_none_or(|earliest| received < earliest) {
                state.earliest_received = Some(received);
            }
            if state.latest_received.is_none_or(|latest| received > latest) {
                state.latest_received = Some(received);
            }
        }

        if !state.all_senders.contains(&mention.source) {
            state.all_senders.insert(mention.source.clone());
        }
        state.unique_mentions.insert(mention.id);
        state.mentions_seen += 1;
    }
}
