use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::client::MentionSource;
use crate::domain::{Mention, Slug};
use crate::error::WebmentionError;
use crate::fetch::FetchWorker;
use crate::observer::{MentionObserver, MetricsObserver, MetricsSnapshot};
use crate::persist::{PersistOutcome, PersistenceWorker};
use crate::store::CollectionStore;

const CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub groups: Vec<PersistOutcome>,
    pub metrics: MetricsSnapshot,
}

/// Partition key for a fetched mention. Mentions whose target cannot be
/// parsed still get their own batch so the persistence stage reports them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Slug(Slug),
    Unparsed(String),
}

impl GroupKey {
    fn of(mention: &Mention) -> Self {
        match mention.slug() {
            Ok(slug) => GroupKey::Slug(slug),
            Err(_) => GroupKey::Unparsed(mention.target.clone()),
        }
    }
}

/// Fetch-then-persist pipeline. Metrics are collected from both stages.
pub struct App<S: CollectionStore> {
    fetcher: FetchWorker,
    persister: PersistenceWorker<S>,
    metrics: Arc<MetricsObserver>,
}

impl<S: CollectionStore> App<S> {
    pub fn new(store: Arc<S>) -> Self {
        let metrics = Arc::new(MetricsObserver::new());
        let mut app = Self {
            fetcher: FetchWorker::new(),
            persister: PersistenceWorker::new(store),
            metrics: metrics.clone(),
        };
        app.add_observer(metrics);
        app
    }

    /// Registers `observer` with both the fetch and the persistence stage.
    pub fn add_observer(&mut self, observer: Arc<dyn MentionObserver>) {
        self.fetcher.add_observer(observer.clone());
        self.persister.add_observer(observer);
    }

    pub fn metrics(&self) -> &MetricsObserver {
        &self.metrics
    }

    /// Streams every mention from `source`, then merges each slug's batch on
    /// its own thread. Persistence starts only after the fetch stage is done,
    /// and whatever was fetched is persisted even if fetching failed or was
    /// cancelled. A fetch error wins over persistence errors.
    pub fn run<M: MentionSource>(
        &self,
        source: M,
        cancel: &CancelToken,
    ) -> Result<RunReport, WebmentionError> {
        let (fetch_result, groups) = self.fetch_grouped(source, cancel);
        let fetched = groups.values().map(Vec::len).sum();
        tracing::debug!(fetched, groups = groups.len(), "fetch stage complete");

        let persisted = self.persist_groups(groups);

        fetch_result?;
        let mut outcomes = Vec::with_capacity(persisted.len());
        for result in persisted {
            outcomes.push(result?);
        }

        let metrics = self.metrics.snapshot();
        tracing::info!(
            fetched,
            max_id = metrics.max_id,
            senders = metrics.all_senders.len(),
            seen = metrics.mentions_seen,
            "collected metrics"
        );
        Ok(RunReport {
            fetched,
            groups: outcomes,
            metrics,
        })
    }

    fn fetch_grouped<M: MentionSource>(
        &self,
        source: M,
        cancel: &CancelToken,
    ) -> (
        Result<(), WebmentionError>,
        BTreeMap<GroupKey, Vec<Mention>>,
    ) {
        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        thread::scope(|scope| {
            let fetcher = scope.spawn(move || {
                let mut source = source;
                self.fetcher.run(&mut source, cancel, tx)
            });

            let mut groups: BTreeMap<GroupKey, Vec<Mention>> = BTreeMap::new();
            for mention in rx.iter() {
                groups.entry(GroupKey::of(&mention)).or_default().push(mention);
            }

            let result = fetcher
                .join()
                .unwrap_or(Err(WebmentionError::WorkerPanicked("fetch")));
            (result, groups)
        })
    }

    fn persist_groups(
        &self,
        groups: BTreeMap<GroupKey, Vec<Mention>>,
    ) -> Vec<Result<PersistOutcome, WebmentionError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = groups
                .into_values()
                .map(|batch| scope.spawn(move || self.persister.persist(batch)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or(Err(WebmentionError::WorkerPanicked("persistence")))
                })
                .collect()
        })
    }
}
