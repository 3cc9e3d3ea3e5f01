use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{Mention, Slug};
use crate::error::WebmentionError;
use crate::observer::{MentionObserver, Observers};
use crate::store::{CollectionStore, insert_mention, normalize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistOutcome {
    pub slug: Slug,
    pub path: Utf8PathBuf,
    pub inserted: usize,
    pub total: usize,
}

/// Merges one slug's worth of freshly fetched mentions into its stored
/// collection.
pub struct PersistenceWorker<S: CollectionStore> {
    store: Arc<S>,
    observers: Observers,
}

impl<S: CollectionStore> Clone for PersistenceWorker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            observers: self.observers.clone(),
        }
    }
}

impl<S: CollectionStore> PersistenceWorker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            observers: Observers::default(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn MentionObserver>) {
        self.observers.add(observer);
    }

    /// Every mention in `batch` is expected to share the first one's slug.
    /// The collection is rewritten even when nothing new was inserted.
    pub fn persist(&self, batch: Vec<Mention>) -> Result<PersistOutcome, WebmentionError> {
        let Some(first) = batch.first() else {
            return Err(WebmentionError::EmptyBatch);
        };
        let slug = first.slug()?;
        let path = self.store.path_for(&slug);
        tracing::debug!(%slug, count = batch.len(), "starting persist worker");

        let mut collection = self.store.load(&slug)?;
        normalize(&mut collection);

        let mut inserted = 0usize;
        for mention in batch {
            let id = mention.id;
            match insert_mention(&mut collection, mention) {
                Some(index) => {
                    inserted += 1;
                    self.observers.notify(&collection[index]);
                }
                None => tracing::info!(id, %slug, "mention already stored, skipping"),
            }
        }

        tracing::info!(
            total = collection.len(),
            inserted,
            path = %path,
            "saving mentions"
        );
        self.store.save(&slug, &collection)?;

        Ok(PersistOutcome {
            slug,
            path,
            inserted,
            total: collection.len(),
        })
    }
}
