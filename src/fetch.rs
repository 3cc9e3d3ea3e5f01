use std::sync::Arc;

use crossbeam_channel::{Sender, select};

use crate::cancel::CancelToken;
use crate::client::MentionSource;
use crate::domain::Mention;
use crate::error::WebmentionError;
use crate::observer::{MentionObserver, Observers};

/// Drives a [`MentionSource`] page by page and streams every mention onto a
/// channel, notifying observers before each mention is handed over.
#[derive(Clone, Default)]
pub struct FetchWorker {
    observers: Observers,
}

impl FetchWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn MentionObserver>) {
        self.observers.add(observer);
    }

    /// Runs until the source returns an empty page, the source fails, or
    /// `cancel` fires. `out` is dropped on return, which closes the channel.
    pub fn run<S: MentionSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancelToken,
        out: Sender<Mention>,
    ) -> Result<(), WebmentionError> {
        tracing::debug!(observers = self.observers.len(), "starting fetch worker");
        let result = self.pump(source, cancel, &out);
        drop(out);
        match &result {
            Ok(()) => tracing::debug!("fetch worker finished"),
            Err(WebmentionError::Cancelled) => tracing::warn!("fetch worker cancelled"),
            Err(err) => tracing::debug!(%err, "fetch worker failed"),
        }
        result
    }

    fn pump<S: MentionSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancelToken,
        out: &Sender<Mention>,
    ) -> Result<(), WebmentionError> {
        loop {
            if cancel.is_cancelled() {
                return Err(WebmentionError::Cancelled);
            }

            let page = source.fetch_page()?;
            if page.is_empty() {
                return Ok(());
            }

            for mention in page {
                self.observers.notify(&mention);
                select! {
                    send(out, mention) -> sent => {
                        if sent.is_err() {
                            // Consumer hung up; nobody is left to receive the rest.
                            return Err(WebmentionError::Cancelled);
                        }
                    }
                    recv(cancel.signal()) -> _ => return Err(WebmentionError::Cancelled),
                }
            }
        }
    }
}
