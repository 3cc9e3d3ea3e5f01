use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Cooperative cancellation shared between the caller and the fetch stage.
///
/// Cancelling drops the only sender, so the receiver becomes disconnected and
/// is permanently ready inside a `select!`.
#[derive(Clone)]
pub struct CancelToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            signal: rx,
        }
    }

    pub fn cancel(&self) {
        if let Ok(mut guard) = self.trigger.lock() {
            guard.take();
        }
    }

    /// Cancels the token once `after` has elapsed, unless the process is gone first.
    pub fn cancel_after(&self, after: Duration) {
        let token = self.clone();
        thread::spawn(move || {
            thread::sleep(after);
            tracing::debug!(?after, "cancellation deadline reached");
            token.cancel();
        });
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready once the token is cancelled.
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
