//! Cancelable settle tasks for native pastes.
//!
//! After a rich paste the host mutates the tree on its own schedule. The paste coordinator asks
//! a `SettleScheduler` to post `Event::PasteSettled` once a short delay has elapsed; the session
//! cancels whatever is still outstanding when it is destroyed.

use crate::{Event, PasteTicket};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

pub trait SettleScheduler {
    /// Post `Event::PasteSettled { ticket }` after `delay`.
    fn schedule(&mut self, ticket: PasteTicket, delay: Duration);
    /// Cancel one task. Returns `true` if it was still outstanding.
    fn cancel(&mut self, ticket: PasteTicket) -> bool;
    /// Cancel every outstanding task, returning how many were aborted.
    fn cancel_all(&mut self) -> usize;
}

/// Scheduler backed by `tokio::time::sleep` tasks feeding the runtime channel.
///
/// `schedule` must be called from within a tokio runtime.
pub struct TokioSettleScheduler {
    tx: Sender<Event>,
    pending: HashMap<PasteTicket, JoinHandle<()>>,
}

impl TokioSettleScheduler {
    pub fn new(tx: Sender<Event>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
        }
    }

    /// Tasks not yet finished or aborted.
    pub fn outstanding(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl SettleScheduler for TokioSettleScheduler {
    fn schedule(&mut self, ticket: PasteTicket, delay: Duration) {
        self.pending.retain(|_, handle| !handle.is_finished());
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(Event::PasteSettled { ticket }).await.is_err() {
                trace!(target: "runtime.settle", %ticket, "channel_closed");
            }
        });
        trace!(target: "runtime.settle", %ticket, delay_ms = delay.as_millis() as u64, "scheduled");
        if let Some(previous) = self.pending.insert(ticket, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, ticket: PasteTicket) -> bool {
        match self.pending.remove(&ticket) {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                live
            }
            None => false,
        }
    }

    fn cancel_all(&mut self) -> usize {
        let mut aborted = 0;
        for (_, handle) in self.pending.drain() {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
        }
        debug!(target: "runtime.settle", aborted, "cancel_all");
        aborted
    }
}

impl Drop for TokioSettleScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}
