use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::domain::{PendingEntry, RequestId};
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AutoApproved,
    Approved,
    Denied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyEntry {
    pub entry: PendingEntry,
    pub decision: Decision,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<PendingEntry>,
    ready: VecDeque<ReadyEntry>,
    closed: bool,
}

/// Pending-approval set plus the FIFO of entries ready to execute.
///
/// Producers never wait; the single consumer parks in [`next_ready`] until
/// an entry is pushed, decided or the queue is closed.
///
/// [`next_ready`]: RequestQueue::next_ready
#[derive(Debug, Default)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
    ready_signal: Notify,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, entry: PendingEntry) -> Result<(), PortError> {
        let mut state = self.lock();
        if state.closed {
            return Err(PortError::Conflict("request queue is closed".to_owned()));
        }
        if entry.requires_approval {
            if state
                .pending
                .iter()
                .any(|p| p.request.id == entry.request.id)
            {
                return Err(PortError::Conflict(format!(
                    "request {} is already pending",
                    entry.request.id
                )));
            }
            state.pending.push(entry);
            return Ok(());
        }
        state.ready.push_back(ReadyEntry {
            entry,
            decision: Decision::AutoApproved,
        });
        drop(state);
        self.ready_signal.notify_one();
        Ok(())
    }

    pub fn approve(&self, id: &RequestId) -> Result<(), PortError> {
        self.decide(id, Decision::Approved)
    }

    pub fn deny(&self, id: &RequestId) -> Result<(), PortError> {
        self.decide(id, Decision::Denied)
    }

    fn decide(&self, id: &RequestId, decision: Decision) -> Result<(), PortError> {
        let mut state = self.lock();
        let idx = state
            .pending
            .iter()
            .position(|p| &p.request.id == id)
            .ok_or_else(|| PortError::NotFound(format!("no pending request with id {id}")))?;
        let entry = state.pending.remove(idx);
        state.ready.push_back(ReadyEntry { entry, decision });
        drop(state);
        self.ready_signal.notify_one();
        Ok(())
    }

    /// Oldest ready entry; waits while the ready queue is empty. `None` once
    /// the queue is closed and drained.
    pub async fn next_ready(&self) -> Option<ReadyEntry> {
        loop {
            let notified = self.ready_signal.notified();
            {
                let mut state = self.lock();
                if let Some(ready) = state.ready.pop_front() {
                    return Some(ready);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    pub fn try_next_ready(&self) -> Option<ReadyEntry> {
        self.lock().ready.pop_front()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.lock().pending.iter().any(|p| &p.request.id == id)
    }

    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.lock()
            .pending
            .iter()
            .map(|p| p.request.id.clone())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn ready_len(&self) -> usize {
        self.lock().ready.len()
    }

    /// Stops accepting new entries. Already queued entries still drain;
    /// undecided pending entries are left behind.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready_signal.notify_waiters();
        self.ready_signal.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
