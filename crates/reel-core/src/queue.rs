use reel_models::PendingAction;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Ordered, session-durable queue of not-yet-confirmed mutations.
///
/// Strict FIFO: the head is only removed after the backend confirms it
/// (`confirm_front`), never before and never from the middle, so a failed
/// action and everything behind it stay queued for the next trigger.
#[derive(Default)]
pub struct PendingQueue {
    actions: Mutex<VecDeque<PendingAction>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, action: PendingAction) {
        self.actions.lock().await.push_back(action);
    }

    /// Clone of the head without removing it.
    pub async fn peek(&self) -> Option<PendingAction> {
        self.actions.lock().await.front().cloned()
    }

    /// Remove the head once its backend call has succeeded.
    pub async fn confirm_front(&self) -> Option<PendingAction> {
        self.actions.lock().await.pop_front()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.lock().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.actions.lock().await.len()
    }

    pub async fn clear(&self) {
        self.actions.lock().await.clear();
    }

    /// Ordered copy of the queue, for status display and tests.
    pub async fn snapshot(&self) -> Vec<PendingAction> {
        self.actions.lock().await.iter().cloned().collect()
    }
}
