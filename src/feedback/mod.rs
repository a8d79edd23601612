//! Live feedback fan-out
//!
//! Each session has at most one subscriber, fed through a single-slot `watch`
//! channel. Publishing never waits and overwrites whatever the subscriber has
//! not read yet, so a slow reader always wakes up to the newest result. A
//! subscriber that went away is forgotten on the next publish.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::pose::ClassificationResult;

/// Outcome of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stored as the subscriber's latest result
    Sent,
    /// Subscriber gone; entry pruned
    Closed,
    NoSubscriber,
}

/// Receiving end of a session's feedback
pub struct FeedbackReceiver {
    rx: watch::Receiver<Option<ClassificationResult>>,
}

impl FeedbackReceiver {
    /// Wait for a result newer than the last one read.
    ///
    /// Returns `None` once the session's feedback has been closed.
    pub async fn recv(&mut self) -> Option<ClassificationResult> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(result) = self.rx.borrow_and_update().clone() {
                return Some(result);
            }
        }
    }

    /// The latest unread result, without waiting
    pub fn try_recv(&mut self) -> Option<ClassificationResult> {
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            _ => None,
        }
    }

    /// Whether the hub dropped this subscription
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// Routes classification results to live subscribers
#[derive(Default)]
pub struct FeedbackHub {
    subscribers: Mutex<HashMap<String, watch::Sender<Option<ClassificationResult>>>>,
}

impl FeedbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber to a session, replacing any previous one
    pub fn subscribe(&self, session_id: &str) -> FeedbackReceiver {
        let (tx, rx) = watch::channel(None);
        if self.subscribers.lock().insert(session_id.to_string(), tx).is_some() {
            tracing::debug!("Replaced feedback subscriber for session {}", session_id);
        }
        FeedbackReceiver { rx }
    }

    pub fn unsubscribe(&self, session_id: &str) {
        self.subscribers.lock().remove(session_id);
    }

    pub fn has_subscriber(&self, session_id: &str) -> bool {
        self.subscribers.lock().contains_key(session_id)
    }

    /// Make `result` the session's latest feedback without blocking
    pub fn publish(&self, session_id: &str, result: &ClassificationResult) -> Delivery {
        let mut subscribers = self.subscribers.lock();
        let Some(tx) = subscribers.get(session_id) else {
            return Delivery::NoSubscriber;
        };

        match tx.send(Some(result.clone())) {
            Ok(()) => Delivery::Sent,
            Err(_) => {
                subscribers.remove(session_id);
                tracing::debug!("Feedback subscriber for session {} disconnected", session_id);
                Delivery::Closed
            }
        }
    }

    /// Drop every subscriber
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}
