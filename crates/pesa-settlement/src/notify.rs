use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use pesa_core::TopicId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::traits::ITopic;

/// Events fanned out to identity topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PaymentReceived,
    WithdrawalCompleted,
    TokenPurchased,
    CampaignJoined,
    EntryUpdated,
    ParticipantJoined,
    CampaignAirdrop,
    AccountCreated,
}

impl EventKind {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PaymentReceived => "transaction",
            Self::WithdrawalCompleted => "withdrawal",
            Self::TokenPurchased => "buy",
            Self::CampaignJoined => "join",
            Self::EntryUpdated => "update",
            Self::ParticipantJoined => "joined_campaign",
            Self::CampaignAirdrop => "airdrop",
            Self::AccountCreated => "account",
        }
    }

    /// Human-readable message body.
    pub fn message(&self) -> &'static str {
        match self {
            Self::PaymentReceived => "Payment received",
            Self::WithdrawalCompleted => "Withdrawal completed",
            Self::TokenPurchased => "Token purchased successfully",
            Self::CampaignJoined => "Campaign joined successfully",
            Self::EntryUpdated => "Campaign entry updated successfully",
            Self::ParticipantJoined => "A user joined your campaign",
            Self::CampaignAirdrop => "Reward tokens airdropped successfully",
            Self::AccountCreated => "Account created successfully",
        }
    }
}

/// The serialized payload published to a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub message_content: String,
    pub timestamp: i64,
}

impl NotificationMessage {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind: kind.kind().to_string(),
            message_content: kind.message().to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

struct Job {
    topic: TopicId,
    kind: EventKind,
}

/// Best-effort, at-most-once notification fan-out.
///
/// A bounded work queue consumed by a pool of workers, so backpressure and
/// drain state are observable instead of living in detached tasks. Dropped
/// (queue full) and failed publishes are logged and never fail the
/// enclosing operation — notification is advisory, outside the consistency
/// boundary.
///
/// Must be constructed inside a tokio runtime.
pub struct Notifier {
    tx: mpsc::Sender<Job>,
    in_flight: Arc<AtomicUsize>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Notifier {
    pub fn new(topics: Arc<dyn ITopic>, capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let handles = (0..workers.max(1))
            .map(|_| {
                let rx = Arc::clone(&rx);
                let topics = Arc::clone(&topics);
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only across recv so workers drain in
                        // parallel.
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else { break };

                        let message = NotificationMessage::new(job.kind);
                        match serde_json::to_vec(&message) {
                            Ok(payload) => {
                                if let Err(e) = topics.publish(&job.topic, &payload).await {
                                    tracing::warn!(
                                        topic = %job.topic,
                                        kind = job.kind.kind(),
                                        error = %e,
                                        "notification publish failed"
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "notification serialization failed")
                            }
                        }
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                })
            })
            .collect();

        Self {
            tx,
            in_flight,
            workers: std::sync::Mutex::new(handles),
        }
    }

    /// Enqueue one notification. At most once: a full queue drops it with a
    /// warning.
    pub fn notify(&self, topic: &TopicId, kind: EventKind) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let job = Job {
            topic: topic.clone(),
            kind,
        };
        if let Err(e) = self.tx.try_send(job) {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(topic = %topic, kind = kind.kind(), error = %e, "notification dropped");
        }
    }

    /// Notifications accepted but not yet attempted.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait until every accepted notification has been attempted.
    pub async fn drained(&self) {
        while self.pending() > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    /// Drain the queue, then stop the workers.
    pub async fn shutdown(&self) {
        self.drained().await;
        let handles = {
            let mut guard = self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            handle.abort();
        }
    }
}
