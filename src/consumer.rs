//! NATS subscriptions for incoming transactions and health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving transactions from NATS.
///
/// Engine replicas share a queue group so each transaction is scored once.
pub struct TransactionConsumer {
    client: Client,
    subject: String,
    queue_group: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str, queue_group: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group.to_string(),
        }
    }

    /// Join the queue group on the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .queue_subscribe(self.subject.clone(), self.queue_group.clone())
            .await?;
        info!(
            subject = %self.subject,
            queue_group = %self.queue_group,
            "Subscribed to transaction subject"
        );
        Ok(subscriber)
    }

    /// Subscribe to the health subject. Every replica answers.
    pub async fn subscribe_health(&self, health_subject: &str) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(health_subject.to_string()).await?;
        info!(subject = %health_subject, "Subscribed to health subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
