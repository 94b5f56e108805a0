//! NATS publisher for risk assessments and replies

use crate::types::assessment::RiskAssessment;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Publishes assessments and answers request/reply callers
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish an assessment on the result subject
    pub async fn publish(&self, assessment: &RiskAssessment) -> Result<()> {
        let payload = serde_json::to_vec(assessment)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            assessment_id = %assessment.assessment_id,
            score = assessment.result.score,
            decision = %assessment.result.decision,
            "Published risk assessment"
        );

        Ok(())
    }

    /// Send a JSON reply to a requester's inbox
    pub async fn reply<T: Serialize>(&self, reply_to: Subject, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
