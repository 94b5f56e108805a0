//! Hybrid Risk Engine - Main Entry Point
//!
//! Consumes transactions from NATS, scores them with the hybrid engine and
//! publishes risk assessments. Requesters get the assessment as a reply.

use anyhow::Result;
use async_nats::Subject;
use futures::StreamExt;
use hybrid_risk_engine::{
    config::{AppConfig, LoggingConfig},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    producer::ResultProducer,
    types::{Decision, RejectedTransaction, RiskAssessment, Transaction},
    RiskEngine,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("hybrid_risk_engine={}", config.level)),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let config = AppConfig::load_from_path(&config_path)?;

    init_logging(&config.logging)?;
    info!(config = %config_path, "Starting Hybrid Risk Engine");

    let engine = Arc::new(RiskEngine::from_config(&config)?);
    let metrics = Arc::new(PipelineMetrics::new());
    info!(
        features = engine.feature_extractor().feature_count(),
        signal_source = engine.feature_extractor().signal_source(),
        health = ?engine.health(),
        "Risk engine initialized"
    );

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(
        client.clone(),
        &config.nats.transaction_subject,
        &config.nats.queue_group,
    );
    let producer = ResultProducer::new(client.clone(), &config.nats.result_subject);

    // Health checks
    let mut health_requests = consumer.subscribe_health(&config.nats.health_subject).await?;
    {
        let engine = engine.clone();
        let producer = producer.clone();
        tokio::spawn(async move {
            while let Some(message) = health_requests.next().await {
                if let Some(reply) = message.reply {
                    if let Err(e) = producer.reply(reply, &engine.health()).await {
                        warn!(error = %e, "Failed to answer health check");
                    }
                }
            }
        });
    }

    {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let num_workers = config.pipeline.workers;
    info!(workers = num_workers, "Starting transaction scoring loop");
    info!("Publishing assessments to: {}", producer.subject());

    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let producer = Arc::new(producer);

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let engine = engine.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let reply = message.reply.clone();

            let transaction = match serde_json::from_slice::<Transaction>(&message.payload) {
                Ok(tx) => tx,
                Err(e) => {
                    reject(&producer, &metrics, reply, format!("malformed transaction: {}", e)).await;
                    return;
                }
            };

            let outcome = match engine.evaluate(&transaction) {
                Ok(outcome) => outcome,
                Err(e) => {
                    reject(&producer, &metrics, reply, e.to_string()).await;
                    return;
                }
            };

            let processing_time = start_time.elapsed();
            metrics.record_result(processing_time, &outcome.result, outcome.degraded);
            let assessment = RiskAssessment::new(transaction, outcome.result, processing_time);

            if let Some(reply) = reply {
                if let Err(e) = producer.reply(reply, &assessment).await {
                    error!(assessment_id = %assessment.assessment_id, error = %e, "Failed to reply");
                }
            }
            if let Err(e) = producer.publish(&assessment).await {
                error!(assessment_id = %assessment.assessment_id, error = %e, "Failed to publish assessment");
            }

            match assessment.result.decision {
                Decision::Allow => debug!(
                    assessment_id = %assessment.assessment_id,
                    score = assessment.result.score,
                    processing_time_us = assessment.processing_time_us,
                    "Transaction allowed"
                ),
                decision => info!(
                    assessment_id = %assessment.assessment_id,
                    score = assessment.result.score,
                    decision = %decision,
                    factors = ?assessment.result.factors,
                    merchant = %assessment.transaction.merchant,
                    processing_time_us = assessment.processing_time_us,
                    "Risky transaction"
                ),
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                    avg_latency_us = stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Risk engine shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Count a rejected payload and tell the requester why.
async fn reject(
    producer: &ResultProducer,
    metrics: &PipelineMetrics,
    reply: Option<Subject>,
    reason: String,
) {
    metrics.record_rejection();
    warn!(error = %reason, "Transaction rejected");

    if let Some(reply) = reply {
        let body = RejectedTransaction { error: reason };
        if let Err(e) = producer.reply(reply, &body).await {
            error!(error = %e, "Failed to send rejection");
        }
    }
}
