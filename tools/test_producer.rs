//! Test Transaction Producer
//!
//! Sends generated transactions to the risk engine over NATS request/reply
//! and logs the decisions that come back.

use chrono::{Timelike, Utc};
use hybrid_risk_engine::{
    types::{Decision, RejectedTransaction, RiskAssessment, Transaction},
    HealthStatus,
};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const HEALTH_SUBJECT: &str = "risk.health";

/// Transactions in one attack burst
const ATTACK_BURST_SIZE: usize = 10;

/// Either outcome the engine can reply with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EngineReply {
    Assessment(Box<RiskAssessment>),
    Rejected(RejectedTransaction),
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a random legitimate transaction: small amount, daytime
    fn generate_legitimate(&mut self) -> Transaction {
        let now = Utc::now();
        let hour = self.rng.gen_range(8..22);
        let timestamp = now.timestamp() - now.hour() as i64 * 3600 + hour * 3600;

        Transaction::new(
            (self.rng.gen_range(10.0..500.0_f64) * 100.0).round() / 100.0,
            timestamp,
            self.random_choice(&["grocery_store", "coffee_shop", "gas_station", "pharmacy"]),
            self.random_choice(&["London", "Paris", "Berlin", "New York", "Toronto"]),
        )
    }

    /// Generate a suspicious transaction: large amount, night hours
    fn generate_suspicious(&mut self) -> Transaction {
        let now = Utc::now();
        let hour = self.rng.gen_range(0..6);
        let timestamp = now.timestamp() - now.hour() as i64 * 3600 + hour * 3600;

        Transaction::new(
            (self.rng.gen_range(1000.0..10000.0_f64) * 100.0).round() / 100.0,
            timestamp,
            self.random_choice(&["electronics_online", "gift_cards", "crypto_exchange"]),
            self.random_choice(&["Unknown", "Lagos", "Moscow", "Offshore"]),
        )
    }

    /// Generate a velocity attack: rapid high-value transactions to one
    /// merchant from one location within the same second
    fn generate_attack_burst(&mut self) -> Vec<Transaction> {
        let now = Utc::now().timestamp();
        (0..ATTACK_BURST_SIZE)
            .map(|_| {
                Transaction::new(
                    (self.rng.gen_range(9000.0..9500.0_f64) * 100.0).round() / 100.0,
                    now,
                    "crypto_exchange_x",
                    "unknown_proxy_ip",
                )
            })
            .collect()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Outcomes of sent requests
#[derive(Default)]
struct Tally {
    scored: u64,
    failed: u64,
    decisions: [u64; 3],
}

impl Tally {
    fn summary(&self) -> String {
        format!(
            "ALLOW {}, FLAG {}, BLOCK {}, failed {}",
            self.decisions[0], self.decisions[1], self.decisions[2], self.failed
        )
    }
}

/// Send one transaction as a request and log the engine's answer
async fn send(
    client: &async_nats::Client,
    subject: &str,
    transaction: &Transaction,
    tally: &mut Tally,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(transaction)?;

    match client.request(subject.to_string(), payload.into()).await {
        Ok(response) => match serde_json::from_slice::<EngineReply>(&response.payload) {
            Ok(EngineReply::Assessment(assessment)) => {
                tally.scored += 1;
                let slot = match assessment.result.decision {
                    Decision::Allow => 0,
                    Decision::Flag => 1,
                    Decision::Block => 2,
                };
                tally.decisions[slot] += 1;
                info!(
                    amount = transaction.amount,
                    merchant = %transaction.merchant,
                    score = assessment.result.score,
                    decision = %assessment.result.decision,
                    factors = ?assessment.result.factors,
                    "Scored"
                );
            }
            Ok(EngineReply::Rejected(rejected)) => {
                tally.failed += 1;
                warn!(error = %rejected.error, "Engine rejected transaction");
            }
            Err(e) => {
                tally.failed += 1;
                warn!(error = %e, "Unreadable reply");
            }
        },
        Err(e) => {
            tally.failed += 1;
            warn!(error = %e, "Request failed");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let suspicious_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    // 0 disables attack bursts
    let burst_every: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(0);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        suspicious_rate = suspicious_rate,
        delay_ms = delay_ms,
        burst_every = burst_every,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, suspicious_rate, delay_ms, burst_every).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to send {} transactions...", count);

    let mut tally = Tally::default();

    for i in 0..count {
        let transaction = if rng.gen_bool(suspicious_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        send(&client, subject, &transaction, &mut tally).await?;

        if burst_every > 0 && (i + 1) % burst_every == 0 {
            warn!("Launching attack burst of {} transactions", ATTACK_BURST_SIZE);
            for attack in generator.generate_attack_burst() {
                send(&client, subject, &attack, &mut tally).await?;
            }
        }

        if (i + 1) % 10 == 0 {
            info!("Sent {}/{} transactions ({})", i + 1, count, tally.summary());
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! {} scored ({})", tally.scored, tally.summary());

    match client.request(HEALTH_SUBJECT, "".into()).await {
        Ok(response) => match serde_json::from_slice::<HealthStatus>(&response.payload) {
            Ok(health) => info!(
                status = %health.status,
                models_loaded = health.models_loaded,
                model_version = %health.model_version,
                "Engine health"
            ),
            Err(e) => warn!(error = %e, "Unreadable health reply"),
        },
        Err(e) => warn!(error = %e, "Health check failed"),
    }

    Ok(())
}

async fn run_dry_mode(
    count: u64,
    suspicious_rate: f64,
    delay_ms: u64,
    burst_every: u64,
) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(suspicious_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        if burst_every > 0 && (i + 1) % burst_every == 0 {
            let burst = generator.generate_attack_burst();
            info!("Sample attack burst:\n{}", serde_json::to_string_pretty(&burst)?);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_burst_shape() {
        let burst = TransactionGenerator::new().generate_attack_burst();

        assert_eq!(burst.len(), ATTACK_BURST_SIZE);
        for tx in &burst {
            assert!(tx.validate().is_ok());
            assert!((9000.0..=9500.0).contains(&tx.amount));
            assert_eq!(tx.merchant, "crypto_exchange_x");
            assert_eq!(tx.location, "unknown_proxy_ip");
            assert_eq!(tx.timestamp, burst[0].timestamp);
        }
    }

    #[test]
    fn test_generated_transactions_are_valid() {
        let mut generator = TransactionGenerator::new();
        for _ in 0..50 {
            let legit = generator.generate_legitimate();
            assert!(legit.validate().is_ok());
            assert!(legit.amount <= 500.0);

            let suspicious = generator.generate_suspicious();
            assert!(suspicious.validate().is_ok());
            assert!(suspicious.amount >= 1000.0);
            assert!(suspicious.timestamp.rem_euclid(86_400) / 3_600 < 6);
        }
    }
}
