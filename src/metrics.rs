//! Performance metrics and outcome statistics for the scoring service.

use crate::threat::{GlobalThreatStats, ThreatMonitor};
use crate::types::result::{Decision, RiskFactor, RiskResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::info;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Metrics collector for the scoring service
pub struct PipelineMetrics {
    /// Transactions that produced a result
    pub transactions_scored: AtomicU64,
    /// Payloads rejected as malformed
    pub inputs_rejected: AtomicU64,
    /// Results produced while a predictor was unavailable or failed
    pub degraded_scorings: AtomicU64,
    decisions: RwLock<HashMap<Decision, u64>>,
    factors: RwLock<HashMap<RiskFactor, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Score histogram, buckets of width 10 (100 lands in the last)
    score_buckets: RwLock<[u64; 10]>,
    /// Outcomes since the last threat update
    window: RwLock<Vec<(u8, Decision)>>,
    threat: RwLock<ThreatMonitor>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            inputs_rejected: AtomicU64::new(0),
            degraded_scorings: AtomicU64::new(0),
            decisions: RwLock::new(HashMap::new()),
            factors: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            window: RwLock::new(Vec::with_capacity(1000)),
            threat: RwLock::new(ThreatMonitor::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_result(&self, processing_time: Duration, result: &RiskResult, degraded: bool) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_scorings.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut times = write(&self.processing_times);
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (result.score as usize / 10).min(9);
        write(&self.score_buckets)[bucket] += 1;

        *write(&self.decisions).entry(result.decision).or_insert(0) += 1;

        {
            let mut factors = write(&self.factors);
            for factor in &result.factors {
                *factors.entry(*factor).or_insert(0) += 1;
            }
        }

        write(&self.window).push((result.score, result.decision));
    }

    /// Record a payload that could not be scored
    pub fn record_rejection(&self) {
        self.inputs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold outcomes since the last call into the global threat level.
    pub fn roll_threat_window(&self) -> GlobalThreatStats {
        let batch: Vec<(u8, Decision)> = std::mem::take(&mut *write(&self.window));
        let mut threat = write(&self.threat);
        threat.update(&batch).clone()
    }

    pub fn threat_stats(&self) -> GlobalThreatStats {
        read(&self.threat).stats().clone()
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = read(&self.processing_times).clone();
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Transactions scored per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        *read(&self.score_buckets)
    }

    pub fn get_decision_count(&self, decision: Decision) -> u64 {
        read(&self.decisions).get(&decision).copied().unwrap_or(0)
    }

    pub fn get_factor_counts(&self) -> HashMap<RiskFactor, u64> {
        read(&self.factors).clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let rejected = self.inputs_rejected.load(Ordering::Relaxed);
        let degraded = self.degraded_scorings.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let threat = self.threat_stats();
        let pct = |n: u64| {
            if scored > 0 {
                n as f64 / scored as f64 * 100.0
            } else {
                0.0
            }
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              RISK ENGINE - METRICS SUMMARY                   ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Scored: {:>8}  Rejected: {:>6}  Throughput: {:>7.1} tx/s ║",
            scored,
            rejected,
            self.get_throughput()
        );
        info!(
            "║ Degraded-mode scorings: {:>8} ({:>5.1}%)                     ║",
            degraded,
            pct(degraded)
        );
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        for decision in [Decision::Allow, Decision::Flag, Decision::Block] {
            let count = self.get_decision_count(decision);
            info!("║   {:6}: {:>8} ({:>5.1}%)", decision.as_str(), count, pct(count));
        }
        for (factor, count) in self.get_factor_counts() {
            info!("║   {}: {}", factor, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Risk Score Distribution:                                     ║");
        let distribution = self.get_score_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let share = if total > 0 { count as f64 / total as f64 * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((share / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                if i == 9 { 100 } else { i * 10 + 9 },
                count,
                share,
                bar
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Threat level: {:?}  avg risk: {:.1}  flagged: {}  blocked: {}",
            threat.threat_level, threat.average_risk_score, threat.flagged_count, threat.blocked_count
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically updates the threat level and prints a summary
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let threat = self.metrics.roll_threat_window();
            info!(
                threat_level = ?threat.threat_level,
                average_risk_score = threat.average_risk_score,
                total = threat.total_transactions,
                "Threat level updated"
            );
            self.metrics.print_summary();
        }
    }
}
