//! Geographic and behavioural-history signal sources.
//!
//! The feature vector carries two anomaly-likelihood signals that come from
//! outside the transaction record itself. A production deployment backs them
//! with a feature store; the sources here cover local runs and tests.

use crate::config::{SignalSourceKind, SignalsConfig};
use crate::types::transaction::Transaction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::sync::Mutex;

/// Supplies the `geo_signal` and `history_signal` features, each in `[0, 1]`.
pub trait SignalSource: Send + Sync {
    /// Likelihood that the transaction location is anomalous
    fn geo_signal(&self, tx: &Transaction) -> f64;

    /// Likelihood that the transaction deviates from past behaviour
    fn history_signal(&self, tx: &Transaction) -> f64;

    fn name(&self) -> &'static str;
}

/// Build the signal source selected in configuration.
pub fn from_config(config: &SignalsConfig) -> Box<dyn SignalSource> {
    match config.source {
        SignalSourceKind::Deterministic => Box::new(DeterministicSignals),
        SignalSourceKind::Random => match config.seed {
            Some(seed) => Box::new(RandomSignals::seeded(seed)),
            None => Box::new(RandomSignals::new()),
        },
    }
}

/// Reproducible signals derived from a SHA-256 digest of the identifiers.
///
/// Identical transactions always get identical signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicSignals;

impl DeterministicSignals {
    fn unit_digest(parts: &[&str]) -> f64 {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        // Top 53 bits map exactly onto an f64 mantissa in [0, 1)
        (u64::from_be_bytes(head) >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl SignalSource for DeterministicSignals {
    fn geo_signal(&self, tx: &Transaction) -> f64 {
        Self::unit_digest(&["geo", &tx.location])
    }

    fn history_signal(&self, tx: &Transaction) -> f64 {
        Self::unit_digest(&["history", &tx.merchant, &tx.location])
    }

    fn name(&self) -> &'static str {
        "deterministic"
    }
}

/// Uniform random placeholder signals.
///
/// Identical transactions may score differently between calls. Use
/// [`RandomSignals::seeded`] when a reproducible sequence is needed.
pub struct RandomSignals {
    rng: Mutex<StdRng>,
}

impl RandomSignals {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen::<f64>()
    }
}

impl Default for RandomSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for RandomSignals {
    fn geo_signal(&self, _tx: &Transaction) -> f64 {
        self.next()
    }

    fn history_signal(&self, _tx: &Transaction) -> f64 {
        self.next()
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Constant signals, mainly for tests and offline replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedSignals {
    pub geo: f64,
    pub history: f64,
}

impl FixedSignals {
    pub fn new(geo: f64, history: f64) -> Self {
        Self { geo, history }
    }
}

impl SignalSource for FixedSignals {
    fn geo_signal(&self, _tx: &Transaction) -> f64 {
        self.geo
    }

    fn history_signal(&self, _tx: &Transaction) -> f64 {
        self.history
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
