//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Randomised transaction generator with pacing."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::thread;
use std::time::Duration;

use pisim_common::config::GeneratorConfig;
use pisim_common::time::unix_millis;
use rand::prelude::*;
use tracing::{debug, info};

use crate::batch::Batch;
use crate::records::{ParticipantPair, TransactionRecord, MAX_TRANSACTION, MIN_TRANSACTION};

/// Pause inserted after each record so consecutive stamps differ.
pub const DEFAULT_PACING: Duration = Duration::from_millis(200);

/// Source of record timestamps in epoch milliseconds.
pub trait Clock {
    fn now_millis(&mut self) -> u64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&mut self) -> u64 {
        u64::try_from(unix_millis()).unwrap_or(0)
    }
}

/// Produces randomised transaction records and paces batch generation.
#[derive(Debug)]
pub struct TransactionGenerator<C = SystemClock> {
    rng: StdRng,
    clock: C,
    pacing: Duration,
    last_timestamp_ms: Option<u64>,
}

impl TransactionGenerator<SystemClock> {
    /// Build a wall-clock generator. Without a seed the RNG is entropy seeded.
    pub fn new(seed: Option<u64>, pacing: Duration) -> Self {
        Self::with_clock(seed, pacing, SystemClock)
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.seed, config.pacing)
    }
}

impl<C: Clock> TransactionGenerator<C> {
    pub fn with_clock(seed: Option<u64>, pacing: Duration, clock: C) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            clock,
            pacing,
            last_timestamp_ms: None,
        }
    }

    /// Draw a single record without pacing.
    ///
    /// Timestamps never run backwards: a wall clock that steps back is
    /// clamped to the previous stamp.
    pub fn next_record(&mut self) -> TransactionRecord {
        let pair = ParticipantPair::ALL[self.rng.gen_range(0..ParticipantPair::ALL.len())];
        let quantity = self.rng.gen_range(MIN_TRANSACTION..=MAX_TRANSACTION);
        let now = self.clock.now_millis();
        let timestamp_ms = match self.last_timestamp_ms {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_timestamp_ms = Some(timestamp_ms);
        TransactionRecord::from_parts(pair, quantity, timestamp_ms)
    }

    /// Generate exactly `count` records, sleeping for the pacing interval
    /// after each one.
    pub fn generate_batch(&mut self, count: usize) -> Batch {
        let mut batch = Batch::default();
        for index in 0..count {
            let record = self.next_record();
            debug!(
                index,
                timestamp_ms = record.timestamp_ms(),
                consumer = %record.consumer(),
                producer = %record.producer(),
                transaction = record.transaction(),
                "generated transaction record"
            );
            batch.push(record);
            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }
        info!(records = batch.len(), pacing_ms = self.pacing.as_millis() as u64, "batch generated");
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ParticipantId;
    use std::time::Instant;

    /// Clock replaying a fixed sequence, repeating the last value.
    #[derive(Debug)]
    struct ScriptedClock {
        ticks: Vec<u64>,
        cursor: usize,
    }

    impl ScriptedClock {
        fn new(ticks: Vec<u64>) -> Self {
            Self { ticks, cursor: 0 }
        }
    }

    impl Clock for ScriptedClock {
        fn now_millis(&mut self) -> u64 {
            let value = self.ticks[self.cursor.min(self.ticks.len() - 1)];
            self.cursor += 1;
            value
        }
    }

    fn fast(seed: u64) -> TransactionGenerator<ScriptedClock> {
        TransactionGenerator::with_clock(
            Some(seed),
            Duration::ZERO,
            ScriptedClock::new(vec![1_700_000_000_000]),
        )
    }

    #[test]
    fn batch_size_matches_count() {
        let mut generator = fast(1);
        assert_eq!(generator.generate_batch(1).len(), 1);
        assert_eq!(generator.generate_batch(5).len(), 5);
        assert!(generator.generate_batch(0).is_empty());
    }

    #[test]
    fn records_respect_pair_and_range_invariants() {
        let mut generator = fast(2024);
        let batch = generator.generate_batch(500);
        let mut seen_sun_pair = false;
        let mut seen_consumer_pair = false;
        for record in &batch {
            match (record.consumer(), record.producer()) {
                (ParticipantId::Consumer, ParticipantId::Prosumer) => seen_consumer_pair = true,
                (ParticipantId::Prosumer, ParticipantId::Sun) => seen_sun_pair = true,
                other => panic!("disallowed pair {other:?}"),
            }
            assert!((MIN_TRANSACTION..=MAX_TRANSACTION).contains(&record.transaction()));
        }
        assert!(seen_sun_pair && seen_consumer_pair);
    }

    #[test]
    fn same_seed_yields_same_batch() {
        let first = fast(99).generate_batch(20);
        let second = fast(99).generate_batch(20);
        assert_eq!(first, second);
    }

    #[test]
    fn timestamps_never_decrease() {
        let clock = ScriptedClock::new(vec![1_000, 1_200, 900, 1_100, 1_500]);
        let mut generator = TransactionGenerator::with_clock(Some(5), Duration::ZERO, clock);
        let batch = generator.generate_batch(5);
        let stamps: Vec<u64> = batch.iter().map(TransactionRecord::timestamp_ms).collect();
        assert_eq!(stamps, vec![1_000, 1_200, 1_200, 1_200, 1_500]);
        assert!(batch.is_chronological());
    }

    #[test]
    fn system_clock_stamps_are_digit_strings() {
        let mut generator = TransactionGenerator::new(None, Duration::ZERO);
        let body = generator.generate_batch(3).to_json().unwrap();
        let values: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        for value in values {
            let stamp = value["timestamp"].as_str().unwrap();
            assert!(!stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn pacing_delays_each_record() {
        let mut generator = TransactionGenerator::new(Some(3), Duration::from_millis(10));
        let started = Instant::now();
        let batch = generator.generate_batch(3);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(batch.is_chronological());
    }

    #[test]
    fn generates_largest_allowed_batch() {
        let config = GeneratorConfig {
            count: pisim_common::config::MAX_COUNT,
            pacing: Duration::ZERO,
            seed: Some(1),
        };
        let batch = TransactionGenerator::from_config(&config).generate_batch(config.count);
        assert_eq!(batch.len(), config.count);
    }

    #[test]
    fn config_default_matches_pacing_constant() {
        assert_eq!(GeneratorConfig::default().pacing, DEFAULT_PACING);
    }

    #[test]
    fn from_config_uses_seed_and_pacing() {
        let config = GeneratorConfig {
            count: 2,
            pacing: Duration::ZERO,
            seed: Some(11),
        };
        let mut a = TransactionGenerator::from_config(&config);
        let mut b = TransactionGenerator::from_config(&config);
        let left: Vec<_> = a.generate_batch(4).iter().map(|r| (r.pair(), r.transaction())).collect();
        let right: Vec<_> = b.generate_batch(4).iter().map(|r| (r.pair(), r.transaction())).collect();
        assert_eq!(left, right);
    }
}
