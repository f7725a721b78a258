//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Participant identifiers and transaction record value type."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest transacted quantity a record may carry.
pub const MIN_TRANSACTION: u32 = 10;
/// Largest transacted quantity a record may carry.
pub const MAX_TRANSACTION: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unknown participant id '{0}'")]
    UnknownParticipant(String),
    #[error("{producer} may not supply {consumer}")]
    DisallowedPair {
        consumer: ParticipantId,
        producer: ParticipantId,
    },
    #[error("transaction quantity {0} outside [10, 100]")]
    QuantityOutOfRange(u32),
    #[error("timestamp '{0}' is not decimal epoch milliseconds")]
    InvalidTimestamp(String),
}

/// Fixed set of simulated actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantId {
    #[serde(rename = "ID000")]
    Sun,
    #[serde(rename = "ID100")]
    Consumer,
    #[serde(rename = "ID101")]
    Prosumer,
}

impl ParticipantId {
    /// Identifier carried on the wire.
    pub const fn wire_id(self) -> &'static str {
        match self {
            ParticipantId::Sun => "ID000",
            ParticipantId::Consumer => "ID100",
            ParticipantId::Prosumer => "ID101",
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl FromStr for ParticipantId {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ID000" => Ok(ParticipantId::Sun),
            "ID100" => Ok(ParticipantId::Consumer),
            "ID101" => Ok(ParticipantId::Prosumer),
            other => Err(RecordError::UnknownParticipant(other.to_owned())),
        }
    }
}

/// The only energy flows the simulation allows.
///
/// A sun never consumes and a consumer never produces, so of the six ordered
/// pairs only these two are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantPair {
    /// The consumer draws from the prosumer.
    ConsumerFromProsumer,
    /// The prosumer draws from the sun.
    ProsumerFromSun,
}

impl ParticipantPair {
    pub const ALL: [ParticipantPair; 2] = [
        ParticipantPair::ConsumerFromProsumer,
        ParticipantPair::ProsumerFromSun,
    ];

    pub const fn consumer(self) -> ParticipantId {
        match self {
            ParticipantPair::ConsumerFromProsumer => ParticipantId::Consumer,
            ParticipantPair::ProsumerFromSun => ParticipantId::Prosumer,
        }
    }

    pub const fn producer(self) -> ParticipantId {
        match self {
            ParticipantPair::ConsumerFromProsumer => ParticipantId::Prosumer,
            ParticipantPair::ProsumerFromSun => ParticipantId::Sun,
        }
    }

    pub fn from_ids(
        consumer: ParticipantId,
        producer: ParticipantId,
    ) -> Result<Self, RecordError> {
        Self::ALL
            .into_iter()
            .find(|pair| pair.consumer() == consumer && pair.producer() == producer)
            .ok_or(RecordError::DisallowedPair { consumer, producer })
    }
}

/// One simulated energy transfer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord", into = "WireRecord")]
pub struct TransactionRecord {
    timestamp_ms: u64,
    pair: ParticipantPair,
    transaction: u32,
}

impl TransactionRecord {
    pub fn new(
        pair: ParticipantPair,
        transaction: u32,
        timestamp_ms: u64,
    ) -> Result<Self, RecordError> {
        if !(MIN_TRANSACTION..=MAX_TRANSACTION).contains(&transaction) {
            return Err(RecordError::QuantityOutOfRange(transaction));
        }
        Ok(Self {
            timestamp_ms,
            pair,
            transaction,
        })
    }

    /// Caller guarantees `transaction` is within range.
    pub(crate) fn from_parts(pair: ParticipantPair, transaction: u32, timestamp_ms: u64) -> Self {
        debug_assert!((MIN_TRANSACTION..=MAX_TRANSACTION).contains(&transaction));
        Self {
            timestamp_ms,
            pair,
            transaction,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn pair(&self) -> ParticipantPair {
        self.pair
    }

    pub fn consumer(&self) -> ParticipantId {
        self.pair.consumer()
    }

    pub fn producer(&self) -> ParticipantId {
        self.pair.producer()
    }

    pub fn transaction(&self) -> u32 {
        self.transaction
    }
}

/// Wire shape of a record. Field order is the order keys appear in JSON.
#[derive(Serialize, Deserialize)]
struct WireRecord {
    timestamp: String,
    consumer: ParticipantId,
    producer: ParticipantId,
    transaction: u32,
}

impl From<TransactionRecord> for WireRecord {
    fn from(record: TransactionRecord) -> Self {
        Self {
            timestamp: record.timestamp_ms.to_string(),
            consumer: record.consumer(),
            producer: record.producer(),
            transaction: record.transaction,
        }
    }
}

impl TryFrom<WireRecord> for TransactionRecord {
    type Error = RecordError;

    fn try_from(raw: WireRecord) -> Result<Self, Self::Error> {
        let timestamp_ms = parse_timestamp(&raw.timestamp)?;
        let pair = ParticipantPair::from_ids(raw.consumer, raw.producer)?;
        TransactionRecord::new(pair, raw.transaction, timestamp_ms)
    }
}

/// Canonical decimal only: digits, no leading zeros, so a decoded record
/// re-serializes to the same text.
fn parse_timestamp(raw: &str) -> Result<u64, RecordError> {
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if !canonical {
        return Err(RecordError::InvalidTimestamp(raw.to_owned()));
    }
    raw.parse()
        .map_err(|_| RecordError::InvalidTimestamp(raw.to_owned()))
}
