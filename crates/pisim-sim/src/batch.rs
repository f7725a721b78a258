//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Ordered batch of transaction records sent in one upload."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::records::{ParticipantPair, TransactionRecord};

/// Ordered records of a single run. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    records: Vec<TransactionRecord>,
}

impl Batch {
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub(crate) fn push(&mut self, record: TransactionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransactionRecord> {
        self.records.iter()
    }

    /// Compact JSON array, the exact request body of an upload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Decode a stored batch, validating every record.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// True when timestamps never decrease from one record to the next.
    pub fn is_chronological(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].timestamp_ms() <= pair[1].timestamp_ms())
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            records: self.records.len(),
            ..BatchSummary::default()
        };
        for record in &self.records {
            match record.pair() {
                ParticipantPair::ConsumerFromProsumer => summary.consumer_from_prosumer += 1,
                ParticipantPair::ProsumerFromSun => summary.prosumer_from_sun += 1,
            }
            summary.total_quantity += u64::from(record.transaction());
        }
        summary.first_timestamp_ms = self.records.first().map(TransactionRecord::timestamp_ms);
        summary.last_timestamp_ms = self.records.last().map(TransactionRecord::timestamp_ms);
        summary
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a TransactionRecord;
    type IntoIter = std::slice::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Aggregate view of a batch used for log lines and the fetch report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub consumer_from_prosumer: usize,
    pub prosumer_from_sun: usize,
    pub total_quantity: u64,
    pub first_timestamp_ms: Option<u64>,
    pub last_timestamp_ms: Option<u64>,
}
