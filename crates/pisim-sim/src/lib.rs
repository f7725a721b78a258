//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Transaction record model and generator exports."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Synthetic energy transactions between a sun, a prosumer and a consumer.
//!
//! Records are produced by [`TransactionGenerator`] and collected into a
//! [`Batch`], which serializes to the JSON array posted by the uplink.

pub mod batch;
pub mod generator;
pub mod records;

pub use batch::{Batch, BatchSummary};
pub use generator::{Clock, SystemClock, TransactionGenerator, DEFAULT_PACING};
pub use records::{
    ParticipantId, ParticipantPair, RecordError, TransactionRecord, MAX_TRANSACTION,
    MIN_TRANSACTION,
};
