//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Batch delivery to the remote JSON storage endpoint."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Delivers a generated [`pisim_sim::Batch`] to the JSON storage endpoint in a
//! single POST and reads stored batches back.

pub mod error;
pub mod uploader;

pub use error::UplinkError;
pub use uploader::{report_outcome, BatchUploader, UploadOutcome, SUCCESS_MESSAGE};
