//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Error taxonomy for batch delivery."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

/// Failures raised while talking to the storage endpoint.
///
/// A non-200 answer to an upload is not an error; it is reported as
/// [`crate::UploadOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum UplinkError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// The batch could not be encoded as JSON.
    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
    /// DNS, connection or timeout failure.
    #[error("transport failure talking to {endpoint}: {source}")]
    Transport {
        /// Endpoint the request was addressed to.
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered a fetch with something other than 200.
    #[error("{endpoint} answered with status {status}")]
    UnexpectedStatus {
        /// Endpoint the request was addressed to.
        endpoint: String,
        /// Numeric HTTP status.
        status: u16,
    },
    /// The stored document is not a valid batch.
    #[error("stored batch at {endpoint} is malformed: {source}")]
    Decode {
        /// Endpoint the document was read from.
        endpoint: String,
        /// Decoder error, including record validation failures.
        #[source]
        source: serde_json::Error,
    },
}
