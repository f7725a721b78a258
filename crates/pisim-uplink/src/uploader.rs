//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Single-shot batch upload and stored batch retrieval."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::time::Duration;

use pisim_sim::Batch;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::UplinkError;

/// Line printed once when the storage endpoint accepts a batch.
pub const SUCCESS_MESSAGE: &str = "Unit test created in IoT server";

/// Result of a completed upload round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The endpoint answered HTTP 200.
    Created,
    /// The endpoint answered with any other status. Not retried.
    Rejected {
        /// Numeric HTTP status.
        status: u16,
    },
}

impl UploadOutcome {
    /// True only for an HTTP 200 answer.
    pub fn is_created(&self) -> bool {
        matches!(self, UploadOutcome::Created)
    }
}

/// Posts batches to, and reads them from, one storage endpoint.
#[derive(Debug, Clone)]
pub struct BatchUploader {
    client: Client,
    endpoint: Url,
}

impl BatchUploader {
    /// Build an uploader. Without `timeout` the transport default applies.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, UplinkError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(UplinkError::Client)?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint this uploader talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send the whole batch as one JSON array in a single POST.
    ///
    /// There is no retry: a transport failure is returned as an error and any
    /// non-200 answer as [`UploadOutcome::Rejected`].
    pub async fn upload(&self, batch: &Batch) -> Result<UploadOutcome, UplinkError> {
        let body = batch.to_json()?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), records = batch.len(), "posting batch");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| self.transport(source))?;

        let status = response.status();
        if status == StatusCode::OK {
            info!(endpoint = %self.endpoint, records = batch.len(), "batch accepted");
            Ok(UploadOutcome::Created)
        } else {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "batch not accepted");
            Ok(UploadOutcome::Rejected {
                status: status.as_u16(),
            })
        }
    }

    /// Read the batch currently stored at the endpoint.
    pub async fn fetch(&self) -> Result<Batch, UplinkError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|source| self.transport(source))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UplinkError::UnexpectedStatus {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| self.transport(source))?;
        let batch = Batch::from_json(&body).map_err(|source| UplinkError::Decode {
            endpoint: self.endpoint.to_string(),
            source,
        })?;
        debug!(endpoint = %self.endpoint, records = batch.len(), "fetched stored batch");
        Ok(batch)
    }

    fn transport(&self, source: reqwest::Error) -> UplinkError {
        UplinkError::Transport {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

/// Write the success line for a created batch; other outcomes stay silent.
///
/// Returns whether anything was written.
pub fn report_outcome(outcome: UploadOutcome, out: &mut impl Write) -> io::Result<bool> {
    if outcome.is_created() {
        writeln!(out, "{SUCCESS_MESSAGE}")?;
        return Ok(true);
    }
    Ok(false)
}
