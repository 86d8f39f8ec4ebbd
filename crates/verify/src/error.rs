use std::time::Duration;

use verificat_almanac::AlmanacError;

/// Failure retrieving data from the catalog or an ownership source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The request could not be sent or the connection failed.
    #[error("could not reach {target}: {message}")]
    Transport { target: String, message: String },

    /// The remote answered with a non-success status.
    #[error("non-success status {status} from {target}")]
    Status { target: String, status: u16 },

    /// The retrieval did not finish within its own timeout.
    #[error("timed out after {after:?} waiting for {target}")]
    Timeout { target: String, after: Duration },

    /// The response body could not be read or decoded.
    #[error("could not decode response from {target}: {message}")]
    Decode { target: String, message: String },

    /// The catalog has no entity with this name.
    #[error("service '{service}' not found in catalog")]
    NotFound { service: String },

    /// The retrieval task panicked or was cancelled.
    #[error("fetch task for {target} failed: {message}")]
    Task { target: String, message: String },
}

/// Failure of a whole verification run.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Catalog lookup failed; the run was aborted before scoring.
    #[error("service unknown or catalog unreachable: {service}: {source}")]
    Catalog {
        service: String,
        #[source]
        source: LookupError,
    },

    /// Scoring succeeded but the result could not be persisted.
    #[error("failed to record run: {0}")]
    Store(#[from] AlmanacError),

    /// The blocking persistence task did not complete.
    #[error("persistence task failed: {0}")]
    Task(String),
}
