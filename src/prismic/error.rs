//! Content service errors

use thiserror::Error;

/// Errors returned by the content service client.
///
/// These are propagated to the page generators unchanged; nothing retries.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Transport failure (DNS, TLS, connection reset, ...)
    #[error("request to content service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("content service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the JSON shape we expect
    #[error("malformed content service response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No document matched the lookup
    #[error("no {doc_type} document with {field} \"{value}\"")]
    NotFound {
        doc_type: String,
        field: &'static str,
        value: String,
    },

    /// The API root did not advertise a master ref
    #[error("content service API root has no master ref")]
    NoMasterRef,

    /// The configured endpoint is empty or not a URL
    #[error("invalid content service endpoint: {0:?}")]
    InvalidEndpoint(String),
}

impl ContentError {
    /// Whether the error means "this document does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type ContentResult<T> = Result<T, ContentError>;
