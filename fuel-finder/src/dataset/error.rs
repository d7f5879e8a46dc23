//! Dataset fetch error types.

/// Errors that can occur when fetching the station dataset.
///
/// None of these are retried automatically; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure (DNS, connection, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Body is not JSON or lacks the station list
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
}

impl FetchError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            message: message.into(),
        }
    }
}
