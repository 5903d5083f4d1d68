use snafu::Snafu;

/// Error of the [`BriqClient`](crate::client::BriqClient).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Secret key is empty.
    #[snafu(display("Briq secret key must not be empty"))]
    EmptySecretKey,

    /// HTTP client cannot be initialized.
    #[snafu(display("Failed to build HTTP client, error: {source}"))]
    BuildHttpClient {
        /// Underlying error.
        source: reqwest::Error,
    },

    /// Request could not be sent or the response could not be read.
    #[snafu(display("Failed to send request to `{url}`, error: {source}"))]
    SendRequest {
        /// Requested URL.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },

    /// Upstream returned a non-success status.
    #[snafu(display("Unexpected HTTP response from `{url}`, status code: {status}, body: {body}"))]
    UnexpectedStatus {
        /// Requested URL.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
        /// Response body (possibly truncated).
        body: String,
    },

    /// Response body is not a valid user list.
    #[snafu(display("Failed to deserialize JSON response from `{url}`, error: {source}"))]
    DeserializeResponse {
        /// Requested URL.
        url: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}
