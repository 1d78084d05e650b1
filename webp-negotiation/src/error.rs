use thiserror::Error;

use fastly::http::request::SendError;

/// Describes an error encountered while negotiating an image response.
#[derive(Error, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum NegotiationError {
    /// The candidate URL derived from the client request could not be parsed.
    #[error("invalid request URL provided: `{0}`")]
    InvalidRequestUrl(String),

    /// An error occurred while sending a request to a backend or waiting for its response.
    #[error("error sending request: {0}")]
    RequestError(#[from] SendError),

    /// No backend was configured and the request URL has no host to use instead.
    #[error("no backend configured and no host in request: `{0}`")]
    MissingHost(String),

    /// The configured `Accept` pattern is not a valid regular expression.
    #[error("invalid accept pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A custom dispatcher failed to reach its backend.
    #[error("error dispatching request: {0}")]
    DispatchError(String),
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
