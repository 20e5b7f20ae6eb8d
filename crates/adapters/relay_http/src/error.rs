//! Relay adapter error types.

use dtsgate_domain::error::GatewayError;

/// Errors specific to the HTTP relay adapter.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The HTTP client could not be built.
    #[error("cannot build relay HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request never got an answer (connection, timeout, TLS).
    #[error("relay request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The board answered with something other than `200 OK`.
    #[error("relay {url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The device was closed.
    #[error("relay {id} is closed")]
    Closed { id: String },
}

impl From<RelayError> for GatewayError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Closed { id } => Self::Closed { id },
            other => Self::Hardware(Box::new(other)),
        }
    }
}
