//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`GatewayError`] via `#[from]` or an explicit `into_domain`.

use crate::device::CallType;

/// Workspace-wide error type returned across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A lookup by identifier found nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// `run()` was called while the device was already connecting or connected.
    #[error("device {id} is already running")]
    AlreadyRunning { id: String },

    /// The device was closed and cannot be restarted.
    #[error("device {id} is closed")]
    Closed { id: String },

    /// An operation needed a hardware handle but `run()` has not opened one.
    #[error("device {id} has no open connection")]
    NotConnected { id: String },

    /// The hardware collaborator failed (transport, timeout, …).
    #[error("hardware error")]
    Hardware(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The hardware answered but reported a non-success response.
    #[error("hardware rejected the request: {message}")]
    Rejected { message: String },

    /// Callback registration did not complete before its deadline.
    #[error("callback registration timed out, pending: {pending:?}")]
    RegistrationTimedOut { pending: Vec<CallType> },

    /// A zone tag could not be decoded.
    #[error("invalid tag")]
    Tag(#[from] TagError),
}

/// Returned when a lookup by identifier yields nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (e.g. `"Device"`, `"Zone"`).
    pub entity: &'static str,
    /// The identifier that was not found.
    pub id: String,
}

/// Reasons a zone tag (or a value derived from one) is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TagError {
    /// A `;`-separated segment did not split into exactly `key=value`.
    #[error("segment {0:?} does not match k=v")]
    MalformedSegment(String),

    /// The relay value is shorter than a group letter plus one output.
    #[error("relay value {0:?} must be at least two characters, e.g. A1")]
    RelayTooShort(String),

    /// The relay outputs are not a comma-separated list of positive integers.
    #[error("relay value {0:?} must look like A1,2,3")]
    RelayPattern(String),

    /// A coordinate field is missing or not an integer.
    #[error("coordinate field {field} has invalid value {value:?}")]
    Coordinate { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_error() {
        let err = NotFoundError {
            entity: "Device",
            id: "dts-10.0.0.1".to_string(),
        };
        assert_eq!(err.to_string(), "Device dts-10.0.0.1 not found");
    }

    #[test]
    fn should_convert_not_found_into_gateway_error() {
        let err: GatewayError = NotFoundError {
            entity: "Device",
            id: "x".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[test]
    fn should_display_already_running() {
        let err = GatewayError::AlreadyRunning {
            id: "dts-host".to_string(),
        };
        assert_eq!(err.to_string(), "device dts-host is already running");
    }

    #[test]
    fn should_display_relay_pattern_error() {
        let err = TagError::RelayPattern("A1,,2".to_string());
        assert_eq!(err.to_string(), "relay value \"A1,,2\" must look like A1,2,3");
    }

    #[test]
    fn should_convert_tag_error_into_gateway_error() {
        let err: GatewayError = TagError::MalformedSegment("row".to_string()).into();
        assert!(matches!(err, GatewayError::Tag(TagError::MalformedSegment(_))));
    }
}
