// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Failures talking to the resource graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} '{name}' already exists")]
    Conflict { kind: &'static str, name: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("resource graph unavailable (status {0})")]
    Unavailable(u16),
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GraphError {
    /// True for failures which may go away if the same request is sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GraphError::Transport(_) | GraphError::Timeout | GraphError::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            GraphError::Timeout
        } else if value.is_decode() {
            GraphError::Malformed(value.to_string())
        } else if let Some(status) = value.status() {
            GraphError::from_status(status.as_u16(), value.to_string())
        } else {
            GraphError::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(value: serde_json::Error) -> Self {
        GraphError::Malformed(value.to_string())
    }
}

impl GraphError {
    /// Classify an unexpected HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        if status >= 500 {
            GraphError::Unavailable(status)
        } else {
            GraphError::Rejected { status, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GraphError;

    #[test]
    fn transient_classification() {
        assert!(GraphError::Timeout.is_transient());
        assert!(GraphError::Transport("reset".into()).is_transient());
        assert!(GraphError::from_status(503, String::new()).is_transient());
        assert!(!GraphError::from_status(400, String::new()).is_transient());
        assert!(
            !GraphError::NotFound {
                kind: "virtual-network",
                name: "d:p:n".into()
            }
            .is_transient()
        );
        assert!(!GraphError::Malformed("eof".into()).is_transient());
    }
}
