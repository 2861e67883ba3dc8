// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Failures registering an interface with the forwarding plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("attachment point {attachment} has no {field} yet")]
    Incomplete {
        attachment: String,
        field: &'static str,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request to the agent timed out")]
    Timeout,
    #[error("agent unavailable (status {0})")]
    Unavailable(u16),
    #[error("registration rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl RegistrationError {
    /// True for failures which may go away if the registration is sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistrationError::Transport(_)
                | RegistrationError::Timeout
                | RegistrationError::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for RegistrationError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            RegistrationError::Timeout
        } else {
            RegistrationError::Transport(value.to_string())
        }
    }
}
