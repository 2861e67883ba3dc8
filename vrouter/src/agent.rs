// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! HTTP client of the vrouter agent port API.

use crate::{ForwardingPlane, PortRegistration, RegistrationError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default address of the vrouter agent port API.
pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:9091";

/// A [`ForwardingPlane`] backed by the local vrouter agent.
#[derive(Clone, Debug)]
pub struct AgentClient {
    client: Client,
    base: String,
}

impl AgentClient {
    /// Build a client of the agent listening at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistrationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn port_url(&self) -> String {
        format!("{}/port", self.base)
    }
}

impl ForwardingPlane for AgentClient {
    async fn register_interface(&self, port: &PortRegistration) -> Result<(), RegistrationError> {
        let url = self.port_url();
        info!(
            "Registering {} for attachment point {} with the agent",
            port.system_name, port.id
        );
        let response = self.client.post(&url).json(port).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!("agent accepted port {}", port.id);
            return Ok(());
        }
        if status.is_server_error() {
            return Err(RegistrationError::Unavailable(status.as_u16()));
        }
        Err(RegistrationError::Rejected {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentClient, DEFAULT_AGENT_URL};
    use std::time::Duration;

    #[test]
    fn port_url() {
        let agent = AgentClient::new(DEFAULT_AGENT_URL, Duration::from_secs(1)).unwrap();
        assert_eq!(agent.port_url(), "http://127.0.0.1:9091/port");
        let agent = AgentClient::new("http://agent:9091/", Duration::from_secs(1)).unwrap();
        assert_eq!(agent.port_url(), "http://agent:9091/port");
    }
}
