// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registration of appliance interfaces with the forwarding plane (the vrouter agent).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
mod error;
mod port;
#[cfg(any(test, feature = "testing"))]
pub mod recording;

pub use agent::AgentClient;
pub use error::RegistrationError;
pub use port::{NO_VLAN, PortRegistration, VM_PORT};

use std::future::Future;

/// The forwarding plane of the host.
pub trait ForwardingPlane: Send + Sync {
    /// Steer the traffic of the attachment point `port.id` to the interface `port.system_name`.
    ///
    /// Registering the same port again is a no-op.
    fn register_interface(
        &self,
        port: &PortRegistration,
    ) -> impl Future<Output = Result<(), RegistrationError>> + Send;
}

use tracectl::trace_target;
trace_target!("vrouter", LevelFilter::INFO, &["provision"]);
