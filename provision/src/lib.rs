// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Provisioning of a NAT appliance living in a network namespace.
//!
//! A run locates (or creates) the appliance and its attachment points in the resource graph,
//! wires them into a local namespace, registers the host interfaces with the forwarding plane
//! and finally builds the service chain forcing traffic between two networks through the
//! appliance. See [`Orchestrator::run`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

mod chain;
pub mod config;
mod error;
mod locator;
mod retry;
mod workflow;

pub use chain::ServiceChain;
pub use config::{Names, ProvisionConfig, ProvisionConfigBuilder};
pub use error::ProvisionError;
pub use locator::Locator;
pub use retry::{RetryPolicy, Transient};
pub use workflow::{Orchestrator, ProvisionReport, Stage};

use tracectl::trace_target;
trace_target!("provision", LevelFilter::INFO, &["provision"]);
