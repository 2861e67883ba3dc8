// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configure the linux network namespace hosting an appliance: the namespace itself, the
//! interface pairs wiring it to the host, addresses, routes and source NAT.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

mod error;
pub mod nat;
pub mod netlink;
pub mod netns;
mod ops;
#[cfg(any(test, feature = "testing"))]
pub mod recording;

pub use error::NamespaceError;
pub use netlink::Netlink;
pub use ops::{NamespaceOps, VethPair};

use tracectl::trace_target;
trace_target!("interface-manager", LevelFilter::INFO, &["provision"]);
