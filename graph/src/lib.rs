// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Access to the resource graph: the store of virtual networks, appliances, attachment points,
//! service templates and instances, policies and route tables.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod rest;

pub use client::ResourceGraph;
pub use error::GraphError;
pub use rest::RestGraph;

use tracectl::trace_target;
trace_target!("graph", LevelFilter::INFO, &["provision"]);
