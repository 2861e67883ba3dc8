// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Value types for the resources of a namespace NAT appliance.
//!
//! All values are plain data: they are fully formed (usually through a builder or one of the
//! constructors for fixed shapes) before being handed to the resource graph in a single create
//! or update call.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod appliance;
pub mod fqname;
pub mod ifname;
pub mod network;
pub mod policy;
pub mod resource;
pub mod route;
pub mod service;

pub use appliance::{Appliance, ApplianceBuilder, AttachmentPoint, AttachmentPointBuilder, Role};
pub use fqname::{FqName, IllegalFqName, Scope};
pub use ifname::{IllegalInterfaceName, InterfaceName};
pub use network::{Network, NetworkBuilder, PolicyAttachment, Sequence};
pub use policy::{ChainType, Direction, NetworkPolicy, PolicyRule, PortRange, Protocol};
pub use resource::{ModelError, Resource, Stored};
pub use route::{NextHopType, RouteTable, StaticRoute};
pub use service::{
    ScaleOut, ServiceInstance, ServiceInstanceProperties, ServiceMode, ServiceTemplate,
    ServiceTemplateProperties, ServiceType,
};
