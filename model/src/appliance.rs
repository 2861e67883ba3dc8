// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The appliance (a virtual machine backed by a network namespace) and its attachment points.

use crate::fqname::FqName;
use crate::resource::{ModelError, Resource};
use derive_builder::Builder;
use ipnet::IpNet;
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};

/// The role of an attachment point (and of the matching service interface).
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Left,
    Right,
}

/// The virtual machine object representing the appliance.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(build_fn(error = "ModelError"), setter(into))]
pub struct Appliance {
    pub fq_name: FqName,
    /// The service instance this appliance implements, once associated.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance: Option<FqName>,
}

impl Resource for Appliance {
    const KIND: &'static str = "virtual-machine";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

impl Appliance {
    /// This appliance, associated with `instance`.
    #[must_use]
    pub fn with_service_instance(mut self, instance: &FqName) -> Self {
        self.service_instance = Some(instance.clone());
        self
    }
}

/// The binding of an appliance to one network, in one role.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(build_fn(error = "ModelError"), setter(into))]
pub struct AttachmentPoint {
    pub fq_name: FqName,
    pub appliance: FqName,
    pub network: FqName,
    pub role: Role,
    /// MAC address assigned by the resource graph.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<MacAddress>,
    /// Address prefix allocated by the resource graph from the network's subnet.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_prefix: Option<IpNet>,
}

impl Resource for AttachmentPoint {
    const KIND: &'static str = "virtual-machine-interface";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}
