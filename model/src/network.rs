// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Virtual networks.

use crate::fqname::FqName;
use crate::resource::{ModelError, Resource};
use derive_builder::Builder;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Ordering of a policy attached to a network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub major: u32,
    pub minor: u32,
}

impl Sequence {
    /// The sequence used for the service chain policy.
    pub const FIRST: Sequence = Sequence { major: 1, minor: 1 };
}

/// A reference from a network to a policy applied to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyAttachment {
    pub policy: FqName,
    pub sequence: Sequence,
}

#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(build_fn(error = "ModelError"), setter(into))]
pub struct Network {
    pub fq_name: FqName,
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<IpNet>,
    /// Explicit gateway. When unset the first host address of the subnet is the gateway.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyAttachment>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_tables: Vec<FqName>,
}

impl Resource for Network {
    const KIND: &'static str = "virtual-network";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

impl Network {
    /// The default gateway of this network, if it has a subnet.
    #[must_use]
    pub fn default_gateway(&self) -> Option<IpAddr> {
        if self.gateway.is_some() {
            return self.gateway;
        }
        self.subnet.and_then(|subnet| subnet.hosts().next())
    }

    /// This network with `policy` attached at `sequence`.
    ///
    /// An existing attachment of the same policy is replaced, so applying this twice yields the
    /// same value.
    #[must_use]
    pub fn with_policy(mut self, policy: &FqName, sequence: Sequence) -> Self {
        self.policies.retain(|attached| &attached.policy != policy);
        self.policies.push(PolicyAttachment {
            policy: policy.clone(),
            sequence,
        });
        self.policies.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.policy.cmp(&b.policy)));
        self
    }

    /// This network with `route_table` attached.
    #[must_use]
    pub fn with_route_table(mut self, route_table: &FqName) -> Self {
        if !self.route_tables.contains(route_table) {
            self.route_tables.push(route_table.clone());
        }
        self
    }
}
