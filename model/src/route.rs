// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route tables drawing additional networks' traffic through the service chain.

use crate::fqname::FqName;
use crate::resource::Resource;
use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextHopType {
    ServiceInstance,
    IpAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticRoute {
    pub prefix: IpNet,
    pub next_hop: String,
    pub next_hop_type: NextHopType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub fq_name: FqName,
    #[serde(default)]
    pub routes: Vec<StaticRoute>,
}

impl Resource for RouteTable {
    const KIND: &'static str = "route-table";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

impl RouteTable {
    /// A table with a single default route whose next hop is `instance`.
    #[must_use]
    pub fn default_via(fq_name: FqName, instance: &FqName) -> Self {
        Self {
            fq_name,
            routes: vec![StaticRoute {
                prefix: IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0)),
                next_hop: instance.to_string(),
                next_hop_type: NextHopType::ServiceInstance,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NextHopType, RouteTable};

    #[test]
    fn default_route_points_at_instance() {
        let table = RouteTable::default_via(
            "d:p:netns-nat-instance-routes".parse().unwrap(),
            &"d:p:netns-nat-instance".parse().unwrap(),
        );
        assert_eq!(table.routes.len(), 1);
        assert_eq!(table.routes[0].prefix.to_string(), "0.0.0.0/0");
        assert_eq!(table.routes[0].next_hop, "d:p:netns-nat-instance");
        assert_eq!(table.routes[0].next_hop_type, NextHopType::ServiceInstance);
    }
}
