// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network policies steering traffic through a service instance.

use crate::fqname::FqName;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "<>")]
    Bidirectional,
    #[serde(rename = ">")]
    Unidirectional,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Any,
    Tcp,
    Udp,
    Icmp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleAction {
    Pass,
    Deny,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChainType {
    InNetworkNat,
    InNetwork,
    Transparent,
}

/// An inclusive port range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start_port: u16,
    pub end_port: u16,
}

impl PortRange {
    pub const ANY: PortRange = PortRange {
        start_port: 0,
        end_port: u16::MAX,
    };

    #[must_use]
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressMatch {
    pub virtual_network: FqName,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionList {
    /// Fully-qualified names (in text form) of the service instances to apply.
    pub apply_service: Vec<String>,
    pub service_chain_type: ChainType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub direction: Direction,
    pub protocol: Protocol,
    pub src_addresses: Vec<AddressMatch>,
    pub dst_addresses: Vec<AddressMatch>,
    pub src_ports: Vec<PortRange>,
    pub dst_ports: Vec<PortRange>,
    pub simple_action: SimpleAction,
    pub action_list: ActionList,
}

impl PolicyRule {
    /// A rule passing all traffic between `left` and `right` (both ways, any protocol, any port)
    /// through `instance` as an in-network-nat chain.
    #[must_use]
    pub fn service_chain(left: &FqName, right: &FqName, instance: &FqName) -> Self {
        Self {
            direction: Direction::Bidirectional,
            protocol: Protocol::Any,
            src_addresses: vec![AddressMatch {
                virtual_network: left.clone(),
            }],
            dst_addresses: vec![AddressMatch {
                virtual_network: right.clone(),
            }],
            src_ports: vec![PortRange::ANY],
            dst_ports: vec![PortRange::ANY],
            simple_action: SimpleAction::Pass,
            action_list: ActionList {
                apply_service: vec![instance.to_string()],
                service_chain_type: ChainType::InNetworkNat,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    pub fq_name: FqName,
    #[serde(default)]
    pub entries: Vec<PolicyRule>,
}

impl Resource for NetworkPolicy {
    const KIND: &'static str = "network-policy";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

impl NetworkPolicy {
    /// A policy made of exactly one service chain rule.
    #[must_use]
    pub fn service_chain(fq_name: FqName, left: &FqName, right: &FqName, instance: &FqName) -> Self {
        Self {
            fq_name,
            entries: vec![PolicyRule::service_chain(left, right, instance)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChainType, Direction, NetworkPolicy, Protocol};
    use crate::FqName;
    use pretty_assertions::assert_eq;

    #[test]
    fn service_chain_policy_shape() {
        let left: FqName = "d:p:net-left".parse().unwrap();
        let right: FqName = "d:p:net-right".parse().unwrap();
        let si: FqName = "d:p:netns-nat-instance".parse().unwrap();
        let policy =
            NetworkPolicy::service_chain("d:p:netns_nat_policy".parse().unwrap(), &left, &right, &si);
        assert_eq!(policy.entries.len(), 1);
        let rule = &policy.entries[0];
        assert_eq!(rule.direction, Direction::Bidirectional);
        assert_eq!(rule.protocol, Protocol::Any);
        assert!(rule.src_ports.iter().chain(&rule.dst_ports).all(|p| p.is_any()));
        assert_eq!(rule.src_addresses[0].virtual_network, left);
        assert_eq!(rule.dst_addresses[0].virtual_network, right);
        assert_eq!(rule.action_list.apply_service, vec!["d:p:netns-nat-instance".to_string()]);
        assert_eq!(rule.action_list.service_chain_type, ChainType::InNetworkNat);
    }

    #[test]
    fn direction_wire_form() {
        assert_eq!(serde_json::to_string(&Direction::Bidirectional).unwrap(), r#""<>""#);
    }
}
