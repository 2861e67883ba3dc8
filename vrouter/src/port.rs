// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The port document understood by the vrouter agent.

use crate::RegistrationError;
use id::Id;
use model::{Appliance, AttachmentPoint, InterfaceName, Network, Stored};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// VLAN id meaning "untagged".
pub const NO_VLAN: i32 = -1;

/// Port type of an interface backing a virtual machine.
pub const VM_PORT: u8 = 0;

/// Binds a host interface to an attachment point, so that the forwarding plane delivers the
/// traffic of that attachment point to the interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PortRegistration {
    /// The attachment point.
    pub id: Uuid,
    /// The appliance owning the attachment point.
    pub instance_id: Uuid,
    pub display_name: String,
    pub ip_address: IpAddr,
    /// The network of the attachment point.
    pub vn_id: Uuid,
    pub vm_project_id: Uuid,
    pub mac_address: String,
    /// The host side interface.
    pub system_name: String,
    #[serde(rename = "type")]
    pub port_type: u8,
    pub rx_vlan_id: i32,
    pub tx_vlan_id: i32,
}

impl PortRegistration {
    /// The registration binding `interface` to `attachment`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Incomplete`] if no MAC address has been assigned to
    /// `attachment` yet.
    pub fn new(
        appliance: &Stored<Appliance>,
        attachment: &Stored<AttachmentPoint>,
        network: Id<Network>,
        interface: &InterfaceName,
    ) -> Result<Self, RegistrationError> {
        let mac = attachment
            .value
            .mac_address
            .ok_or_else(|| RegistrationError::Incomplete {
                attachment: attachment.fq_name().to_string(),
                field: "mac-address",
            })?;
        let ip_address = attachment
            .value
            .ip_prefix
            .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |prefix| prefix.addr());
        Ok(Self {
            id: attachment.id.into_raw(),
            instance_id: appliance.id.into_raw(),
            display_name: appliance.fq_name().label().to_string(),
            ip_address,
            vn_id: network.into_raw(),
            vm_project_id: Uuid::nil(),
            mac_address: mac.to_string().to_lowercase(),
            system_name: interface.to_string(),
            port_type: VM_PORT,
            rx_vlan_id: NO_VLAN,
            tx_vlan_id: NO_VLAN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PortRegistration;
    use crate::RegistrationError;
    use id::Id;
    use model::{
        Appliance, ApplianceBuilder, AttachmentPoint, AttachmentPointBuilder, FqName,
        InterfaceName, Role, Stored,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fq(s: &str) -> FqName {
        s.parse().unwrap()
    }

    fn appliance() -> Stored<Appliance> {
        let value = ApplianceBuilder::default()
            .fq_name(fq("d:p:host-nat1"))
            .build()
            .unwrap();
        Stored::new(
            "11111111-1111-4111-8111-111111111111".parse().unwrap(),
            value,
        )
    }

    fn attachment(mac: bool) -> Stored<AttachmentPoint> {
        let mut builder = AttachmentPointBuilder::default();
        builder
            .fq_name(fq("d:p:host-nat1-gw"))
            .appliance(fq("d:p:host-nat1"))
            .network(fq("d:p:net-right"))
            .role(Role::Right)
            .ip_prefix("10.0.0.3/24".parse::<ipnet::IpNet>().unwrap());
        if mac {
            builder.mac_address(mac_address::MacAddress::new([2, 0xab, 0, 0, 0, 1]));
        }
        Stored::new(
            "22222222-2222-4222-8222-222222222222".parse().unwrap(),
            builder.build().unwrap(),
        )
    }

    #[test]
    fn document_shape() {
        let network: Id<model::Network> = "33333333-3333-4333-8333-333333333333".parse().unwrap();
        let port = PortRegistration::new(
            &appliance(),
            &attachment(true),
            network,
            &InterfaceName::try_from("ns222222222222").unwrap(),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&port).unwrap(),
            json!({
                "id": "22222222-2222-4222-8222-222222222222",
                "instance-id": "11111111-1111-4111-8111-111111111111",
                "display-name": "host-nat1",
                "ip-address": "10.0.0.3",
                "vn-id": "33333333-3333-4333-8333-333333333333",
                "vm-project-id": "00000000-0000-0000-0000-000000000000",
                "mac-address": "02:ab:00:00:00:01",
                "system-name": "ns222222222222",
                "type": 0,
                "rx-vlan-id": -1,
                "tx-vlan-id": -1,
            })
        );
    }

    #[test]
    fn mac_address_is_required() {
        let err = PortRegistration::new(
            &appliance(),
            &attachment(false),
            Id::new(),
            &InterfaceName::try_from("ns222222222222").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::Incomplete { .. }));
    }
}
