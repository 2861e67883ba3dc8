// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service templates and service instances.

use crate::appliance::Role;
use crate::fqname::FqName;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceType {
    Firewall,
    Analyzer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceMode {
    Transparent,
    InNetwork,
    InNetworkNat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInterface {
    pub service_interface_type: Role,
    pub shared_ip: bool,
}

/// The shape of a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplateProperties {
    pub service_scaling: bool,
    pub service_type: ServiceType,
    pub service_mode: ServiceMode,
    pub interface_type: Vec<ServiceInterface>,
}

impl ServiceTemplateProperties {
    /// An unscaled in-network-nat firewall with a left and a right interface, neither sharing
    /// its address.
    #[must_use]
    pub fn in_network_nat() -> Self {
        Self {
            service_scaling: false,
            service_type: ServiceType::Firewall,
            service_mode: ServiceMode::InNetworkNat,
            interface_type: [Role::Left, Role::Right]
                .into_iter()
                .map(|role| ServiceInterface {
                    service_interface_type: role,
                    shared_ip: false,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub fq_name: FqName,
    /// Unset on a template which was created but never completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServiceTemplateProperties>,
}

impl Resource for ServiceTemplate {
    const KIND: &'static str = "service-template";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaleOut {
    pub max_instances: u32,
    pub auto_scale: bool,
}

impl ScaleOut {
    /// Exactly one replica, no auto scaling.
    pub const SINGLE: ScaleOut = ScaleOut {
        max_instances: 1,
        auto_scale: false,
    };
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceProperties {
    pub left_virtual_network: FqName,
    pub right_virtual_network: FqName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_virtual_network: Option<FqName>,
    pub scale_out: ScaleOut,
}

impl ServiceInstanceProperties {
    #[must_use]
    pub fn new(left: &FqName, right: &FqName) -> Self {
        Self {
            left_virtual_network: left.clone(),
            right_virtual_network: right.clone(),
            management_virtual_network: None,
            scale_out: ScaleOut::SINGLE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub fq_name: FqName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_template: Option<FqName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServiceInstanceProperties>,
}

impl Resource for ServiceInstance {
    const KIND: &'static str = "service-instance";

    fn fq_name(&self) -> &FqName {
        &self.fq_name
    }
}

impl ServiceInstance {
    /// A complete service instance of `template` chaining `left` to `right`.
    #[must_use]
    pub fn chaining(fq_name: FqName, template: &FqName, left: &FqName, right: &FqName) -> Self {
        Self {
            fq_name,
            service_template: Some(template.clone()),
            properties: Some(ServiceInstanceProperties::new(left, right)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceMode, ServiceTemplateProperties, ServiceType};
    use crate::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn nat_template_shape() {
        let props = ServiceTemplateProperties::in_network_nat();
        assert!(!props.service_scaling);
        assert_eq!(props.service_type, ServiceType::Firewall);
        assert_eq!(props.service_mode, ServiceMode::InNetworkNat);
        let roles: Vec<Role> = props
            .interface_type
            .iter()
            .map(|i| i.service_interface_type)
            .collect();
        assert_eq!(roles, vec![Role::Left, Role::Right]);
        assert!(props.interface_type.iter().all(|i| !i.shared_ip));
    }

    #[test]
    fn mode_wire_form() {
        assert_eq!(
            serde_json::to_string(&ServiceMode::InNetworkNat).unwrap(),
            r#""in-network-nat""#
        );
        assert_eq!(ServiceType::Firewall.to_string(), "firewall");
    }
}
