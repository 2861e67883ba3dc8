// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The configuration of a provisioning run and the names derived from it.

use crate::ProvisionError;
use crate::retry::RetryPolicy;
use derive_builder::Builder;
use ipnet::IpNet;
use model::{FqName, InterfaceName, Role, Scope};

pub const DEFAULT_DOMAIN: &str = "default-domain";
pub const DEFAULT_PROJECT: &str = "default-project";
pub const DEFAULT_TEMPLATE: &str = "netns-nat-template";
pub const DEFAULT_INSTANCE: &str = "netns-nat-instance";
pub const DEFAULT_POLICY: &str = "netns_nat_policy";

/// Everything a provisioning run needs to know, fixed before the run starts.
///
/// Network names may be given as bare labels; [`ProvisionConfigBuilder::build`] expands them to
/// `domain:project:label`.
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[builder(
    build_fn(private, name = "build_raw", error = "ProvisionError"),
    setter(into)
)]
pub struct ProvisionConfig {
    #[builder(default = "DEFAULT_DOMAIN.to_string()")]
    pub domain: String,
    #[builder(default = "DEFAULT_PROJECT.to_string()")]
    pub project: String,
    /// The daemon name of the appliance; also the name of its namespace.
    pub appliance: String,
    /// The host running the appliance.
    pub host: String,
    pub left_network: String,
    pub right_network: String,
    /// Private networks whose traffic is also drawn through the appliance.
    #[builder(default)]
    pub extra_networks: Vec<String>,
    #[builder(default = "Role::Left.to_string()")]
    pub left_interface: String,
    #[builder(default = "Role::Right.to_string()")]
    pub right_interface: String,
    #[builder(default = "DEFAULT_TEMPLATE.to_string()")]
    pub template_name: String,
    #[builder(default = "DEFAULT_INSTANCE.to_string()")]
    pub instance_name: String,
    #[builder(default = "DEFAULT_POLICY.to_string()")]
    pub policy_name: String,
    /// Create the left network with this subnet if it does not exist.
    #[builder(default, setter(strip_option))]
    pub provision_left: Option<IpNet>,
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl ProvisionConfigBuilder {
    /// Build and normalize the configuration.
    ///
    /// # Errors
    ///
    /// Fails if a mandatory field is unset or if any name is illegal.
    pub fn build(&self) -> Result<ProvisionConfig, ProvisionError> {
        let mut config = self.build_raw()?;
        let scope = Scope::new(config.domain.as_str(), config.project.as_str())?;
        config.left_network = scope.network_name(&config.left_network)?.to_string();
        config.right_network = scope.network_name(&config.right_network)?.to_string();
        config.extra_networks = config
            .extra_networks
            .iter()
            .map(|network| scope.network_name(network).map(|name| name.to_string()))
            .collect::<Result<_, _>>()?;
        config.names()?;
        Ok(config)
    }
}

/// The deterministic names of everything a run locates or creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Names {
    pub scope: Scope,
    /// `domain:project:<host>-<appliance>`.
    pub appliance: FqName,
    pub namespace: String,
    pub left_network: FqName,
    pub right_network: FqName,
    pub extra_networks: Vec<FqName>,
    pub left_interface: InterfaceName,
    pub right_interface: InterfaceName,
    /// `domain:<template>`.
    pub template: FqName,
    pub instance: FqName,
    pub policy: FqName,
    /// `domain:project:<instance>-routes`.
    pub route_table: FqName,
}

impl Names {
    #[must_use]
    pub fn network(&self, role: Role) -> &FqName {
        match role {
            Role::Left => &self.left_network,
            Role::Right => &self.right_network,
        }
    }

    #[must_use]
    pub fn interface(&self, role: Role) -> &InterfaceName {
        match role {
            Role::Left => &self.left_interface,
            Role::Right => &self.right_interface,
        }
    }
}

impl ProvisionConfig {
    /// Derive the names of the resources of this run.
    ///
    /// # Errors
    ///
    /// Fails if any derived name is illegal.
    pub fn names(&self) -> Result<Names, ProvisionError> {
        let scope = Scope::new(self.domain.as_str(), self.project.as_str())?;
        if self.appliance.is_empty() || self.appliance.contains('/') {
            return Err(ProvisionError::Config(format!(
                "illegal appliance name '{}'",
                self.appliance
            )));
        }
        let extra_networks = self
            .extra_networks
            .iter()
            .map(|network| scope.network_name(network))
            .collect::<Result<_, _>>()?;
        Ok(Names {
            appliance: scope.child(format!("{}-{}", self.host, self.appliance))?,
            namespace: self.appliance.clone(),
            left_network: scope.network_name(&self.left_network)?,
            right_network: scope.network_name(&self.right_network)?,
            extra_networks,
            left_interface: InterfaceName::try_from(self.left_interface.as_str())?,
            right_interface: InterfaceName::try_from(self.right_interface.as_str())?,
            template: scope.domain_child(self.template_name.as_str())?,
            instance: scope.child(self.instance_name.as_str())?,
            policy: scope.child(self.policy_name.as_str())?,
            route_table: scope.child(format!("{}-routes", self.instance_name))?,
            scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ProvisionConfig, ProvisionConfigBuilder};
    use crate::{ProvisionError, RetryPolicy};
    use pretty_assertions::assert_eq;

    fn chain() -> ProvisionConfigBuilder {
        let mut builder = ProvisionConfigBuilder::default();
        builder
            .appliance("nat1")
            .host("host")
            .left_network("net-left")
            .right_network("net-right");
        builder
    }

    #[test]
    fn defaults() {
        let config: ProvisionConfig = chain().build().unwrap();
        assert_eq!(config.domain, "default-domain");
        assert_eq!(config.project, "default-project");
        assert_eq!(config.template_name, "netns-nat-template");
        assert_eq!(config.instance_name, "netns-nat-instance");
        assert_eq!(config.policy_name, "netns_nat_policy");
        assert_eq!(config.left_interface, "left");
        assert_eq!(config.right_interface, "right");
        assert_eq!(config.provision_left, None);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn networks_are_normalized() {
        let config = chain()
            .project("admin")
            .right_network("other:public")
            .extra_networks(vec!["a:b:private".to_string(), "private2".to_string()])
            .build()
            .unwrap();
        assert_eq!(config.left_network, "default-domain:admin:net-left");
        assert_eq!(config.right_network, "default-domain:admin:public");
        assert_eq!(
            config.extra_networks,
            vec!["a:b:private", "default-domain:admin:private2"]
        );
    }

    #[test]
    fn derived_names() {
        let names = chain().build().unwrap().names().unwrap();
        assert_eq!(names.appliance.to_string(), "default-domain:default-project:host-nat1");
        assert_eq!(names.namespace, "nat1");
        assert_eq!(names.template.to_string(), "default-domain:netns-nat-template");
        assert_eq!(
            names.instance.to_string(),
            "default-domain:default-project:netns-nat-instance"
        );
        assert_eq!(
            names.policy.to_string(),
            "default-domain:default-project:netns_nat_policy"
        );
        assert_eq!(
            names.route_table.to_string(),
            "default-domain:default-project:netns-nat-instance-routes"
        );
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = ProvisionConfigBuilder::default()
            .appliance("nat1")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn illegal_interface_name_is_rejected() {
        let err = chain()
            .left_interface("a-very-long-interface-name")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InterfaceName(_)));
    }
}
