// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The provisioning run: one sequential pass from the appliance to the service chain.
//!
//! Every step is idempotent, so a run interrupted at any [`Stage`] is completed by running it
//! again with the same configuration.

use crate::chain::ServiceChain;
use crate::config::{Names, ProvisionConfig};
use crate::{Locator, ProvisionError};
use graph::ResourceGraph;
use id::Id;
use interface_manager::{NamespaceOps, VethPair};
use model::{
    Appliance, AttachmentPoint, FqName, InterfaceName, Network, NetworkPolicy, Role, RouteTable,
    ServiceInstance, ServiceTemplate, Stored,
};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{error, info, warn};
use vrouter::{ForwardingPlane, PortRegistration};

/// The progress of a run. Stages are reached in declaration order.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    NotStarted,
    ApplianceReady,
    NetworksLocated,
    AttachmentPointsReady,
    NamespaceConfigured,
    Registered,
    Addressed,
    NatRoutesApplied,
    TemplateReady,
    InstanceReady,
    PolicyAttached,
    ExtraRoutesAttached,
    Done,
}

/// What a successful run located or created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionReport {
    pub appliance: Id<Appliance>,
    pub attachments: BTreeMap<Role, Id<AttachmentPoint>>,
    /// The host end of the interface pair of each attachment point.
    pub host_interfaces: BTreeMap<Role, InterfaceName>,
    pub template: Id<ServiceTemplate>,
    pub instance: Id<ServiceInstance>,
    pub policy: Id<NetworkPolicy>,
    /// Only set when extra networks are chained.
    pub route_table: Option<Id<RouteTable>>,
}

/// One side of the appliance.
#[derive(Debug)]
struct Side {
    role: Role,
    local: InterfaceName,
    network: Option<Stored<Network>>,
    attachment: Option<Stored<AttachmentPoint>>,
    host: Option<InterfaceName>,
}

impl Side {
    fn new(role: Role, names: &Names) -> Self {
        Self {
            role,
            local: names.interface(role).clone(),
            network: None,
            attachment: None,
            host: None,
        }
    }

    /// The attachment point and its network, if both exist.
    fn attached(&self) -> Option<(&Stored<Network>, &Stored<AttachmentPoint>)> {
        self.network.as_ref().zip(self.attachment.as_ref())
    }
}

#[derive(Debug)]
struct Progress {
    appliance: FqName,
    stage: Stage,
}

impl Progress {
    fn reach(&mut self, stage: Stage) {
        info!("{}: {} -> {stage}", self.appliance, self.stage);
        self.stage = stage;
    }

    /// A step of `stage` is not applied on the `role` side, because something it needs is absent.
    fn skip(&self, stage: Stage, role: Role, reason: impl Display) {
        warn!("{}: skipping {role} {stage} step: {reason}", self.appliance);
    }
}

/// Drives a provisioning run against its three collaborators.
#[derive(Debug)]
pub struct Orchestrator<'a, G, N, F> {
    config: &'a ProvisionConfig,
    graph: &'a G,
    namespace: &'a N,
    forwarding: &'a F,
}

impl<'a, G, N, F> Orchestrator<'a, G, N, F>
where
    G: ResourceGraph,
    N: NamespaceOps,
    F: ForwardingPlane,
{
    #[must_use]
    pub fn new(
        config: &'a ProvisionConfig,
        graph: &'a G,
        namespace: &'a N,
        forwarding: &'a F,
    ) -> Self {
        Self {
            config,
            graph,
            namespace,
            forwarding,
        }
    }

    /// Provision the appliance and its service chain.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the run. Whatever was applied before it is left in place.
    pub async fn run(&self) -> Result<ProvisionReport, ProvisionError> {
        let names = self.config.names()?;
        let mut progress = Progress {
            appliance: names.appliance.clone(),
            stage: Stage::NotStarted,
        };
        match self.steps(&names, &mut progress).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(
                    "{}: provisioning failed after stage {}: {e}",
                    names.appliance, progress.stage
                );
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn steps(
        &self,
        names: &Names,
        progress: &mut Progress,
    ) -> Result<ProvisionReport, ProvisionError> {
        let locator = Locator::new(self.graph, self.config.retry);
        let ns = names.namespace.as_str();

        let appliance = locator.locate_or_create_appliance(&names.appliance).await?;
        progress.reach(Stage::ApplianceReady);

        let mut sides = [Side::new(Role::Left, names), Side::new(Role::Right, names)];
        for side in &mut sides {
            let name = names.network(side.role);
            side.network = match (side.role, self.config.provision_left) {
                (Role::Left, Some(subnet)) => {
                    Some(locator.locate_or_provision_network(name, subnet).await?)
                }
                _ => locator.locate_network(name).await?,
            };
            if side.network.is_none() {
                progress.skip(
                    Stage::NetworksLocated,
                    side.role,
                    format!("network {name} not found"),
                );
            }
        }
        progress.reach(Stage::NetworksLocated);

        for side in &mut sides {
            side.attachment = locator
                .locate_or_create_attachment_point(
                    &appliance,
                    side.network.as_ref(),
                    &side.local,
                    side.role,
                )
                .await?;
        }
        progress.reach(Stage::AttachmentPointsReady);

        self.namespace.init_namespace(ns).await?;
        for side in &mut sides {
            let Some(attachment) = &side.attachment else {
                progress.skip(Stage::NamespaceConfigured, side.role, "no attachment point");
                continue;
            };
            let pair =
                VethPair::new(side.local.clone(), attachment.id, attachment.value.mac_address)?;
            side.host = Some(self.namespace.materialize_interface(ns, &pair).await?);
        }
        progress.reach(Stage::NamespaceConfigured);

        for side in &sides {
            let (Some((network, attachment)), Some(host)) = (side.attached(), &side.host) else {
                progress.skip(Stage::Registered, side.role, "no attachment point");
                continue;
            };
            let port = PortRegistration::new(&appliance, attachment, network.id, host)?;
            let forwarding = self.forwarding;
            self.config
                .retry
                .run(format!("register {host}"), || forwarding.register_interface(&port))
                .await?;
            info!("Registered {host} for {}", attachment.fq_name());
        }
        progress.reach(Stage::Registered);

        for side in &sides {
            let Some(attachment) = &side.attachment else {
                progress.skip(Stage::Addressed, side.role, "no attachment point");
                continue;
            };
            let prefix = locator.get_interface_prefix(attachment).await?;
            self.namespace
                .configure_interface(ns, &side.local, prefix, false)
                .await?;
        }
        progress.reach(Stage::Addressed);

        let [left, right] = &sides;
        if right.attachment.is_some() {
            let gateway = locator.get_network_gateway(&names.right_network).await?;
            self.namespace
                .set_default_route(ns, gateway, &right.local)
                .await?;
        } else {
            progress.skip(Stage::NatRoutesApplied, Role::Right, "no default route");
        }
        let mut extra_cidrs = Vec::with_capacity(names.extra_networks.len());
        for network in &names.extra_networks {
            let cidr = locator.get_network_subnet_cidr(network).await?;
            extra_cidrs.push((network, cidr));
            if left.attachment.is_none() {
                progress.skip(
                    Stage::NatRoutesApplied,
                    Role::Left,
                    format!("no NAT for {network}"),
                );
                continue;
            }
            self.namespace.install_nat(ns, cidr, &left.local).await?;
            self.namespace
                .install_route_via_interface(ns, cidr, &left.local)
                .await?;
        }
        progress.reach(Stage::NatRoutesApplied);

        let chain = ServiceChain::new(&locator);
        let template = chain.ensure_service_template(&names.template).await?;
        progress.reach(Stage::TemplateReady);

        let instance = chain
            .ensure_service_instance(
                &names.instance,
                &names.template,
                &names.left_network,
                &names.right_network,
            )
            .await?;
        progress.reach(Stage::InstanceReady);

        let policy = chain
            .ensure_policy_chain(
                &names.policy,
                &names.left_network,
                &names.right_network,
                instance.fq_name(),
            )
            .await?;
        chain.associate_appliance(&instance, &appliance).await?;
        progress.reach(Stage::PolicyAttached);

        let mut route_table = None;
        if !extra_cidrs.is_empty() {
            let table = chain
                .create_default_route_entry(&names.route_table, instance.fq_name())
                .await?;
            for (network, _) in &extra_cidrs {
                chain.attach_route(&table, network).await?;
            }
            route_table = Some(table.id);
            progress.reach(Stage::ExtraRoutesAttached);
        }
        progress.reach(Stage::Done);

        let mut attachments = BTreeMap::new();
        let mut host_interfaces = BTreeMap::new();
        for side in sides {
            if let Some(attachment) = side.attachment {
                attachments.insert(side.role, attachment.id);
            }
            if let Some(host) = side.host {
                host_interfaces.insert(side.role, host);
            }
        }
        Ok(ProvisionReport {
            appliance: appliance.id,
            attachments,
            host_interfaces,
            template: template.id,
            instance: instance.id,
            policy: policy.id,
            route_table,
        })
    }
}
