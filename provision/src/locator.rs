// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Idempotent locate-or-create of the appliance, its networks and its attachment points.

use crate::{ProvisionError, RetryPolicy};
use graph::{GraphError, ResourceGraph};
use id::Id;
use ipnet::IpNet;
use model::{
    Appliance, ApplianceBuilder, AttachmentPoint, AttachmentPointBuilder, FqName, IllegalFqName,
    InterfaceName, Network, NetworkBuilder, Resource, Role, Stored,
};
use std::net::IpAddr;
use tracing::{debug, info};

/// Access to the resource graph with retry of transient failures.
#[derive(Debug)]
pub struct Locator<'a, G> {
    graph: &'a G,
    retry: RetryPolicy,
}

impl<'a, G: ResourceGraph> Locator<'a, G> {
    #[must_use]
    pub fn new(graph: &'a G, retry: RetryPolicy) -> Self {
        Self { graph, retry }
    }

    /// Look `fq_name` up; absence is `None`.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be queried.
    pub async fn locate<R: Resource>(
        &self,
        fq_name: &FqName,
    ) -> Result<Option<Stored<R>>, ProvisionError> {
        let graph = self.graph;
        let what = format!("locate {} {fq_name}", R::KIND);
        Ok(self.retry.run(what, || graph.locate::<R>(fq_name)).await?)
    }

    /// Read the current state of `id`.
    ///
    /// # Errors
    ///
    /// Fails if the resource is gone or if the resource graph cannot be queried.
    pub async fn read<R: Resource>(&self, id: Id<R>) -> Result<Stored<R>, ProvisionError> {
        let graph = self.graph;
        let what = format!("read {} {id}", R::KIND);
        Ok(self.retry.run(what, || graph.read(id)).await?)
    }

    /// Replace the stored properties of `id` with `value`.
    ///
    /// # Errors
    ///
    /// Fails if the update is rejected or if the resource graph cannot be reached.
    pub async fn update<R: Resource>(&self, id: Id<R>, value: R) -> Result<Stored<R>, ProvisionError> {
        let graph = self.graph;
        let what = format!("update {} {}", R::KIND, value.fq_name());
        self.retry.run(what, || graph.update(id, &value)).await?;
        Ok(Stored::new(id, value))
    }

    /// Return the resource named like `value`, creating it from `value` if absent.
    ///
    /// A concurrent creation of the same name is not an error: the resource created by the other
    /// party is returned.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached or rejects the creation.
    pub async fn locate_or_create<R: Resource>(&self, value: R) -> Result<Stored<R>, ProvisionError> {
        if let Some(existing) = self.locate::<R>(value.fq_name()).await? {
            debug!("{} {} exists ({})", R::KIND, value.fq_name(), existing.id);
            return Ok(existing);
        }
        let graph = self.graph;
        let what = format!("create {} {}", R::KIND, value.fq_name());
        match self.retry.run(what, || graph.create(&value)).await {
            Ok(id) => {
                info!("Created {} {} ({id})", R::KIND, value.fq_name());
                self.read(id).await
            }
            Err(GraphError::Conflict { .. }) => {
                debug!("{} {} was created concurrently", R::KIND, value.fq_name());
                self.locate::<R>(value.fq_name())
                    .await?
                    .ok_or_else(|| ProvisionError::ResourceNotFound {
                        kind: R::KIND,
                        name: value.fq_name().to_string(),
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`Locator::locate_or_create`], then make the stored value equal to `desired`.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached or rejects the change.
    pub async fn ensure<R: Resource>(&self, desired: R) -> Result<Stored<R>, ProvisionError> {
        let stored = self.locate_or_create(desired.clone()).await?;
        if stored.value == desired {
            return Ok(stored);
        }
        debug!("updating {} {}", R::KIND, desired.fq_name());
        self.update(stored.id, desired).await
    }

    /// Locate the appliance `name`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached or rejects the creation.
    pub async fn locate_or_create_appliance(
        &self,
        name: &FqName,
    ) -> Result<Stored<Appliance>, ProvisionError> {
        let appliance = ApplianceBuilder::default().fq_name(name.clone()).build()?;
        self.locate_or_create(appliance).await
    }

    /// Look a network up. Networks are pre-existing infrastructure and are never created here.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be queried. Absence is `None`.
    pub async fn locate_network(
        &self,
        name: &FqName,
    ) -> Result<Option<Stored<Network>>, ProvisionError> {
        self.locate::<Network>(name).await
    }

    /// Look a network up, creating it with `subnet` if absent.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached or rejects the creation.
    pub async fn locate_or_provision_network(
        &self,
        name: &FqName,
        subnet: IpNet,
    ) -> Result<Stored<Network>, ProvisionError> {
        let network = NetworkBuilder::default()
            .fq_name(name.clone())
            .subnet(subnet)
            .build()?;
        self.locate_or_create(network).await
    }

    /// Bind `appliance` to `network` in the given role.
    ///
    /// Returns `None` (and creates nothing) if the network is absent.
    ///
    /// # Errors
    ///
    /// Fails if the derived name is illegal or if the resource graph cannot be reached.
    pub async fn locate_or_create_attachment_point(
        &self,
        appliance: &Stored<Appliance>,
        network: Option<&Stored<Network>>,
        local: &InterfaceName,
        role: Role,
    ) -> Result<Option<Stored<AttachmentPoint>>, ProvisionError> {
        let Some(network) = network else {
            debug!("no {role} attachment point for {}", appliance.fq_name());
            return Ok(None);
        };
        let attachment = AttachmentPointBuilder::default()
            .fq_name(attachment_name(appliance.fq_name(), local)?)
            .appliance(appliance.fq_name().clone())
            .network(network.fq_name().clone())
            .role(role)
            .build()?;
        self.locate_or_create(attachment).await.map(Some)
    }

    /// The address allocated to `attachment`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourceNotFound`] if no address has been allocated yet.
    pub async fn get_interface_prefix(
        &self,
        attachment: &Stored<AttachmentPoint>,
    ) -> Result<IpNet, ProvisionError> {
        let current = self.read(attachment.id).await?;
        current
            .value
            .ip_prefix
            .ok_or_else(|| ProvisionError::ResourceNotFound {
                kind: "address allocation",
                name: attachment.fq_name().to_string(),
            })
    }

    async fn require_network(&self, name: &FqName) -> Result<Stored<Network>, ProvisionError> {
        self.locate::<Network>(name)
            .await?
            .ok_or_else(|| ProvisionError::ResourceNotFound {
                kind: Network::KIND,
                name: name.to_string(),
            })
    }

    /// The default gateway of the subnet of network `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourceNotFound`] if the network or its gateway is absent.
    pub async fn get_network_gateway(&self, name: &FqName) -> Result<IpAddr, ProvisionError> {
        self.require_network(name)
            .await?
            .value
            .default_gateway()
            .ok_or_else(|| ProvisionError::ResourceNotFound {
                kind: "gateway",
                name: name.to_string(),
            })
    }

    /// The subnet of network `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourceNotFound`] if the network or its subnet is absent.
    pub async fn get_network_subnet_cidr(&self, name: &FqName) -> Result<IpNet, ProvisionError> {
        self.require_network(name)
            .await?
            .value
            .subnet
            .ok_or_else(|| ProvisionError::ResourceNotFound {
                kind: "subnet",
                name: name.to_string(),
            })
    }
}

/// `domain:project:<appliance>-<interface>`.
fn attachment_name(appliance: &FqName, local: &InterfaceName) -> Result<FqName, IllegalFqName> {
    appliance
        .parent()
        .ok_or(IllegalFqName::Empty)?
        .child(format!("{}-{local}", appliance.label()))
}

#[cfg(test)]
mod tests {
    use super::{Locator, attachment_name};
    use crate::{ProvisionError, RetryPolicy};
    use graph::GraphError;
    use graph::memory::MemoryGraph;
    use model::{Appliance, AttachmentPoint, FqName, InterfaceName, Network, NetworkBuilder, Role};
    use pretty_assertions::assert_eq;

    fn fq(s: &str) -> FqName {
        s.parse().unwrap()
    }

    fn network(name: &str, subnet: &str) -> Network {
        NetworkBuilder::default()
            .fq_name(fq(name))
            .subnet(subnet.parse::<ipnet::IpNet>().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn attachment_names() {
        let name = attachment_name(
            &fq("d:p:host-nat1"),
            &InterfaceName::try_from("snat_itf").unwrap(),
        )
        .unwrap();
        assert_eq!(name.to_string(), "d:p:host-nat1-snat_itf");
    }

    #[tokio::test]
    async fn appliance_is_created_once() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let first = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        let second = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(graph.created::<Appliance>(), 1);
    }

    #[tokio::test]
    async fn concurrent_creation_is_success() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let existing = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        graph.miss_next_locate::<Appliance>();
        let again = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        assert_eq!(again.id, existing.id);
        assert_eq!(graph.count::<Appliance>(), 1);
    }

    #[tokio::test]
    async fn attachment_point_requires_network() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let vm = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        let local = InterfaceName::try_from("gw").unwrap();
        let absent = locator
            .locate_or_create_attachment_point(&vm, None, &local, Role::Right)
            .await
            .unwrap();
        assert_eq!(absent, None);
        assert_eq!(graph.count::<AttachmentPoint>(), 0);

        graph.seed(&network("d:p:public", "192.0.2.0/24"));
        let net = locator.locate_network(&fq("d:p:public")).await.unwrap();
        let point = locator
            .locate_or_create_attachment_point(&vm, net.as_ref(), &local, Role::Right)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(point.value.network, fq("d:p:public"));
        assert_eq!(point.value.role, Role::Right);
        assert_eq!(
            locator.get_interface_prefix(&point).await.unwrap().to_string(),
            "192.0.2.2/24"
        );
    }

    #[tokio::test]
    async fn network_metadata() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        graph.seed(&network("d:p:public", "192.0.2.0/24"));
        assert_eq!(
            locator.get_network_gateway(&fq("d:p:public")).await.unwrap(),
            "192.0.2.1".parse::<std::net::IpAddr>().unwrap()
        );
        assert_eq!(
            locator
                .get_network_subnet_cidr(&fq("d:p:public"))
                .await
                .unwrap()
                .to_string(),
            "192.0.2.0/24"
        );
        assert!(matches!(
            locator.get_network_gateway(&fq("d:p:absent")).await,
            Err(ProvisionError::ResourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn missing_address_is_resource_not_found() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        graph.seed(
            &NetworkBuilder::default()
                .fq_name(fq("d:p:nosubnet"))
                .build()
                .unwrap(),
        );
        let vm = locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        let net = locator.locate_network(&fq("d:p:nosubnet")).await.unwrap();
        let point = locator
            .locate_or_create_attachment_point(
                &vm,
                net.as_ref(),
                &InterfaceName::try_from("left").unwrap(),
                Role::Left,
            )
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            locator.get_interface_prefix(&point).await,
            Err(ProvisionError::ResourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(
            &graph,
            RetryPolicy {
                retries: 2,
                ..RetryPolicy::NEVER
            },
        );
        graph.fail_next([GraphError::Timeout, GraphError::Unavailable(503)]);
        locator
            .locate_or_create_appliance(&fq("d:p:host-nat1"))
            .await
            .unwrap();
        assert_eq!(graph.created::<Appliance>(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_remote_call() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        graph.fail_next([GraphError::Timeout]);
        assert_eq!(
            locator.locate_network(&fq("d:p:public")).await,
            Err(ProvisionError::RemoteCall(GraphError::Timeout))
        );
    }
}
