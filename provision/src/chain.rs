// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The service chain: template, instance, policy and route table steering traffic through the
//! appliance.

use crate::{Locator, ProvisionError};
use graph::ResourceGraph;
use model::{
    Appliance, FqName, Network, NetworkPolicy, Resource, RouteTable, Sequence, ServiceInstance,
    ServiceTemplate, ServiceTemplateProperties, Stored,
};
use tracing::info;

/// Builds the service chain through an appliance.
#[derive(Debug)]
pub struct ServiceChain<'l, 'g, G> {
    locator: &'l Locator<'g, G>,
}

impl<'l, 'g, G: ResourceGraph> ServiceChain<'l, 'g, G> {
    #[must_use]
    pub fn new(locator: &'l Locator<'g, G>) -> Self {
        Self { locator }
    }

    /// Locate or create the service template `name` and make it an in-network-nat firewall.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached.
    pub async fn ensure_service_template(
        &self,
        name: &FqName,
    ) -> Result<Stored<ServiceTemplate>, ProvisionError> {
        info!("Creating service template {name}");
        self.locator
            .ensure(ServiceTemplate {
                fq_name: name.clone(),
                properties: Some(ServiceTemplateProperties::in_network_nat()),
            })
            .await
    }

    /// Locate or create the service instance `name` of `template`, chaining `left` to `right`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProvisionError::TemplateNotReady`] if `template` has no properties and with
    /// [`ProvisionError::ResourceNotFound`] if it does not exist. An instance `name` chaining
    /// other networks belongs to another appliance and is left alone:
    /// [`ProvisionError::InstanceInUse`].
    pub async fn ensure_service_instance(
        &self,
        name: &FqName,
        template: &FqName,
        left: &FqName,
        right: &FqName,
    ) -> Result<Stored<ServiceInstance>, ProvisionError> {
        let Some(stored_template) = self.locator.locate::<ServiceTemplate>(template).await? else {
            return Err(ProvisionError::ResourceNotFound {
                kind: ServiceTemplate::KIND,
                name: template.to_string(),
            });
        };
        if stored_template.value.properties.is_none() {
            return Err(ProvisionError::TemplateNotReady(template.clone()));
        }
        if let Some(existing) = self.locator.locate::<ServiceInstance>(name).await?
            && let Some(chained) = existing.value.properties
            && (chained.left_virtual_network != *left || chained.right_virtual_network != *right)
        {
            return Err(ProvisionError::InstanceInUse {
                name: name.clone(),
                left: chained.left_virtual_network,
                right: chained.right_virtual_network,
            });
        }
        info!("Creating service instance {name}");
        self.locator
            .ensure(ServiceInstance::chaining(name.clone(), template, left, right))
            .await
    }

    /// Locate or create the policy `name` passing all traffic between `left` and `right` through
    /// `instance`, and attach it to both networks.
    ///
    /// # Errors
    ///
    /// Fails with [`ProvisionError::NetworkMissing`] if either network is absent.
    pub async fn ensure_policy_chain(
        &self,
        name: &FqName,
        left: &FqName,
        right: &FqName,
        instance: &FqName,
    ) -> Result<Stored<NetworkPolicy>, ProvisionError> {
        info!("Create and attach policy {name}");
        let mut networks = Vec::with_capacity(2);
        for network in [left, right] {
            let located = self
                .locator
                .locate::<Network>(network)
                .await?
                .ok_or_else(|| ProvisionError::NetworkMissing(network.clone()))?;
            networks.push(located);
        }
        let policy = self
            .locator
            .ensure(NetworkPolicy::service_chain(
                name.clone(),
                left,
                right,
                instance,
            ))
            .await?;
        for network in networks {
            let attached = network.value.clone().with_policy(name, Sequence::FIRST);
            if attached != network.value {
                self.locator.update(network.id, attached).await?;
            }
        }
        Ok(policy)
    }

    /// Record that `appliance` implements `instance`.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached.
    pub async fn associate_appliance(
        &self,
        instance: &Stored<ServiceInstance>,
        appliance: &Stored<Appliance>,
    ) -> Result<Stored<Appliance>, ProvisionError> {
        let associated = appliance
            .value
            .clone()
            .with_service_instance(instance.fq_name());
        if associated == appliance.value {
            return Ok(appliance.clone());
        }
        info!(
            "Associating {} with service instance {}",
            appliance.fq_name(),
            instance.fq_name()
        );
        self.locator.update(appliance.id, associated).await
    }

    /// Locate or create the route table `name` sending everything to `instance`.
    ///
    /// # Errors
    ///
    /// Fails if the resource graph cannot be reached.
    pub async fn create_default_route_entry(
        &self,
        name: &FqName,
        instance: &FqName,
    ) -> Result<Stored<RouteTable>, ProvisionError> {
        self.locator
            .ensure(RouteTable::default_via(name.clone(), instance))
            .await
    }

    /// Attach `table` to `network`, drawing its traffic through the chain.
    ///
    /// # Errors
    ///
    /// Fails with [`ProvisionError::NetworkMissing`] if `network` is absent.
    pub async fn attach_route(
        &self,
        table: &Stored<RouteTable>,
        network: &FqName,
    ) -> Result<(), ProvisionError> {
        let located = self
            .locator
            .locate::<Network>(network)
            .await?
            .ok_or_else(|| ProvisionError::NetworkMissing(network.clone()))?;
        let attached = located.value.clone().with_route_table(table.fq_name());
        if attached != located.value {
            info!("Attaching route table {} to {network}", table.fq_name());
            self.locator.update(located.id, attached).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceChain;
    use crate::{Locator, ProvisionError, RetryPolicy};
    use graph::memory::MemoryGraph;
    use model::{
        FqName, Network, NetworkBuilder, NetworkPolicy, RouteTable, Sequence, ServiceInstance,
        ServiceTemplate,
    };
    use pretty_assertions::assert_eq;

    fn fq(s: &str) -> FqName {
        s.parse().unwrap()
    }

    fn seed_networks(graph: &MemoryGraph) {
        for name in ["d:p:net-left", "d:p:net-right"] {
            graph.seed(&NetworkBuilder::default().fq_name(fq(name)).build().unwrap());
        }
    }

    #[tokio::test]
    async fn incomplete_template_is_not_ready() {
        let graph = MemoryGraph::new();
        graph.seed(&ServiceTemplate {
            fq_name: fq("d:netns-nat-template"),
            properties: None,
        });
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let chain = ServiceChain::new(&locator);
        let err = chain
            .ensure_service_instance(
                &fq("d:p:netns-nat-instance"),
                &fq("d:netns-nat-template"),
                &fq("d:p:net-left"),
                &fq("d:p:net-right"),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ProvisionError::TemplateNotReady(fq("d:netns-nat-template")));
    }

    #[tokio::test]
    async fn incomplete_template_is_completed() {
        let graph = MemoryGraph::new();
        graph.seed(&ServiceTemplate {
            fq_name: fq("d:netns-nat-template"),
            properties: None,
        });
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let template = ServiceChain::new(&locator)
            .ensure_service_template(&fq("d:netns-nat-template"))
            .await
            .unwrap();
        assert!(template.value.properties.is_some());
        assert_eq!(graph.created::<ServiceTemplate>(), 0);
        assert_eq!(graph.updated::<ServiceTemplate>(), 1);
    }

    #[tokio::test]
    async fn instance_of_other_networks_is_not_rewritten() {
        let graph = MemoryGraph::new();
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let chain = ServiceChain::new(&locator);
        chain
            .ensure_service_template(&fq("d:netns-nat-template"))
            .await
            .unwrap();
        let instance = async |left: &str, right: &str| {
            chain
                .ensure_service_instance(
                    &fq("d:p:netns-nat-instance"),
                    &fq("d:netns-nat-template"),
                    &fq(left),
                    &fq(right),
                )
                .await
        };
        let first = instance("d:p:net-left", "d:p:net-right").await.unwrap();
        let again = instance("d:p:net-left", "d:p:net-right").await.unwrap();
        assert_eq!(first, again);

        let err = instance("d:p:net-a", "d:p:net-b").await.unwrap_err();
        assert_eq!(
            err,
            ProvisionError::InstanceInUse {
                name: fq("d:p:netns-nat-instance"),
                left: fq("d:p:net-left"),
                right: fq("d:p:net-right"),
            }
        );
        let stored = graph
            .get::<ServiceInstance>(&fq("d:p:netns-nat-instance"))
            .unwrap()
            .value;
        assert_eq!(
            stored.properties.unwrap().left_virtual_network,
            fq("d:p:net-left")
        );
        assert_eq!(graph.updated::<ServiceInstance>(), 0);
    }

    #[tokio::test]
    async fn policy_is_attached_once_to_both_networks() {
        let graph = MemoryGraph::new();
        seed_networks(&graph);
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let chain = ServiceChain::new(&locator);
        for _ in 0..2 {
            chain
                .ensure_policy_chain(
                    &fq("d:p:netns_nat_policy"),
                    &fq("d:p:net-left"),
                    &fq("d:p:net-right"),
                    &fq("d:p:netns-nat-instance"),
                )
                .await
                .unwrap();
        }
        assert_eq!(graph.created::<NetworkPolicy>(), 1);
        for name in ["d:p:net-left", "d:p:net-right"] {
            let network = graph.get::<Network>(&fq(name)).unwrap().value;
            assert_eq!(network.policies.len(), 1);
            assert_eq!(network.policies[0].policy, fq("d:p:netns_nat_policy"));
            assert_eq!(network.policies[0].sequence, Sequence::FIRST);
        }
        assert_eq!(graph.updated::<Network>(), 2);
    }

    #[tokio::test]
    async fn policy_needs_both_networks() {
        let graph = MemoryGraph::new();
        graph.seed(&NetworkBuilder::default().fq_name(fq("d:p:net-left")).build().unwrap());
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let err = ServiceChain::new(&locator)
            .ensure_policy_chain(
                &fq("d:p:netns_nat_policy"),
                &fq("d:p:net-left"),
                &fq("d:p:net-right"),
                &fq("d:p:netns-nat-instance"),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ProvisionError::NetworkMissing(fq("d:p:net-right")));
        assert_eq!(graph.created::<NetworkPolicy>(), 0);
    }

    #[tokio::test]
    async fn route_table_attachment_is_idempotent() {
        let graph = MemoryGraph::new();
        graph.seed(&NetworkBuilder::default().fq_name(fq("d:p:private")).build().unwrap());
        let locator = Locator::new(&graph, RetryPolicy::NEVER);
        let chain = ServiceChain::new(&locator);
        let table = chain
            .create_default_route_entry(
                &fq("d:p:netns-nat-instance-routes"),
                &fq("d:p:netns-nat-instance"),
            )
            .await
            .unwrap();
        chain.attach_route(&table, &fq("d:p:private")).await.unwrap();
        chain.attach_route(&table, &fq("d:p:private")).await.unwrap();
        let network = graph.get::<Network>(&fq("d:p:private")).unwrap().value;
        assert_eq!(network.route_tables, vec![fq("d:p:netns-nat-instance-routes")]);
        assert_eq!(graph.created::<RouteTable>(), 1);
        assert_eq!(graph.updated::<Network>(), 1);
    }
}
