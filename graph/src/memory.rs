// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory [`ResourceGraph`] for tests.
//!
//! Objects are kept in their wire (JSON) form, exactly as the API server would see them.
//! Attachment points get an address from their network's subnet and a MAC address when created.

#![allow(clippy::missing_panics_doc)]

use crate::{GraphError, ResourceGraph};
use id::Id;
use ipnet::IpNet;
use mac_address::MacAddress;
use model::{AttachmentPoint, FqName, Network, Resource, Stored};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<&'static str, BTreeMap<FqName, (Uuid, Value)>>,
    names: HashMap<Uuid, (&'static str, FqName)>,
    creations: HashMap<&'static str, usize>,
    updates: HashMap<&'static str, usize>,
    failures: VecDeque<GraphError>,
    blind: HashSet<&'static str>,
}

impl Inner {
    fn next_failure(&mut self) -> Result<(), GraphError> {
        match self.failures.pop_front() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn find<R: Resource>(&self, fq_name: &FqName) -> Result<Option<Stored<R>>, GraphError> {
        let Some((uuid, value)) = self.objects.get(R::KIND).and_then(|k| k.get(fq_name)) else {
            return Ok(None);
        };
        let value = serde_json::from_value(value.clone())?;
        Ok(Some(Stored::new(Id::from_raw(*uuid), value)))
    }

    fn store<R: Resource>(&mut self, uuid: Uuid, value: &R) -> Result<(), GraphError> {
        let wire = serde_json::to_value(value)?;
        self.objects
            .entry(R::KIND)
            .or_default()
            .insert(value.fq_name().clone(), (uuid, wire));
        self.names.insert(uuid, (R::KIND, value.fq_name().clone()));
        Ok(())
    }

    /// Complete a new attachment point the way the API server does: MAC address plus an address
    /// allocated from the network's subnet (skipping the gateway and addresses in use).
    fn allocate(&self, uuid: Uuid, mut attachment: AttachmentPoint) -> Result<AttachmentPoint, GraphError> {
        if attachment.mac_address.is_none() {
            let b = uuid.as_bytes();
            attachment.mac_address = Some(MacAddress::new([0x02, b[0], b[1], b[2], b[3], b[4]]));
        }
        if attachment.ip_prefix.is_some() {
            return Ok(attachment);
        }
        let Some(network) = self.find::<Network>(&attachment.network)? else {
            return Ok(attachment);
        };
        let Some(subnet) = network.value.subnet else {
            return Ok(attachment);
        };
        let gateway = network.value.default_gateway();
        let mut in_use: HashSet<IpAddr> = HashSet::new();
        if let Some(attachments) = self.objects.get(AttachmentPoint::KIND) {
            for (_, wire) in attachments.values() {
                let other: AttachmentPoint = serde_json::from_value(wire.clone())?;
                if other.network == attachment.network
                    && let Some(prefix) = other.ip_prefix
                {
                    in_use.insert(prefix.addr());
                }
            }
        }
        attachment.ip_prefix = subnet
            .hosts()
            .find(|addr| Some(*addr) != gateway && !in_use.contains(addr))
            .and_then(|addr| IpNet::new(addr, subnet.prefix_len()).ok());
        Ok(attachment)
    }

    fn count(map: &mut HashMap<&'static str, usize>, kind: &'static str) {
        *map.entry(kind).or_default() += 1;
    }
}

/// A [`ResourceGraph`] living in process memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store `value` as pre-existing infrastructure (not counted as a creation).
    pub fn seed<R: Resource>(&self, value: &R) -> Id<R> {
        let uuid = Uuid::new_v4();
        let mut inner = self.inner();
        if let Err(e) = inner.store(uuid, value) {
            panic!("cannot seed {}: {e}", value.fq_name());
        }
        Id::from_raw(uuid)
    }

    /// Synchronous lookup for assertions.
    #[must_use]
    pub fn get<R: Resource>(&self, fq_name: &FqName) -> Option<Stored<R>> {
        self.inner().find(fq_name).ok().flatten()
    }

    /// Drop a resource, simulating its deletion by someone else.
    pub fn remove<R: Resource>(&self, fq_name: &FqName) {
        let mut inner = self.inner();
        let removed = inner.objects.get_mut(R::KIND).and_then(|k| k.remove(fq_name));
        if let Some((uuid, _)) = removed {
            inner.names.remove(&uuid);
        }
    }

    /// Number of resources of kind `R` created through [`ResourceGraph::create`].
    #[must_use]
    pub fn created<R: Resource>(&self) -> usize {
        self.inner().creations.get(R::KIND).copied().unwrap_or_default()
    }

    /// Number of updates applied to resources of kind `R`.
    #[must_use]
    pub fn updated<R: Resource>(&self) -> usize {
        self.inner().updates.get(R::KIND).copied().unwrap_or_default()
    }

    /// Number of stored resources of kind `R`.
    #[must_use]
    pub fn count<R: Resource>(&self) -> usize {
        self.inner().objects.get(R::KIND).map_or(0, BTreeMap::len)
    }

    /// Make the next calls fail with `failures`, in order.
    pub fn fail_next(&self, failures: impl IntoIterator<Item = GraphError>) {
        self.inner().failures.extend(failures);
    }

    /// Make the next `locate` of kind `R` miss, as if another client created the resource
    /// between our lookup and our create.
    pub fn miss_next_locate<R: Resource>(&self) {
        self.inner().blind.insert(R::KIND);
    }
}

impl ResourceGraph for MemoryGraph {
    async fn locate<R: Resource>(&self, fq_name: &FqName) -> Result<Option<Stored<R>>, GraphError> {
        let mut inner = self.inner();
        inner.next_failure()?;
        if inner.blind.remove(R::KIND) {
            debug!("pretending {} {fq_name} is absent", R::KIND);
            return Ok(None);
        }
        inner.find(fq_name)
    }

    async fn read<R: Resource>(&self, id: Id<R>) -> Result<Stored<R>, GraphError> {
        let mut inner = self.inner();
        inner.next_failure()?;
        let not_found = || GraphError::NotFound {
            kind: R::KIND,
            name: id.to_string(),
        };
        let fq_name = match inner.names.get(id.as_raw()) {
            Some((kind, fq_name)) if *kind == R::KIND => fq_name.clone(),
            _ => return Err(not_found()),
        };
        inner.find(&fq_name)?.ok_or_else(not_found)
    }

    async fn create<R: Resource>(&self, value: &R) -> Result<Id<R>, GraphError> {
        let mut inner = self.inner();
        inner.next_failure()?;
        if inner.find::<R>(value.fq_name())?.is_some() {
            return Err(GraphError::Conflict {
                kind: R::KIND,
                name: value.fq_name().to_string(),
            });
        }
        let uuid = Uuid::new_v4();
        if R::KIND == AttachmentPoint::KIND {
            let attachment: AttachmentPoint = serde_json::from_value(serde_json::to_value(value)?)?;
            let attachment = inner.allocate(uuid, attachment)?;
            inner.store(uuid, &attachment)?;
        } else {
            inner.store(uuid, value)?;
        }
        Inner::count(&mut inner.creations, R::KIND);
        Ok(Id::from_raw(uuid))
    }

    async fn update<R: Resource>(&self, id: Id<R>, value: &R) -> Result<(), GraphError> {
        let mut inner = self.inner();
        inner.next_failure()?;
        match inner.names.get(id.as_raw()) {
            Some((kind, fq_name)) if *kind == R::KIND && fq_name == value.fq_name() => {}
            _ => {
                return Err(GraphError::NotFound {
                    kind: R::KIND,
                    name: id.to_string(),
                });
            }
        }
        inner.store(*id.as_raw(), value)?;
        Inner::count(&mut inner.updates, R::KIND);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGraph;
    use crate::{GraphError, ResourceGraph};
    use model::{
        Appliance, ApplianceBuilder, AttachmentPoint, AttachmentPointBuilder, FqName, Network,
        NetworkBuilder, Role,
    };
    use pretty_assertions::assert_eq;

    fn fq(s: &str) -> FqName {
        s.parse().unwrap()
    }

    fn attachment(label: &str, network: &str) -> AttachmentPoint {
        AttachmentPointBuilder::default()
            .fq_name(fq(label))
            .appliance(fq("d:p:host-nat1"))
            .network(fq(network))
            .role(Role::Left)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_locate() {
        let graph = MemoryGraph::new();
        let vm: Appliance = ApplianceBuilder::default()
            .fq_name(fq("d:p:host-nat1"))
            .build()
            .unwrap();
        assert_eq!(graph.locate::<Appliance>(&vm.fq_name).await.unwrap(), None);
        let id = graph.create(&vm).await.unwrap();
        let found = graph.locate::<Appliance>(&vm.fq_name).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.value, vm);
        assert_eq!(graph.read(id).await.unwrap().value, vm);
        assert_eq!(graph.created::<Appliance>(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let graph = MemoryGraph::new();
        let vm: Appliance = ApplianceBuilder::default()
            .fq_name(fq("d:p:host-nat1"))
            .build()
            .unwrap();
        graph.create(&vm).await.unwrap();
        assert!(matches!(
            graph.create(&vm).await,
            Err(GraphError::Conflict { .. })
        ));
        assert_eq!(graph.count::<Appliance>(), 1);
    }

    #[tokio::test]
    async fn attachments_get_distinct_addresses() {
        let graph = MemoryGraph::new();
        let net: Network = NetworkBuilder::default()
            .fq_name(fq("d:p:net-left"))
            .subnet("10.0.0.0/29".parse::<ipnet::IpNet>().unwrap())
            .build()
            .unwrap();
        graph.seed(&net);
        let a = graph.create(&attachment("d:p:a", "d:p:net-left")).await.unwrap();
        let b = graph.create(&attachment("d:p:b", "d:p:net-left")).await.unwrap();
        let a = graph.read(a).await.unwrap().value;
        let b = graph.read(b).await.unwrap().value;
        assert_eq!(a.ip_prefix.unwrap().to_string(), "10.0.0.2/29");
        assert_eq!(b.ip_prefix.unwrap().to_string(), "10.0.0.3/29");
        assert!(a.mac_address.is_some());
    }

    #[tokio::test]
    async fn attachment_without_subnet_has_no_address() {
        let graph = MemoryGraph::new();
        let id = graph.create(&attachment("d:p:a", "d:p:nowhere")).await.unwrap();
        assert_eq!(graph.read(id).await.unwrap().value.ip_prefix, None);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let graph = MemoryGraph::new();
        graph.fail_next([GraphError::Timeout]);
        assert_eq!(
            graph.locate::<Network>(&fq("d:p:n")).await,
            Err(GraphError::Timeout)
        );
        assert_eq!(graph.locate::<Network>(&fq("d:p:n")).await, Ok(None));
    }

    #[tokio::test]
    async fn update_requires_matching_identity() {
        let graph = MemoryGraph::new();
        let net: Network = NetworkBuilder::default()
            .fq_name(fq("d:p:n"))
            .build()
            .unwrap();
        let id = graph.seed(&net);
        let renamed = Network {
            fq_name: fq("d:p:other"),
            ..net.clone()
        };
        assert!(graph.update(id, &renamed).await.is_err());
        graph.update(id, &net).await.unwrap();
        assert_eq!(graph.updated::<Network>(), 1);
    }
}
