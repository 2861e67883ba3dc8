// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A [`NamespaceOps`] which only models the namespaces it is asked to configure.
//!
//! The model is faithful enough to check what a workflow leaves behind: which interfaces exist on
//! each side, their addresses, the routes of each namespace and which traffic gets masqueraded.

#![allow(clippy::missing_panics_doc)]

use crate::nat::MasqueradeRule;
use crate::{NamespaceError, NamespaceOps, VethPair};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use mac_address::MacAddress;
use model::InterfaceName;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Mutex, MutexGuard};

const DEFAULT_V4: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0);
const DEFAULT_V6: Ipv6Net = Ipv6Net::new_assert(Ipv6Addr::UNSPECIFIED, 0);

/// The namespace end of an interface pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalInterface {
    pub host: InterfaceName,
    pub mac: Option<MacAddress>,
    pub addresses: BTreeSet<IpNet>,
}

/// A route of a namespace. A route without gateway goes directly out of `via`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Route {
    pub destination: IpNet,
    pub gateway: Option<IpAddr>,
    pub via: InterfaceName,
}

/// What is known of a namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceState {
    pub interfaces: BTreeMap<InterfaceName, LocalInterface>,
    pub routes: BTreeSet<Route>,
    pub nat: Vec<MasqueradeRule>,
}

impl NamespaceState {
    /// True if traffic from `source` leaving through `egress` is masqueraded.
    #[must_use]
    pub fn is_masqueraded(&self, source: IpAddr, egress: &InterfaceName) -> bool {
        self.nat.iter().any(|rule| rule.matches(source, egress))
    }

    /// The default route, if any.
    #[must_use]
    pub fn default_route(&self) -> Option<&Route> {
        self.routes.iter().find(|route| route.destination.prefix_len() == 0)
    }
}

#[derive(Debug, Default)]
struct Inner {
    namespaces: BTreeMap<String, NamespaceState>,
    host_interfaces: BTreeSet<InterfaceName>,
    calls: usize,
    failures: VecDeque<NamespaceError>,
}

impl Inner {
    fn begin(&mut self) -> Result<(), NamespaceError> {
        self.calls += 1;
        match self.failures.pop_front() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn namespace(&mut self, name: &str) -> Result<&mut NamespaceState, NamespaceError> {
        self.namespaces
            .get_mut(name)
            .ok_or_else(|| NamespaceError::NoSuchNamespace(name.to_string()))
    }

    fn interface<'a>(
        state: &'a mut NamespaceState,
        name: &InterfaceName,
    ) -> Result<&'a mut LocalInterface, NamespaceError> {
        state
            .interfaces
            .get_mut(name)
            .ok_or_else(|| NamespaceError::NoSuchInterface(name.to_string()))
    }

    fn route(
        &mut self,
        namespace: &str,
        destination: IpNet,
        gateway: Option<IpAddr>,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let state = self.namespace(namespace)?;
        Self::interface(state, via)?;
        let destination = destination.trunc();
        state.routes.retain(|route| route.destination != destination);
        state.routes.insert(Route {
            destination,
            gateway,
            via: via.clone(),
        });
        Ok(())
    }
}

/// In-memory [`NamespaceOps`].
#[derive(Debug, Default)]
pub struct RecordingNamespace {
    inner: Mutex<Inner>,
}

impl RecordingNamespace {
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

    /// A snapshot of the namespace `name`.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<NamespaceState> {
        self.inner().namespaces.get(name).cloned()
    }

    /// Interfaces created in the host namespace.
    #[must_use]
    pub fn host_interfaces(&self) -> BTreeSet<InterfaceName> {
        self.inner().host_interfaces.clone()
    }

    /// Number of operations invoked so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.inner().calls
    }

    /// Make the next operations fail with `failures`, in order.
    pub fn fail_next(&self, failures: impl IntoIterator<Item = NamespaceError>) {
        self.inner().failures.extend(failures);
    }
}

impl NamespaceOps for RecordingNamespace {
    async fn init_namespace(&self, namespace: &str) -> Result<(), NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        inner.namespaces.entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn materialize_interface(
        &self,
        namespace: &str,
        pair: &VethPair,
    ) -> Result<InterfaceName, NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        if inner.host_interfaces.contains(&pair.host) {
            return Ok(pair.host.clone());
        }
        let state = inner.namespace(namespace)?;
        state.interfaces.insert(
            pair.local.clone(),
            LocalInterface {
                host: pair.host.clone(),
                mac: pair.mac,
                addresses: BTreeSet::new(),
            },
        );
        inner.host_interfaces.insert(pair.host.clone());
        Ok(pair.host.clone())
    }

    async fn configure_interface(
        &self,
        namespace: &str,
        interface: &InterfaceName,
        prefix: IpNet,
        advertise_default: bool,
    ) -> Result<(), NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        let state = inner.namespace(namespace)?;
        Inner::interface(state, interface)?.addresses.insert(prefix);
        if advertise_default {
            inner.route(namespace, IpNet::V4(DEFAULT_V4), None, interface)?;
        }
        Ok(())
    }

    async fn install_nat(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        let state = inner.namespace(namespace)?;
        Inner::interface(state, via)?;
        let rule = MasqueradeRule::new(cidr, via.clone());
        if !state.nat.contains(&rule) {
            state.nat.push(rule);
        }
        Ok(())
    }

    async fn install_route_via_interface(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        inner.route(namespace, cidr, None, via)
    }

    async fn set_default_route(
        &self,
        namespace: &str,
        gateway: IpAddr,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let mut inner = self.inner();
        inner.begin()?;
        let default = match gateway {
            IpAddr::V4(_) => IpNet::V4(DEFAULT_V4),
            IpAddr::V6(_) => IpNet::V6(DEFAULT_V6),
        };
        inner.route(namespace, default, Some(gateway), via)
    }
}
