// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`NamespaceOps`] on the linux networking stack (netlink and iptables).

use crate::nat::MasqueradeRule;
use crate::netns::{in_netns, netns_path, open_netns};
use crate::{NamespaceError, NamespaceOps, VethPair};
use futures::TryStreamExt;
use ipnet::{IpNet, Ipv4Net};
use model::InterfaceName;
use nix::errno::Errno;
use rtnetlink::packet_route::route::RouteMessage;
use rtnetlink::{Handle, LinkUnspec, LinkVeth, NetworkNamespace, RouteMessageBuilder};
use std::net::{IpAddr, Ipv4Addr};
use std::os::fd::AsRawFd;
use tracing::{debug, info};

const DEFAULT_ROUTE: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::UNSPECIFIED, 0);

/// Drives the kernel through netlink, from the host namespace and from worker threads moved into
/// the appliance namespace.
#[derive(Clone, Debug)]
pub struct Netlink {
    handle: Handle,
}

impl Netlink {
    /// Open a netlink connection in the current (host) namespace.
    ///
    /// Must be called from within a tokio runtime, which drives the connection.
    ///
    /// # Errors
    ///
    /// Fails if the netlink socket cannot be opened.
    pub fn new() -> Result<Self, NamespaceError> {
        Ok(Self {
            handle: connect()?,
        })
    }
}

fn connect() -> Result<Handle, NamespaceError> {
    let (connection, handle, _) = rtnetlink::new_connection()
        .map_err(|e| NamespaceError::Netlink(format!("failed to create connection: {e}")))?;
    tokio::spawn(connection);
    Ok(handle)
}

fn is_errno(err: &rtnetlink::Error, errno: Errno) -> bool {
    matches!(err, rtnetlink::Error::NetlinkError(message) if message.raw_code() == -(errno as i32))
}

/// Treat "already exists" as success.
fn tolerate_existing(outcome: Result<(), rtnetlink::Error>) -> Result<(), NamespaceError> {
    match outcome {
        Err(e) if is_errno(&e, Errno::EEXIST) => Ok(()),
        other => Ok(other?),
    }
}

async fn link_index(handle: &Handle, name: &str) -> Result<Option<u32>, NamespaceError> {
    let mut links = handle.link().get().match_name(name.to_string()).execute();
    match links.try_next().await {
        Ok(Some(message)) => Ok(Some(message.header.index)),
        Ok(None) => Ok(None),
        Err(e) if is_errno(&e, Errno::ENODEV) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn require_link(handle: &Handle, name: &str) -> Result<u32, NamespaceError> {
    link_index(handle, name)
        .await?
        .ok_or_else(|| NamespaceError::NoSuchInterface(name.to_string()))
}

fn ipv4(cidr: IpNet) -> Result<Ipv4Net, NamespaceError> {
    match cidr {
        IpNet::V4(net) => Ok(net.trunc()),
        IpNet::V6(net) => Err(NamespaceError::Unsupported(format!("IPv6 route to {net}"))),
    }
}

fn route(destination: Ipv4Net, gateway: Option<Ipv4Addr>, via: u32) -> RouteMessage {
    let builder = RouteMessageBuilder::<Ipv4Addr>::new()
        .destination_prefix(destination.network(), destination.prefix_len())
        .output_interface(via);
    match gateway {
        Some(gateway) => builder.gateway(gateway).build(),
        None => builder.build(),
    }
}

/// Install (or replace) a route inside `namespace`.
fn replace_route(
    namespace: &str,
    destination: Ipv4Net,
    gateway: Option<Ipv4Addr>,
    via: &InterfaceName,
) -> Result<(), NamespaceError> {
    let via = via.to_string();
    in_netns(namespace, move || async move {
        let handle = connect()?;
        let index = require_link(&handle, &via).await?;
        handle
            .route()
            .add(route(destination, gateway, index))
            .replace()
            .execute()
            .await?;
        Ok(())
    })
}

/// Where the interface pair of an attachment point stands, seen from both namespaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PairState {
    host: bool,
    transient_in_host: bool,
    transient_in_netns: bool,
    local_in_netns: bool,
}

/// The first step still to be applied to an interface pair. Each step implies the ones
/// declared before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Resume {
    Done,
    Rename,
    Move,
    Create,
    /// The host end lost its peer and is deleted first.
    Recreate,
}

impl PairState {
    fn resume(self) -> Resume {
        if self.local_in_netns {
            Resume::Done
        } else if self.transient_in_netns {
            Resume::Rename
        } else if self.transient_in_host {
            Resume::Move
        } else if self.host {
            Resume::Recreate
        } else {
            Resume::Create
        }
    }
}

impl Netlink {
    async fn pair_state(&self, namespace: &str, pair: &VethPair) -> Result<PairState, NamespaceError> {
        let host = link_index(&self.handle, pair.host.as_ref()).await?.is_some();
        let transient_in_host = link_index(&self.handle, pair.transient.as_ref())
            .await?
            .is_some();
        let transient = pair.transient.to_string();
        let local = pair.local.to_string();
        let (transient_in_netns, local_in_netns) = in_netns(namespace, move || async move {
            let handle = connect()?;
            Ok((
                link_index(&handle, &transient).await?.is_some(),
                link_index(&handle, &local).await?.is_some(),
            ))
        })?;
        Ok(PairState {
            host,
            transient_in_host,
            transient_in_netns,
            local_in_netns,
        })
    }
}

/// Give the namespace end of `pair` its final name and MAC, and bring it and loopback up.
fn rename_in_netns(namespace: &str, pair: &VethPair) -> Result<(), NamespaceError> {
    let transient = pair.transient.to_string();
    let local = pair.local.to_string();
    let mac = pair.mac;
    in_netns(namespace, move || async move {
        let handle = connect()?;
        if let Some(lo) = link_index(&handle, "lo").await? {
            handle
                .link()
                .set(LinkUnspec::new_with_index(lo).up().build())
                .execute()
                .await?;
        }
        let index = require_link(&handle, &transient).await?;
        let mut message = LinkUnspec::new_with_index(index).name(local);
        if let Some(mac) = mac {
            message = message.address(mac.bytes().to_vec());
        }
        handle.link().set(message.build()).execute().await?;
        handle
            .link()
            .set(LinkUnspec::new_with_index(index).up().build())
            .execute()
            .await?;
        Ok(())
    })
}

impl NamespaceOps for Netlink {
    async fn init_namespace(&self, namespace: &str) -> Result<(), NamespaceError> {
        if netns_path(namespace).exists() {
            debug!("netns {namespace} already exists");
            return Ok(());
        }
        info!("Creating netns {namespace}");
        NetworkNamespace::add(namespace.to_string()).await?;
        Ok(())
    }

    async fn materialize_interface(
        &self,
        namespace: &str,
        pair: &VethPair,
    ) -> Result<InterfaceName, NamespaceError> {
        let state = self.pair_state(namespace, pair).await?;
        let resume = state.resume();
        debug!("interface pair {} / {namespace}:{}: {state:?}, {resume:?}", pair.host, pair.local);

        if resume == Resume::Recreate {
            info!("Removing orphaned interface {}", pair.host);
            let host = require_link(&self.handle, pair.host.as_ref()).await?;
            self.handle.link().del(host).execute().await?;
        }
        if resume >= Resume::Create {
            info!(
                "Creating interface pair {} / {}:{}",
                pair.host, namespace, pair.local
            );
            tolerate_existing(
                self.handle
                    .link()
                    .add(LinkVeth::new(pair.host.as_ref(), pair.transient.as_ref()).build())
                    .execute()
                    .await,
            )?;
        }
        if resume >= Resume::Move {
            let transient = require_link(&self.handle, pair.transient.as_ref()).await?;
            let netns = open_netns(namespace)?;
            self.handle
                .link()
                .set(
                    LinkUnspec::new_with_index(transient)
                        .setns_by_fd(netns.as_raw_fd())
                        .build(),
                )
                .execute()
                .await?;
        }
        let host = require_link(&self.handle, pair.host.as_ref()).await?;
        self.handle
            .link()
            .set(LinkUnspec::new_with_index(host).up().build())
            .execute()
            .await?;
        if resume >= Resume::Rename {
            rename_in_netns(namespace, pair)?;
        }
        Ok(pair.host.clone())
    }

    async fn configure_interface(
        &self,
        namespace: &str,
        interface: &InterfaceName,
        prefix: IpNet,
        advertise_default: bool,
    ) -> Result<(), NamespaceError> {
        info!("Assigning {prefix} to {namespace}:{interface}");
        let name = interface.to_string();
        in_netns(namespace, move || async move {
            let handle = connect()?;
            let index = require_link(&handle, &name).await?;
            tolerate_existing(
                handle
                    .address()
                    .add(index, prefix.addr(), prefix.prefix_len())
                    .execute()
                    .await,
            )
        })?;
        if advertise_default {
            replace_route(namespace, DEFAULT_ROUTE, None, interface)?;
        }
        Ok(())
    }

    async fn install_nat(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let rule = MasqueradeRule::new(cidr, via.clone());
        info!("Installing nat rule in {namespace}: {rule}");
        in_netns(namespace, move || async move {
            let iptables = iptables::new(cidr.addr().is_ipv6())
                .map_err(|e| NamespaceError::Nat(e.to_string()))?;
            iptables
                .append_unique(MasqueradeRule::TABLE, MasqueradeRule::CHAIN, &rule.rule())
                .map_err(|e| NamespaceError::Nat(e.to_string()))
        })
    }

    async fn install_route_via_interface(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        info!("Routing {cidr} via {namespace}:{via}");
        replace_route(namespace, ipv4(cidr)?, None, via)
    }

    async fn set_default_route(
        &self,
        namespace: &str,
        gateway: IpAddr,
        via: &InterfaceName,
    ) -> Result<(), NamespaceError> {
        let IpAddr::V4(gateway) = gateway else {
            return Err(NamespaceError::Unsupported(format!(
                "IPv6 default gateway {gateway}"
            )));
        };
        info!("Setting default route of {namespace} via {gateway} dev {via}");
        replace_route(namespace, DEFAULT_ROUTE, Some(gateway), via)
    }
}
