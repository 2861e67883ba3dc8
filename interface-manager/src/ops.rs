// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The contract of the namespace configurator.

use crate::NamespaceError;
use id::Id;
use ipnet::IpNet;
use mac_address::MacAddress;
use model::{AttachmentPoint, IllegalInterfaceName, InterfaceName};
use std::future::Future;
use std::net::IpAddr;

/// Number of hex digits of the attachment point id used in derived interface names.
const ID_DIGITS: usize = 12;

/// The two ends of the virtual interface pair wiring an attachment point into a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VethPair {
    /// Name of the end inside the namespace.
    pub local: InterfaceName,
    /// Name of the end left in the host namespace, which the forwarding plane binds to.
    pub host: InterfaceName,
    /// Name given to the namespace end until it has been moved and renamed.
    pub transient: InterfaceName,
    /// Hardware address of the namespace end, as assigned to the attachment point.
    pub mac: Option<MacAddress>,
}

impl VethPair {
    /// Derive the pair of the attachment point `attachment`.
    ///
    /// # Errors
    ///
    /// Never in practice: derived names are short hex strings.
    pub fn new(
        local: InterfaceName,
        attachment: Id<AttachmentPoint>,
        mac: Option<MacAddress>,
    ) -> Result<Self, IllegalInterfaceName> {
        let digits = attachment.short(ID_DIGITS);
        Ok(Self {
            local,
            host: InterfaceName::try_from(format!("ns{digits}"))?,
            transient: InterfaceName::try_from(format!("nt{digits}"))?,
            mac,
        })
    }
}

/// Configuration of the network namespace hosting an appliance.
///
/// Every operation is idempotent: applying it again to a namespace where it already took effect
/// is a no-op.
pub trait NamespaceOps: Send + Sync {
    /// Create the namespace `namespace` unless it exists.
    fn init_namespace(&self, namespace: &str)
    -> impl Future<Output = Result<(), NamespaceError>> + Send;

    /// Create the interface pair `pair`, with its local end inside `namespace`.
    ///
    /// Returns the name of the host end.
    fn materialize_interface(
        &self,
        namespace: &str,
        pair: &VethPair,
    ) -> impl Future<Output = Result<InterfaceName, NamespaceError>> + Send;

    /// Assign `prefix` to `interface`; with `advertise_default`, also route everything out of it.
    fn configure_interface(
        &self,
        namespace: &str,
        interface: &InterfaceName,
        prefix: IpNet,
        advertise_default: bool,
    ) -> impl Future<Output = Result<(), NamespaceError>> + Send;

    /// Masquerade traffic sourced from `cidr` and leaving through `via`.
    fn install_nat(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> impl Future<Output = Result<(), NamespaceError>> + Send;

    /// Route `cidr` out of `via`.
    fn install_route_via_interface(
        &self,
        namespace: &str,
        cidr: IpNet,
        via: &InterfaceName,
    ) -> impl Future<Output = Result<(), NamespaceError>> + Send;

    /// Install (or replace) the default route of the namespace.
    fn set_default_route(
        &self,
        namespace: &str,
        gateway: IpAddr,
        via: &InterfaceName,
    ) -> impl Future<Output = Result<(), NamespaceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::VethPair;
    use id::Id;
    use model::InterfaceName;

    #[test]
    fn pair_names_derive_from_attachment() {
        let id = "6f1a2b3c-4d5e-4f60-8a7b-9c0d1e2f3a4b".parse().unwrap();
        let pair = VethPair::new(InterfaceName::try_from("gw").unwrap(), id, None).unwrap();
        assert_eq!(pair.host.as_ref(), "ns6f1a2b3c4d5e");
        assert_eq!(pair.transient.as_ref(), "nt6f1a2b3c4d5e");
        assert_eq!(pair.local.as_ref(), "gw");
    }

    #[test]
    fn distinct_attachments_get_distinct_host_names() {
        let local = InterfaceName::try_from("gw").unwrap();
        let a = VethPair::new(local.clone(), Id::new(), None).unwrap();
        let b = VethPair::new(local, Id::new(), None).unwrap();
        assert_ne!(a.host, b.host);
    }
}
