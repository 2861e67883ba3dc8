// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Source NAT rules.

use ipnet::IpNet;
use model::InterfaceName;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;

/// A masquerade rule matching traffic sourced from `source` and leaving through `egress`.
///
/// Nothing else is matched: there is no namespace-wide form of this rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MasqueradeRule {
    source: IpNet,
    egress: InterfaceName,
}

impl MasqueradeRule {
    pub const TABLE: &'static str = "nat";
    pub const CHAIN: &'static str = "POSTROUTING";

    /// The host bits of `source` are dropped (`10.1.2.3/24` matches `10.1.2.0/24`).
    #[must_use]
    pub fn new(source: IpNet, egress: InterfaceName) -> Self {
        Self {
            source: source.trunc(),
            egress,
        }
    }

    #[must_use]
    pub fn source(&self) -> IpNet {
        self.source
    }

    #[must_use]
    pub fn egress(&self) -> &InterfaceName {
        &self.egress
    }

    /// True if a packet from `source` leaving through `egress` gets masqueraded by this rule.
    #[must_use]
    pub fn matches(&self, source: IpAddr, egress: &InterfaceName) -> bool {
        self.source.contains(&source) && &self.egress == egress
    }

    /// The rule specification as given to `iptables -t nat -A POSTROUTING`.
    #[must_use]
    pub fn rule(&self) -> String {
        format!("-s {} -o {} -j MASQUERADE", self.source, self.egress)
    }
}

impl Display for MasqueradeRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "-t {} -A {} {}", Self::TABLE, Self::CHAIN, self.rule())
    }
}

#[cfg(test)]
mod tests {
    use super::MasqueradeRule;
    use model::InterfaceName;

    fn ifname(name: &str) -> InterfaceName {
        InterfaceName::try_from(name).unwrap()
    }

    #[test]
    fn rule_text() {
        let rule = MasqueradeRule::new("10.1.2.3/24".parse().unwrap(), ifname("snat_itf"));
        assert_eq!(rule.rule(), "-s 10.1.2.0/24 -o snat_itf -j MASQUERADE");
        assert_eq!(
            rule.to_string(),
            "-t nat -A POSTROUTING -s 10.1.2.0/24 -o snat_itf -j MASQUERADE"
        );
    }

    #[test]
    fn matches_only_source_and_egress() {
        let rule = MasqueradeRule::new("10.1.2.0/24".parse().unwrap(), ifname("snat_itf"));
        assert!(rule.matches("10.1.2.9".parse().unwrap(), &ifname("snat_itf")));
        assert!(!rule.matches("10.1.3.9".parse().unwrap(), &ifname("snat_itf")));
        assert!(!rule.matches("10.1.2.9".parse().unwrap(), &ifname("gw")));
    }
}
