// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Failures configuring a network namespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("network namespace {0} does not exist")]
    NoSuchNamespace(String),
    #[error("cannot enter network namespace {namespace}: {reason}")]
    Enter { namespace: String, reason: String },
    #[error("interface {0} not found")]
    NoSuchInterface(String),
    #[error("netlink error: {0}")]
    Netlink(String),
    #[error("failed to install nat rule: {0}")]
    Nat(String),
    #[error("{0} is not supported")]
    Unsupported(String),
    #[error("namespace worker failed: {0}")]
    Worker(String),
}

impl From<rtnetlink::Error> for NamespaceError {
    fn from(value: rtnetlink::Error) -> Self {
        NamespaceError::Netlink(value.to_string())
    }
}
