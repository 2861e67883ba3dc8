// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use graph::GraphError;
use interface_manager::NamespaceError;
use model::{FqName, IllegalFqName, IllegalInterfaceName, ModelError};
use thiserror::Error;
use vrouter::RegistrationError;

/// Failures which abort a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("{kind} '{name}' not found")]
    ResourceNotFound { kind: &'static str, name: String },
    #[error("service template '{0}' has no properties")]
    TemplateNotReady(FqName),
    #[error("network '{0}' not found")]
    NetworkMissing(FqName),
    #[error("service instance '{name}' already chains '{left}' to '{right}'")]
    InstanceInUse {
        name: FqName,
        left: FqName,
        right: FqName,
    },
    #[error("resource graph request failed: {0}")]
    RemoteCall(GraphError),
    #[error("namespace configuration failed: {0}")]
    Namespace(#[from] NamespaceError),
    #[error("forwarding plane registration failed: {0}")]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Name(#[from] IllegalFqName),
    #[error(transparent)]
    InterfaceName(#[from] IllegalInterfaceName),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<GraphError> for ProvisionError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::NotFound { kind, name } => ProvisionError::ResourceNotFound { kind, name },
            other => ProvisionError::RemoteCall(other),
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for ProvisionError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        ProvisionError::Config(format!("{} must be set", value.field_name()))
    }
}
