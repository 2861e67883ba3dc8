// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Common traits and wrappers of resources held by the resource graph.

use crate::fqname::FqName;
use id::Id;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A resource which can be stored in the resource graph.
///
/// Every resource is addressed by a deterministic [`FqName`] and carries the kind string used
/// by the resource graph to route requests for it.
pub trait Resource: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The resource kind on the wire (e.g. `virtual-network`).
    const KIND: &'static str;

    /// The fully-qualified name of this resource.
    fn fq_name(&self) -> &FqName;
}

/// A resource as read back from the resource graph, together with its identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Stored<R> {
    pub id: Id<R>,
    pub value: R,
}

impl<R: Resource> Stored<R> {
    #[must_use]
    pub fn new(id: Id<R>, value: R) -> Self {
        Self { id, value }
    }

    #[must_use]
    pub fn fq_name(&self) -> &FqName {
        self.value.fq_name()
    }
}

/// Error returned by the builders of this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("field '{0}' must be set")]
    Uninitialized(&'static str),
}

impl From<derive_builder::UninitializedFieldError> for ModelError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        ModelError::Uninitialized(value.field_name())
    }
}
