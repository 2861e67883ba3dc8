// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The contract of the resource graph.

use crate::GraphError;
use id::Id;
use model::{FqName, Resource, Stored};
use std::future::Future;

/// Create, read and update access to the resource graph.
///
/// Every resource is addressed by its fully-qualified name; identifiers are assigned by the graph.
///
/// # Contract
///
/// * `locate` reports absence as `Ok(None)`, never as an error.
/// * `create` of a name which already exists fails with [`GraphError::Conflict`] and leaves the
///   stored resource untouched.
/// * `update` replaces the mutable properties of an existing resource with those of `value`.
pub trait ResourceGraph: Send + Sync {
    /// Look a resource up by name.
    fn locate<R: Resource>(
        &self,
        fq_name: &FqName,
    ) -> impl Future<Output = Result<Option<Stored<R>>, GraphError>> + Send;

    /// Read a resource by identifier.
    fn read<R: Resource>(
        &self,
        id: Id<R>,
    ) -> impl Future<Output = Result<Stored<R>, GraphError>> + Send;

    /// Create a resource and return its identifier.
    fn create<R: Resource>(
        &self,
        value: &R,
    ) -> impl Future<Output = Result<Id<R>, GraphError>> + Send;

    /// Replace the properties of an existing resource.
    fn update<R: Resource>(
        &self,
        id: Id<R>,
        value: &R,
    ) -> impl Future<Output = Result<(), GraphError>> + Send;
}
