// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed identifiers for resources held by the resource graph.
//!
//! The resource graph hands out a [`Uuid`] for every object it stores.
//! Wrapping those in [`Id<T>`] keeps the identifier of a network from being passed where the
//! identifier of a service instance is expected.
//!
//! ```
//! # use nsnat_id::Id;
//! struct Network;
//! struct ServiceInstance;
//!
//! fn bind(network: Id<Network>, instance: Id<ServiceInstance>) {
//!     // ...
//! }
//! ```
//!
//! ```rust,compile_fail
//! # use nsnat_id::Id;
//! # struct Network;
//! # struct ServiceInstance;
//! fn mixup(mut network: Id<Network>, instance: Id<ServiceInstance>) {
//!     network = instance; // <- does not compile
//! }
//! ```

use core::fmt::{Debug, Formatter};
use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A [`Uuid`] tagged at compile time with the type of resource it identifies.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct Id<T>(Uuid, #[cfg_attr(feature = "serde", serde(skip))] PhantomData<T>);

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Display>::fmt(&self.0, f)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Debug>::fmt(&self.0, f)
    }
}

impl<T> AsRef<Uuid> for Id<T> {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl<T> Id<T> {
    /// Generate a fresh (random) identifier.
    ///
    /// Only stores which allocate identifiers (the in-memory graph, for instance) should call this.
    /// Identifiers of remote resources are always read back from the store.
    #[must_use]
    pub fn new() -> Self {
        Id(Uuid::new_v4(), PhantomData)
    }

    /// Tag a [`Uuid`] received from the resource graph with its resource type.
    #[must_use]
    pub const fn from_raw(uuid: Uuid) -> Self {
        Id(uuid, PhantomData)
    }

    /// Strip the type tag.
    #[must_use]
    pub const fn into_raw(self) -> Uuid {
        self.0
    }

    /// Borrow the untyped [`Uuid`].
    #[must_use]
    pub const fn as_raw(&self) -> &Uuid {
        &self.0
    }

    /// The first `len` hex digits of the identifier (without dashes).
    ///
    /// Used to derive short, stable names (e.g. host side interface names) from an identifier.
    #[must_use]
    pub fn short(&self, len: usize) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(len);
        simple
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(value: Id<T>) -> Self {
        value.0
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_raw)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::Id;
    use bolero::{Driver, TypeGenerator};
    use std::marker::PhantomData;

    impl<T: 'static> TypeGenerator for Id<T> {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let raw = uuid::Builder::from_random_bytes(driver.produce::<[u8; 16]>()?).into_uuid();
            Some(Id(raw, PhantomData))
        }
    }
}
