// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A [`ForwardingPlane`] which remembers the ports registered with it.

use crate::{ForwardingPlane, PortRegistration, RegistrationError};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    ports: BTreeMap<Uuid, PortRegistration>,
    requests: usize,
    failures: VecDeque<RegistrationError>,
}

/// In-memory [`ForwardingPlane`].
#[derive(Debug, Default)]
pub struct RecordingAgent {
    inner: Mutex<Inner>,
}

impl RecordingAgent {
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

    /// The registered ports, keyed by attachment point.
    #[must_use]
    pub fn ports(&self) -> BTreeMap<Uuid, PortRegistration> {
        self.inner().ports.clone()
    }

    /// Number of registration requests received (including failed ones).
    #[must_use]
    pub fn requests(&self) -> usize {
        self.inner().requests
    }

    /// Make the next registrations fail with `failures`, in order.
    pub fn fail_next(&self, failures: impl IntoIterator<Item = RegistrationError>) {
        self.inner().failures.extend(failures);
    }
}

impl ForwardingPlane for RecordingAgent {
    async fn register_interface(&self, port: &PortRegistration) -> Result<(), RegistrationError> {
        let mut inner = self.inner();
        inner.requests += 1;
        if let Some(failure) = inner.failures.pop_front() {
            return Err(failure);
        }
        inner.ports.insert(port.id, port.clone());
        Ok(())
    }
}
