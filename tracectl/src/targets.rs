// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of logging targets.

use crate::LevelFilter;
use linkme::distributed_slice;

/// A logging target as declared by [`trace_target!`](crate::trace_target).
#[derive(Debug)]
pub struct STarget {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

impl STarget {
    #[must_use]
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
        }
    }
}

#[distributed_slice]
pub static TRACING_TARGETS: [STarget];

/// Add a [`STarget`] to [`TRACING_TARGETS`]. Each expansion sits in its own anonymous const,
/// so the imports stay private and every static may be called `TRACE_TGT`.
#[macro_export]
#[doc(hidden)]
macro_rules! register_target {
    ($target:expr, $name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use linkme::distributed_slice;
            use $crate::LevelFilter;
            use $crate::targets::{STarget, TRACING_TARGETS};

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: STarget = STarget::new($target, $name, $level, $tags);
        };
    };
}

/// Declare the logging target of the calling module with a name, a default level and tags.
///
/// The target is the module path of the caller, so that `tracing` events emitted from within
/// that module (or its children) are filtered by the level configured for `name`.
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $level:expr, $tags:expr) => {
        $crate::register_target!(module_path!(), $name, $level, $tags);
    };
}

/// Declare a target for a third party crate (e.g. `hyper`) whose events we want to filter.
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        $crate::register_target!($target, $target, $level, $tags);
    };
}

#[cfg(test)]
mod tests {
    use super::TRACING_TARGETS;
    use crate::LevelFilter;

    custom_target!("tracectl-test-dependency", LevelFilter::ERROR, &["test"]);

    #[test]
    fn declared_targets_are_registered() {
        let own = TRACING_TARGETS
            .iter()
            .find(|target| target.name == "tracectl")
            .unwrap();
        assert_eq!(own.target, "nsnat_tracectl::control");
        assert_eq!(own.level, LevelFilter::INFO);

        let custom = TRACING_TARGETS
            .iter()
            .find(|target| target.name == "tracectl-test-dependency")
            .unwrap();
        assert_eq!(custom.target, custom.name);
        assert_eq!(custom.tags, &["test"]);
    }
}
