// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network namespace manipulation

use crate::NamespaceError;
use nix::fcntl::OFlag;
use nix::sched::CloneFlags;
use nix::sys::stat::Mode;
use std::future::Future;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use tracing::{error, trace};

/// Directory holding the bind mounts of named network namespaces.
pub const NETNS_RUN_DIR: &str = "/run/netns";

/// The path of the named network namespace `name`.
#[must_use]
pub fn netns_path(name: &str) -> PathBuf {
    Path::new(NETNS_RUN_DIR).join(name)
}

/// Open the named network namespace.
///
/// # Errors
///
/// Returns [`NamespaceError::NoSuchNamespace`] if the namespace is not mounted under
/// [`NETNS_RUN_DIR`] and [`NamespaceError::Enter`] if it cannot be opened.
pub fn open_netns(name: &str) -> Result<OwnedFd, NamespaceError> {
    let path = netns_path(name);
    if !path.exists() {
        return Err(NamespaceError::NoSuchNamespace(name.to_string()));
    }
    nix::fcntl::open(&path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty()).map_err(|e| {
        NamespaceError::Enter {
            namespace: name.to_string(),
            reason: format!("open error: {e}"),
        }
    })
}

/// Run an (async) function or closure in another network namespace.
///
/// This method will spawn a new thread, move it to the network namespace `name` and create a
/// thread local tokio runtime to execute the provided method.
///
/// # Errors
///
/// Fails if the thread cannot be spawned or moved to the namespace, if the runtime cannot be
/// built, if `exec` panics, or with whatever error `exec` itself returns.
pub fn in_netns<Exec, Fut, Out>(name: &str, exec: Exec) -> Result<Out, NamespaceError>
where
    Exec: (FnOnce() -> Fut) + Send + 'static,
    Fut: Future<Output = Result<Out, NamespaceError>>,
    Out: Send + 'static,
{
    let netns = name.to_string();
    let thread_name = format!("netns-{netns}");
    let handle = std::thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            swap_thread_to_netns(&netns)?;
            trace!("thread moved to netns {netns}");
            let tokio_runtime = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .enable_time()
                .build()
                .map_err(|e| NamespaceError::Worker(format!("failed to build tokio runtime: {e}")))?;
            tokio_runtime.block_on(exec())
        })
        .map_err(|e| NamespaceError::Worker(format!("failed to spawn netns thread: {e}")))?;
    handle
        .join()
        .map_err(|_| NamespaceError::Worker(format!("netns thread for {name} panicked")))?
}

/// Move the current thread to the (extant) network namespace `name`.
///
/// Only call this on a thread which holds no network resources (e.g., open sockets) and which is
/// dedicated to work in the target namespace.
fn swap_thread_to_netns(name: &str) -> Result<(), NamespaceError> {
    let file_descriptor = open_netns(name)?;
    if let Err(e) = nix::sched::setns(&file_descriptor, CloneFlags::CLONE_NEWNET) {
        error!("setns error: {e}");
        return Err(NamespaceError::Enter {
            namespace: name.to_string(),
            reason: format!("setns error: {e}"),
        });
    }
    Ok(())
}
