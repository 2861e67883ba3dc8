// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registry of logging targets and runtime control of their levels.
//!
//! Crates declare their target once with [`trace_target!`]; the binary calls [`get_trace_ctl`]
//! to install the subscriber and may then adjust levels per tag.

pub mod control;
pub mod targets;

pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;
