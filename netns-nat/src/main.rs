// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

use args::{CmdArgs, Parser};
use graph::RestGraph;
use interface_manager::Netlink;
use provision::{Orchestrator, ProvisionConfig, ProvisionError, ProvisionReport};
use std::process::ExitCode;
use tracectl::{custom_target, get_trace_ctl, trace_target};
use tracing::{error, info, level_filters::LevelFilter, warn};
use vrouter::AgentClient;

trace_target!("netns-nat", LevelFilter::INFO, &[]);
fn init_logging() {
    let tctl = get_trace_ctl();
    tctl.set_default_level(LevelFilter::INFO);
    custom_target!("reqwest", LevelFilter::WARN, &[]);
    custom_target!("hyper_util", LevelFilter::ERROR, &[]);
    custom_target!("netlink_proto", LevelFilter::ERROR, &[]);
}

/// The name of this host, which prefixes the name of the appliance.
fn hostname() -> String {
    match nix::unistd::gethostname().map(std::ffi::OsString::into_string) {
        Ok(Ok(name)) => name,
        _ => {
            let name = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
            warn!("Cannot read the hostname, using '{name}'");
            name
        }
    }
}

async fn provision(
    args: &CmdArgs,
    config: &ProvisionConfig,
) -> Result<ProvisionReport, ProvisionError> {
    let graph = RestGraph::new(args.api_server(), args.api_port(), args.timeout())?;
    let agent = AgentClient::new(args.agent_url(), args.timeout())?;
    let netlink = Netlink::new()?;
    info!(
        "Provisioning {} against {} (agent {})",
        config.appliance,
        graph.base_url(),
        args.agent_url()
    );
    Orchestrator::new(config, &graph, &netlink, &agent)
        .run()
        .await
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();

    /* initialize logging */
    init_logging();
    if let Some(tracing) = args.tracing()
        && let Err(e) = get_trace_ctl().setup_from_string(tracing)
    {
        eprintln!("Invalid tracing configuration: {e}");
        return ExitCode::FAILURE;
    }
    if args.show_tracing_targets() {
        get_trace_ctl().dump();
        return ExitCode::SUCCESS;
    }

    let config = match args.to_config(&hostname()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("netns-nat: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("netns-nat: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(provision(&args, &config)) {
        Ok(report) => {
            info!(
                "Appliance {} ready (service instance {})",
                report.appliance, report.instance
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Provisioning of {} failed: {e}", config.appliance);
            eprintln!("netns-nat: {e}");
            ExitCode::FAILURE
        }
    }
}
