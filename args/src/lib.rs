// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use clap::{Args, Subcommand};
use ipnet::IpNet;
use provision::config::{DEFAULT_DOMAIN, DEFAULT_PROJECT};
use provision::{ProvisionConfig, ProvisionConfigBuilder, ProvisionError, RetryPolicy};
use std::time::Duration;
use tracing::debug;
use vrouter::agent::DEFAULT_AGENT_URL;

/// Name of the left interface in the snat form.
pub const SNAT_LEFT_INTERFACE: &str = "snat_itf";
/// Name of the right interface in the snat form.
pub const SNAT_RIGHT_INTERFACE: &str = "gw";
pub const DEFAULT_SNAT_SUBNET: &str = "100.64.0.0/29";

#[derive(Parser, Debug)]
#[command(name = "netns-nat")]
#[command(version)]
#[command(about = "Provision a NAT appliance in a network namespace", long_about = None)]
pub struct CmdArgs {
    #[arg(
        long,
        env = "NSNAT_API_SERVER",
        value_name = "HOST",
        default_value = "127.0.0.1",
        help = "Address of the resource graph API server"
    )]
    api_server: String,

    #[arg(
        long,
        env = "NSNAT_API_PORT",
        value_name = "PORT",
        default_value_t = 8082,
        help = "Port of the resource graph API server"
    )]
    api_port: u16,

    #[arg(
        long,
        value_name = "URL",
        default_value = DEFAULT_AGENT_URL,
        help = "Base URL of the vrouter agent"
    )]
    agent_url: String,

    #[arg(long, default_value = DEFAULT_DOMAIN)]
    domain: String,

    #[arg(long, default_value = DEFAULT_PROJECT)]
    project: String,

    #[arg(
        long,
        value_name = "N",
        default_value_t = RetryPolicy::DEFAULT_RETRIES,
        help = "How often a request failing transiently is repeated"
    )]
    retries: u32,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 10,
        help = "Timeout of each request to the API server or the agent"
    )]
    timeout: u64,

    #[arg(
        long,
        default_value_t = false,
        help = "Show configurable tracing targets and exit"
    )]
    show_tracing_targets: bool,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of tag=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
Passing all=level allows setting the log-level of all targets to level.
E.g. default=error,all=info,graph=debug"
    )]
    tracing: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chain two existing networks through the appliance.
    Chain(ChainArgs),
    /// Source-NAT private networks to a public network (legacy form).
    Snat(SnatArgs),
}

/// Names of the shared service chain resources. Appliances chaining different networks need
/// distinct names.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainNames {
    #[arg(long, value_name = "NAME", help = "Service template [default: netns-nat-template]")]
    pub template: Option<String>,
    #[arg(long, value_name = "NAME", help = "Service instance [default: netns-nat-instance]")]
    pub instance: Option<String>,
    #[arg(long, value_name = "NAME", help = "Network policy [default: netns_nat_policy]")]
    pub policy: Option<String>,
}

impl ChainNames {
    fn apply(&self, builder: &mut ProvisionConfigBuilder) {
        if let Some(template) = &self.template {
            builder.template_name(template.as_str());
        }
        if let Some(instance) = &self.instance {
            builder.instance_name(instance.as_str());
        }
        if let Some(policy) = &self.policy {
            builder.policy_name(policy.as_str());
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ChainArgs {
    /// Daemon name of the appliance; also names its namespace.
    pub appliance: String,
    #[arg(long, value_name = "NETWORK")]
    pub left: String,
    #[arg(long, value_name = "NETWORK")]
    pub right: String,
    /// Additional private network drawn through the appliance (repeatable).
    #[arg(short = 'n', long = "network", value_name = "NETWORK")]
    pub networks: Vec<String>,
    #[command(flatten)]
    pub names: ChainNames,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SnatArgs {
    pub public_network: String,
    /// Daemon name of the appliance; also names its namespace.
    pub appliance: String,
    /// Private network natted to the public network (repeatable).
    #[arg(short = 'n', long = "network", value_name = "NETWORK")]
    pub networks: Vec<String>,
    /// Subnet of the network between the appliance and the private networks, created on demand.
    #[arg(long, value_name = "CIDR", default_value = DEFAULT_SNAT_SUBNET)]
    pub snat_subnet: IpNet,
    #[command(flatten)]
    pub names: ChainNames,
}

impl CmdArgs {
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn api_server(&self) -> &str {
        &self.api_server
    }
    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    pub fn agent_url(&self) -> &str {
        &self.agent_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.retries)
    }

    /// The configuration of the run requested on the command line, for an appliance on `host`.
    ///
    /// # Errors
    ///
    /// Fails if no command was given or if the names given are illegal.
    pub fn to_config(&self, host: &str) -> Result<ProvisionConfig, ProvisionError> {
        let mut builder = ProvisionConfigBuilder::default();
        builder
            .domain(self.domain.as_str())
            .project(self.project.as_str())
            .host(host)
            .retry(self.retry());
        match &self.command {
            None => return Err(ProvisionError::Config("no command given".to_string())),
            Some(Command::Chain(chain)) => {
                builder
                    .appliance(chain.appliance.as_str())
                    .left_network(chain.left.as_str())
                    .right_network(chain.right.as_str())
                    .extra_networks(chain.networks.clone());
                chain.names.apply(&mut builder);
            }
            Some(Command::Snat(snat)) => {
                builder
                    .appliance(snat.appliance.as_str())
                    .left_network(format!("{}-snat-net", snat.appliance))
                    .right_network(snat.public_network.as_str())
                    .left_interface(SNAT_LEFT_INTERFACE)
                    .right_interface(SNAT_RIGHT_INTERFACE)
                    .extra_networks(snat.networks.clone())
                    .provision_left(snat.snat_subnet);
                snat.names.apply(&mut builder);
            }
        }
        let config = builder.build()?;
        debug!("configuration: {config:?}");
        Ok(config)
    }
}
