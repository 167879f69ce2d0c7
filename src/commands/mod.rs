use clap::Args;
use deckhand::{HostSelector, Inventory};
use std::path::PathBuf;
use std::sync::Arc;

pub type CmdResult<T> = deckhand::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub inventory: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load_inventory(&self) -> deckhand::Result<Inventory> {
        Inventory::load_or_default(self.inventory.as_deref())
    }
}

/// Host filters shared by commands that act on a set of hosts.
#[derive(Args, Default, Debug)]
pub struct HostFilterArgs {
    /// Only hosts in this cluster (a host alias is accepted too)
    #[arg(long)]
    pub cluster: Option<String>,

    /// Only hosts in this stage
    #[arg(long)]
    pub stage: Option<String>,

    /// Only hosts with one of these roles (comma-separated)
    #[arg(long)]
    pub roles: Option<String>,

    /// Only these aliases (comma-separated, ranges like web[1:3] allowed)
    #[arg(long)]
    pub hosts: Option<String>,
}

impl HostFilterArgs {
    /// Apply the filters that were given, falling back to the inventory
    /// defaults. Without either, every declared host is kept.
    pub fn apply(&self, selector: HostSelector) -> deckhand::Result<Vec<Arc<deckhand::Host>>> {
        let mut selector = selector;

        if let Some(hostnames) = &self.hosts {
            selector = selector.get_by_hostnames(hostnames)?;
        }
        if self.stage.is_some() || selector.default_stage().is_some() {
            selector = selector.get_by_stage(self.stage.as_deref())?;
        }
        if let Some(roles) = &self.roles {
            selector = selector.get_by_roles(roles.as_str())?;
        }

        if self.cluster.is_some() || selector.default_cluster().is_some() {
            return selector.get_hosts(self.cluster.as_deref());
        }
        Ok(selector.hosts())
    }
}

pub mod hosts;
pub mod render;
pub mod ssh;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (deckhand::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Hosts(args) => dispatch!(args, global, hosts),
        crate::Commands::Ssh(args) => dispatch!(args, global, ssh),
        crate::Commands::Render(args) => dispatch!(args, global, render),
    }
}
