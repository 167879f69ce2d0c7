use clap::Args;
use deckhand::host::HostAttrs;
use deckhand::Host;
use serde::Serialize;
use std::sync::Arc;

use super::{CmdResult, HostFilterArgs};

#[derive(Args)]
pub struct HostsArgs {
    #[command(flatten)]
    pub filter: HostFilterArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HostRow {
    pub cluster: String,
    pub stage: String,
    pub id: String,
    pub alias: String,
    pub host: String,
    pub roles: String,
}

#[derive(Debug, Serialize)]
pub struct HostsOutput {
    pub hosts: Vec<HostRow>,
    pub count: usize,
}

pub fn run(args: HostsArgs, global: &crate::commands::GlobalArgs) -> CmdResult<HostsOutput> {
    let selector = global.load_inventory()?.selector()?;
    let hosts = args.filter.apply(selector)?;
    let rows = rows(&hosts);

    Ok((
        HostsOutput {
            count: rows.len(),
            hosts: rows,
        },
        0,
    ))
}

/// Remote hosts only, sorted by cluster, then stage, then the full row.
pub fn rows(hosts: &[Arc<Host>]) -> Vec<HostRow> {
    let mut rows: Vec<HostRow> = hosts
        .iter()
        .filter(|host| !host.is_local())
        .map(|host| HostRow {
            cluster: host.get_cluster().unwrap_or_default(),
            stage: host.get_stage().unwrap_or_default(),
            id: host.get_string(HostAttrs::EDGE_ID).unwrap_or_default(),
            alias: host.alias().to_string(),
            host: host.description(),
            roles: host.get_roles().join(", "),
        })
        .collect();

    rows.sort();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_skip_local_hosts_and_sort() {
        let hosts = vec![
            Arc::new(Host::new("web2").cluster("us").stage("prod").user("deploy")),
            Arc::new(Host::localhost()),
            Arc::new(
                Host::new("web1")
                    .cluster("eu")
                    .stage("prod")
                    .roles(["app", "cron"])
                    .set(HostAttrs::EDGE_ID, "e-17"),
            ),
            Arc::new(Host::new("db1").cluster("eu").stage("dev")),
        ];

        let rows = rows(&hosts);
        let aliases: Vec<&str> = rows.iter().map(|r| r.alias.as_str()).collect();
        assert_eq!(aliases, vec!["db1", "web1", "web2"]);

        assert_eq!(rows[1].id, "e-17");
        assert_eq!(rows[1].roles, "app, cron");
        assert_eq!(rows[2].host, "deploy@web2");
    }
}
