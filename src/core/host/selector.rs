use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::{range, Host, HostRegistry};

/// A narrowed view of a [`HostRegistry`].
///
/// Every narrowing step returns a new selector with the same defaults and
/// leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct HostSelector {
    hosts: HostRegistry,
    default_cluster: Option<String>,
    default_stage: Option<String>,
}

/// Role names given as a comma-separated string or a list.
pub enum Roles<'a> {
    Csv(&'a str),
    List(&'a [String]),
}

impl<'a> From<&'a str> for Roles<'a> {
    fn from(csv: &'a str) -> Self {
        Roles::Csv(csv)
    }
}

impl<'a> From<&'a [String]> for Roles<'a> {
    fn from(list: &'a [String]) -> Self {
        Roles::List(list)
    }
}

impl<'a> From<&'a Vec<String>> for Roles<'a> {
    fn from(list: &'a Vec<String>) -> Self {
        Roles::List(list.as_slice())
    }
}

impl Roles<'_> {
    fn to_set(&self) -> HashSet<String> {
        let names: Vec<&str> = match self {
            Roles::Csv(csv) => csv.split(',').collect(),
            Roles::List(list) => list.iter().map(String::as_str).collect(),
        };
        names
            .into_iter()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl HostSelector {
    pub fn new(hosts: HostRegistry) -> Self {
        Self {
            hosts,
            default_cluster: None,
            default_stage: None,
        }
    }

    pub fn with_defaults(
        hosts: HostRegistry,
        cluster: Option<String>,
        stage: Option<String>,
    ) -> Self {
        Self {
            hosts,
            default_cluster: cluster.filter(|c| !c.trim().is_empty()),
            default_stage: stage.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn default_cluster(&self) -> Option<&str> {
        self.default_cluster.as_deref()
    }

    pub fn default_stage(&self) -> Option<&str> {
        self.default_stage.as_deref()
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.hosts
    }

    /// The hosts in the current view, in order.
    pub fn hosts(&self) -> Vec<Arc<Host>> {
        self.hosts.iter().cloned().collect()
    }

    fn narrowed(&self, hosts: HostRegistry) -> Self {
        Self {
            hosts,
            default_cluster: self.default_cluster.clone(),
            default_stage: self.default_stage.clone(),
        }
    }

    /// Hosts in `cluster`, falling back to the default cluster. Without
    /// either, hosts that have no cluster.
    ///
    /// When nothing matches, a host whose alias equals the cluster token is
    /// returned instead. An empty registry yields the implicit local host
    /// as long as no cluster was asked for.
    pub fn get_hosts(&self, cluster: Option<&str>) -> Result<Vec<Arc<Host>>> {
        let cluster = non_empty(cluster).or(self.default_cluster.as_deref());

        let matched: Vec<Arc<Host>> = self
            .hosts
            .iter()
            .filter(|host| host.get_cluster().as_deref() == cluster)
            .cloned()
            .collect();

        if !matched.is_empty() {
            return Ok(matched);
        }

        if let Some(host) = cluster.and_then(|token| self.hosts.get(token)) {
            return Ok(vec![host]);
        }

        if self.hosts.is_empty() {
            return match cluster {
                None => {
                    log_status!("hosts", "No hosts declared, using localhost");
                    Ok(vec![Arc::new(Host::localhost())])
                }
                Some(_) => Err(Error::host_none_specified()),
            };
        }

        Err(Error::host_unresolved("cluster", cluster.unwrap_or_default()))
    }

    /// Narrow to `stage`, falling back to the default stage. Without either,
    /// narrow to hosts that have no stage.
    pub fn get_by_stage(&self, stage: Option<&str>) -> Result<Self> {
        let stage = non_empty(stage).or(self.default_stage.as_deref());

        let matched = self
            .hosts
            .select(|host| host.get_stage().as_deref() == stage);

        if let (Some(token), true) = (stage, matched.is_empty()) {
            if self.hosts.is_empty() {
                return Err(Error::host_none_specified());
            }
            return Err(Error::host_unresolved("stage", token));
        }

        Ok(self.narrowed(matched))
    }

    /// Narrow to the comma-separated aliases in `hostnames`, expanding
    /// ranges such as `web[1:3]`. Order follows the expression.
    pub fn get_by_hostnames(&self, hostnames: &str) -> Result<Self> {
        let tokens: Vec<&str> = hostnames
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let mut selected = HostRegistry::new();
        for alias in range::expand_all(tokens)? {
            let host = self
                .hosts
                .get(&alias)
                .ok_or_else(|| Error::host_not_found(&alias))?;
            selected.add_shared(host);
        }

        Ok(self.narrowed(selected))
    }

    /// Narrow to hosts carrying at least one of `roles`. An empty role list
    /// leaves the view unchanged.
    pub fn get_by_roles<'a>(&self, roles: impl Into<Roles<'a>>) -> Result<Self> {
        let wanted = roles.into().to_set();
        if wanted.is_empty() {
            return Ok(self.clone());
        }

        let matched = self
            .hosts
            .select(|host| host.get_roles().iter().any(|r| wanted.contains(r)));

        if matched.is_empty() {
            let mut names: Vec<&str> = wanted.iter().map(String::as_str).collect();
            names.sort_unstable();
            return Err(Error::host_unresolved("role", names.join(", ")));
        }

        Ok(self.narrowed(matched))
    }
}
