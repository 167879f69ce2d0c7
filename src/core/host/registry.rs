use std::collections::HashMap;
use std::sync::Arc;

use super::Host;

/// Hosts keyed by alias, in declaration order.
///
/// Adding an alias that already exists replaces the host but keeps the
/// position of the first declaration.
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    hosts: Vec<Arc<Host>>,
    index: HashMap<String, usize>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hosts<I: IntoIterator<Item = Host>>(hosts: I) -> Self {
        hosts.into_iter().fold(Self::new(), Self::with)
    }

    pub fn from_shared<I: IntoIterator<Item = Arc<Host>>>(hosts: I) -> Self {
        let mut registry = Self::new();
        for host in hosts {
            registry.add_shared(host);
        }
        registry
    }

    pub fn add(&mut self, host: Host) -> Arc<Host> {
        let host = Arc::new(host);
        self.add_shared(Arc::clone(&host));
        host
    }

    pub fn add_shared(&mut self, host: Arc<Host>) {
        match self.index.get(host.alias()) {
            Some(&position) => self.hosts[position] = host,
            None => {
                self.index.insert(host.alias().to_string(), self.hosts.len());
                self.hosts.push(host);
            }
        }
    }

    pub fn with(mut self, host: Host) -> Self {
        self.add(host);
        self
    }

    pub fn get(&self, alias: &str) -> Option<Arc<Host>> {
        self.index
            .get(alias)
            .map(|&position| Arc::clone(&self.hosts[position]))
    }

    pub fn has(&self, alias: &str) -> bool {
        self.index.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Host>> {
        self.hosts.iter()
    }

    pub fn aliases(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.alias().to_string()).collect()
    }

    /// A new registry holding the hosts that satisfy `predicate`.
    pub fn select<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Host) -> bool,
    {
        Self::from_shared(self.hosts.iter().filter(|h| predicate(h)).cloned())
    }
}

impl<'a> IntoIterator for &'a HostRegistry {
    type Item = &'a Arc<Host>;
    type IntoIter = std::slice::Iter<'a, Arc<Host>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}
