//! Inventory files: the hosts a fleet declares.
//!
//! ```json
//! {
//!   "defaults": { "stage": "prod" },
//!   "hosts": [
//!     { "name": "web[1:3]", "user": "deploy", "cluster": "eu", "roles": ["app"] },
//!     { "name": "bastion", "hostname": "203.0.113.7", "forwardAgent": false }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::host::{range, Host, HostAttrs, HostRegistry, HostSelector};
use crate::io;

pub const DEFAULT_INVENTORY: &str = "deckhand.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFormat {
    Json,
    Yaml,
    Toml,
}

impl InventoryFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => InventoryFormat::Yaml,
            Some("toml") => InventoryFormat::Toml,
            _ => InventoryFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSpec {
    /// Alias, range syntax allowed.
    pub name: String,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    pub config_file: Option<String>,
    pub forward_agent: Option<bool>,
    pub multiplexing: Option<bool>,
    /// Remote program that reads scripts on stdin.
    pub shell: Option<String>,
    #[serde(default)]
    pub local: bool,
    pub cluster: Option<String>,
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(rename = "become")]
    pub become_user: Option<String>,
    pub connection_proxy: Option<String>,
    pub deploy_path: Option<String>,
    pub description: Option<String>,
    pub shell_path: Option<String>,
    pub edge_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ssh_options: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ssh_flags: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub defaults: InventoryDefaults,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
}

impl Inventory {
    pub fn parse(content: &str, format: InventoryFormat, source: &str) -> Result<Self> {
        match format {
            InventoryFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::config_invalid_json(source, e)),
            InventoryFormat::Yaml => {
                serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(source, e))
            }
            InventoryFormat::Toml => {
                toml::from_str(content).map_err(|e| Error::config_invalid_toml(source, e))
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_file(path, &format!("read inventory {}", path.display()))?;
        let inventory = Self::parse(
            &content,
            InventoryFormat::from_path(path),
            &path.display().to_string(),
        )?;

        log_status!(
            "inventory",
            "Loaded {} host entries from {}",
            inventory.hosts.len(),
            path.display()
        );
        Ok(inventory)
    }

    /// Load `path`, or the default inventory when none is given. A missing
    /// default inventory is treated as empty.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_INVENTORY);
                if path.exists() {
                    Self::load(path)
                } else {
                    log_status!("inventory", "No {} found, no hosts declared", DEFAULT_INVENTORY);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Build the registry, expanding ranged names into one host each.
    pub fn registry(&self) -> Result<HostRegistry> {
        let mut registry = HostRegistry::new();

        for (index, spec) in self.hosts.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() {
                return Err(Error::config_invalid_value(
                    format!("hosts[{}].name", index),
                    None,
                    "host name must not be empty",
                ));
            }
            if spec.port == Some(0) {
                return Err(Error::config_invalid_value(
                    format!("hosts[{}].port", index),
                    Some("0".to_string()),
                    "port must be between 1 and 65535",
                ));
            }

            for alias in range::expand(name)? {
                registry.add(spec.to_host(alias));
            }
        }

        Ok(registry)
    }

    pub fn selector(&self) -> Result<HostSelector> {
        Ok(HostSelector::with_defaults(
            self.registry()?,
            self.defaults.cluster.clone(),
            self.defaults.stage.clone(),
        ))
    }
}

impl HostSpec {
    pub fn to_host(&self, alias: String) -> Host {
        let mut host = Host::new(alias);

        if let Some(hostname) = &self.hostname {
            host = host.hostname(hostname);
        }
        if let Some(user) = &self.user {
            host = host.user(user);
        }
        if let Some(port) = self.port {
            host = host.port(port);
        }
        if let Some(path) = &self.identity_file {
            host = host.identity_file(path);
        }
        if let Some(path) = &self.config_file {
            host = host.config_file(path);
        }
        if let Some(enabled) = self.forward_agent {
            host = host.forward_agent(enabled);
        }
        if let Some(enabled) = self.multiplexing {
            host = host.multiplexing(enabled);
        }
        if let Some(shell) = &self.shell {
            host = host.shell_command(shell);
        }
        host = host
            .local(self.local)
            .ssh_flags(self.ssh_flags.clone())
            .ssh_options(self.ssh_options.clone());

        // User vars first so the dedicated keys below take precedence.
        for (key, value) in &self.vars {
            host = host.set(key.clone(), value.clone());
        }

        let attributes = [
            (HostAttrs::CLUSTER, &self.cluster),
            (HostAttrs::STAGE, &self.stage),
            (HostAttrs::BECOME, &self.become_user),
            (HostAttrs::CONNECTION_PROXY, &self.connection_proxy),
            (HostAttrs::DEPLOY_PATH, &self.deploy_path),
            (HostAttrs::DESCRIPTION, &self.description),
            (HostAttrs::SHELL_PATH, &self.shell_path),
            (HostAttrs::EDGE_ID, &self.edge_id),
        ];
        for (key, value) in attributes {
            if let Some(value) = value {
                host = host.set(key, value.clone());
            }
        }

        if !self.roles.is_empty() {
            host = host.roles(self.roles.iter().cloned());
        }

        host
    }
}
