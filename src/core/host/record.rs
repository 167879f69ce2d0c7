use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context;
use crate::error::{Error, Result};
use crate::shell;
use crate::ssh::SshArguments;
use crate::template::{self, TemplateVars};

use super::HostRegistry;

pub const LOCALHOST: &str = "localhost";

/// Attribute keys with a meaning of their own.
pub struct HostAttrs;

impl HostAttrs {
    pub const CLUSTER: &'static str = "cluster";
    pub const STAGE: &'static str = "stage";
    pub const ROLES: &'static str = "roles";
    pub const BECOME: &'static str = "become";
    pub const CONNECTION_PROXY: &'static str = "connection-proxy";
    pub const DEPLOY_PATH: &'static str = "deploy_path";
    pub const DESCRIPTION: &'static str = "description";
    pub const SHELL_PATH: &'static str = "shell_path";
    pub const EDGE_ID: &'static str = "edge-id";
}

/// One remote target.
///
/// Connection fields are set with consuming builders before the host is
/// shared. The attribute store sits behind a lock so it can still be
/// changed through an `Arc<Host>`.
#[derive(Debug)]
pub struct Host {
    alias: String,
    hostname: String,
    user: Option<String>,
    port: Option<u16>,
    config_file: Option<String>,
    identity_file: Option<String>,
    forward_agent: bool,
    multiplexing: Option<bool>,
    shell_command: String,
    base_arguments: SshArguments,
    local: bool,
    attributes: RwLock<Map<String, Value>>,
}

impl Clone for Host {
    fn clone(&self) -> Self {
        Self {
            alias: self.alias.clone(),
            hostname: self.hostname.clone(),
            user: self.user.clone(),
            port: self.port,
            config_file: self.config_file.clone(),
            identity_file: self.identity_file.clone(),
            forward_agent: self.forward_agent,
            multiplexing: self.multiplexing,
            shell_command: self.shell_command.clone(),
            base_arguments: self.base_arguments.clone(),
            local: self.local,
            attributes: RwLock::new(self.read_attributes().clone()),
        }
    }
}

/// `web1/blue` connects to `web1`.
fn strip_suffix(alias: &str) -> &str {
    match alias.find('/') {
        Some(idx) if idx + 1 < alias.len() => &alias[..idx],
        _ => alias,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

impl Host {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let hostname = strip_suffix(&alias).to_string();

        Self {
            alias,
            hostname,
            user: None,
            port: None,
            config_file: None,
            identity_file: None,
            forward_agent: true,
            multiplexing: None,
            shell_command: "bash -s".to_string(),
            base_arguments: SshArguments::new(),
            local: false,
            attributes: RwLock::new(Map::new()),
        }
    }

    /// The implicit host used when nothing has been declared.
    pub fn localhost() -> Self {
        Self::new(LOCALHOST).local(true)
    }

    // Builders

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = strip_suffix(&hostname.into()).to_string();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn forward_agent(mut self, enabled: bool) -> Self {
        self.forward_agent = enabled;
        self
    }

    pub fn multiplexing(mut self, enabled: bool) -> Self {
        self.multiplexing = Some(enabled);
        self
    }

    pub fn shell_command(mut self, command: impl Into<String>) -> Self {
        self.shell_command = command.into();
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    /// Replace the base `-o` options.
    pub fn ssh_options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.base_arguments = self.base_arguments.without_options().with_options(options);
        self
    }

    /// Replace the base flags.
    pub fn ssh_flags<I, K>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        self.base_arguments = self.base_arguments.without_flags().with_flags(flags);
        self
    }

    pub fn add_ssh_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_arguments = self.base_arguments.with_option(key, value);
        self
    }

    pub fn add_ssh_flag(mut self, flag: impl Into<String>, value: Option<String>) -> Self {
        self.base_arguments = self.base_arguments.with_flag(flag, value);
        self
    }

    pub fn cluster(self, cluster: impl Into<String>) -> Self {
        self.set(HostAttrs::CLUSTER, cluster.into())
    }

    pub fn stage(self, stage: impl Into<String>) -> Self {
        self.set(HostAttrs::STAGE, stage.into())
    }

    pub fn roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: Vec<Value> = roles.into_iter().map(|r| Value::String(r.into())).collect();
        self.set(HostAttrs::ROLES, Value::Array(roles))
    }

    pub fn become_user(self, user: impl Into<String>) -> Self {
        self.set(HostAttrs::BECOME, user.into())
    }

    pub fn connection_proxy(self, alias: impl Into<String>) -> Self {
        self.set(HostAttrs::CONNECTION_PROXY, alias.into())
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    // Shared attribute store

    fn read_attributes(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.attributes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_attributes(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.attributes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set an attribute through a shared handle.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.write_attributes().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write_attributes().remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.read_attributes()
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Raw attribute value, without interpolation.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_attributes().get(key).cloned()
    }

    /// Attribute as text with `{{key}}` placeholders resolved against this host.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let raw = self.lookup(key)?;
        Some(template::render_with(&raw, |k| self.lookup(k)))
    }

    /// One-level value for template resolution. Built-in connection fields
    /// shadow attributes of the same name.
    pub fn lookup(&self, key: &str) -> Option<String> {
        match key {
            TemplateVars::ALIAS => Some(self.alias.clone()),
            TemplateVars::HOSTNAME => Some(self.hostname.clone()),
            TemplateVars::USER => self.user.clone(),
            TemplateVars::PORT => self.port.map(|p| p.to_string()),
            _ => self.read_attributes().get(key).and_then(value_to_string),
        }
    }

    // Reads

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn real_hostname(&self) -> String {
        template::render_with(&self.hostname, |k| self.lookup(k))
    }

    pub fn get_user(&self) -> Option<String> {
        self.user
            .as_deref()
            .map(|user| template::render_with(user, |k| self.lookup(k)))
    }

    pub fn get_port(&self) -> Option<u16> {
        self.port
    }

    pub fn get_config_file(&self) -> Option<String> {
        self.config_file
            .as_deref()
            .map(|path| template::render_with(path, |k| self.lookup(k)))
    }

    pub fn get_identity_file(&self) -> Option<String> {
        self.identity_file
            .as_deref()
            .map(|path| template::render_with(path, |k| self.lookup(k)))
    }

    pub fn get_forward_agent(&self) -> bool {
        self.forward_agent
    }

    pub fn get_multiplexing(&self) -> Option<bool> {
        self.multiplexing
    }

    pub fn get_shell_command(&self) -> &str {
        &self.shell_command
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn get_cluster(&self) -> Option<String> {
        self.get_string(HostAttrs::CLUSTER).filter(|c| !c.is_empty())
    }

    pub fn get_stage(&self) -> Option<String> {
        self.get_string(HostAttrs::STAGE).filter(|s| !s.is_empty())
    }

    /// Roles from a list attribute or a comma-separated string.
    pub fn get_roles(&self) -> Vec<String> {
        match self.get(HostAttrs::ROLES) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(value_to_string)
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            Some(Value::String(csv)) => csv
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn get_connection_proxy(&self) -> Option<String> {
        self.get_string(HostAttrs::CONNECTION_PROXY)
            .filter(|p| !p.is_empty())
    }

    /// `user@realhost`, or the bare real hostname without a user.
    pub fn connection_string(&self) -> String {
        match self.get_user() {
            Some(user) if !user.is_empty() => format!("{}@{}", user, self.real_hostname()),
            _ => self.real_hostname(),
        }
    }

    /// The `description` template rendered with this host as context, or
    /// the connection string when no description is set.
    pub fn description(self: &Arc<Self>) -> String {
        let Some(description) = self.lookup(HostAttrs::DESCRIPTION) else {
            return self.connection_string();
        };

        let _guard = context::push(Arc::clone(self));
        template::parse(&description)
    }

    /// ssh flags and options for connecting to this host.
    ///
    /// Recomputed from the current fields on every call. A
    /// `connection-proxy` attribute is resolved against `registry` and
    /// rendered as a nested `ProxyCommand`.
    pub fn ssh_arguments(&self, registry: &HostRegistry) -> Result<SshArguments> {
        let mut chain = Vec::new();
        self.build_ssh_arguments(registry, &mut chain)
    }

    fn build_ssh_arguments(
        &self,
        registry: &HostRegistry,
        chain: &mut Vec<String>,
    ) -> Result<SshArguments> {
        let mut args = self.base_arguments.clone();

        if let Some(port) = self.port {
            args = args.with_flag("-p", Some(port.to_string()));
        }

        if let Some(config_file) = self.get_config_file().filter(|f| !f.is_empty()) {
            args = args.with_flag("-F", Some(config_file));
        }

        if let Some(identity_file) = self.get_identity_file().filter(|f| !f.is_empty()) {
            let expanded = shellexpand::tilde(&identity_file).to_string();
            args = args.with_flag("-i", Some(expanded));
        }

        if self.forward_agent {
            args = args.with_flag("-A", None);
        }

        if let Some(proxy_alias) = self.get_connection_proxy() {
            chain.push(self.alias.clone());

            if chain.contains(&proxy_alias) {
                let mut cycle = chain.clone();
                cycle.push(proxy_alias.clone());
                return Err(Error::host_proxy_cycle(&self.alias, proxy_alias, cycle));
            }

            let proxy = registry
                .get(&proxy_alias)
                .ok_or_else(|| Error::host_proxy_not_found(&self.alias, &proxy_alias))?;

            let proxy_args = proxy.build_ssh_arguments(registry, chain)?;

            // ssh expands `%` tokens over the whole ProxyCommand, so the
            // proxy's own tokens are doubled to reach the inner hop intact.
            let mut proxy_command = String::from("ssh -W %h:%p");
            if !proxy_args.is_empty() {
                proxy_command.push(' ');
                proxy_command.push_str(&proxy_args.to_string().replace('%', "%%"));
            }
            proxy_command.push(' ');
            proxy_command.push_str(&shell::quote_arg(&proxy.connection_string()));

            args = args.with_option("ProxyCommand", proxy_command);
        }

        Ok(args)
    }
}
