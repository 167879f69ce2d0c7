use serde::Serialize;
use std::fmt;

use crate::shell;

/// Ordered ssh command-line flags followed by `-o key=value` options.
///
/// Flags and options are unique by name: adding one that already exists
/// replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshArguments {
    flags: Vec<(String, Option<String>)>,
    options: Vec<(String, String)>,
}

impl SshArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, flag: impl Into<String>, value: Option<String>) -> Self {
        let flag = flag.into();
        match self.flags.iter_mut().find(|(name, _)| *name == flag) {
            Some(entry) => entry.1 = value,
            None => self.flags.push((flag, value)),
        }
        self
    }

    pub fn with_flags<I, K>(self, flags: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        flags
            .into_iter()
            .fold(self, |args, (flag, value)| args.with_flag(flag, value))
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.options.push((key, value)),
        }
        self
    }

    pub fn with_options<I, K, V>(self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        options
            .into_iter()
            .fold(self, |args, (key, value)| args.with_option(key, value))
    }

    pub fn without_flags(mut self) -> Self {
        self.flags.clear();
        self
    }

    pub fn without_options(mut self) -> Self {
        self.options.clear();
        self
    }

    pub fn flag(&self, flag: &str) -> Option<Option<&str>> {
        self.flags
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| value.as_deref())
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.options.is_empty()
    }

    /// Argument vector for `std::process::Command::args`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for (flag, value) in &self.flags {
            args.push(flag.clone());
            if let Some(value) = value {
                args.push(value.clone());
            }
        }

        for (key, value) in &self.options {
            args.push("-o".to_string());
            args.push(format!("{}={}", key, value));
        }

        args
    }
}

/// Shell text: every value is quoted, so the result can be embedded in a
/// command line (or inside another `ProxyCommand`).
impl fmt::Display for SshArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        for (flag, value) in &self.flags {
            parts.push(shell::quote_arg(flag));
            if let Some(value) = value {
                parts.push(shell::quote_arg(value));
            }
        }

        for (key, value) in &self.options {
            parts.push("-o".to_string());
            parts.push(shell::quote_arg(&format!("{}={}", key, value)));
        }

        f.write_str(&parts.join(" "))
    }
}
