use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidYaml,
    ConfigInvalidToml,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    HostNotFound,
    HostUnresolvedSelector,
    HostNoneSpecified,
    HostProxyNotFound,
    HostProxyCycle,
    HostInvalidRange,

    SshConnectFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidToml => "config.invalid_toml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::HostNotFound => "host.not_found",
            ErrorCode::HostUnresolvedSelector => "host.unresolved_selector",
            ErrorCode::HostNoneSpecified => "host.none_specified",
            ErrorCode::HostProxyNotFound => "host.proxy_not_found",
            ErrorCode::HostProxyCycle => "host.proxy_cycle",
            ErrorCode::HostInvalidRange => "host.invalid_range",

            ErrorCode::SshConnectFailed => "ssh.connect_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidFileDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorDetails {
    pub selector: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDetails {
    pub host: String,
    pub proxy: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidFileDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in inventory",
            details,
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: serde_yml::Error) -> Self {
        let details = to_details(ConfigInvalidFileDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in inventory",
            details,
        )
    }

    pub fn config_invalid_toml(path: impl Into<String>, err: toml::de::Error) -> Self {
        let details = to_details(ConfigInvalidFileDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidToml,
            "Invalid TOML in inventory",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn host_not_found(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorCode::HostNotFound,
            format!("Host `{}` was not found.", alias),
            serde_json::json!({ "alias": alias }),
        )
        .with_hint("Run 'deckhand hosts' to see declared hosts")
    }

    /// A cluster, stage, role or hostname selector that matched nothing.
    pub fn host_unresolved(selector: &str, token: impl Into<String>) -> Self {
        let token = token.into();
        let message = match selector {
            "cluster" => format!("Hostname or cluster `{}` was not found.", token),
            _ => format!("No hosts match {} `{}`.", selector, token),
        };

        Self::new(
            ErrorCode::HostUnresolvedSelector,
            message,
            to_details(SelectorDetails {
                selector: selector.to_string(),
                token,
            }),
        )
    }

    pub fn host_none_specified() -> Self {
        Self::new(
            ErrorCode::HostNoneSpecified,
            "You need to specify at least one host or cluster.",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Declare hosts in the inventory file")
    }

    pub fn host_proxy_not_found(host: impl Into<String>, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        let message = format!("Cannot find host {} for proxying", proxy);

        Self::new(
            ErrorCode::HostProxyNotFound,
            message,
            to_details(ProxyDetails {
                host: host.into(),
                proxy,
                chain: Vec::new(),
            }),
        )
    }

    pub fn host_proxy_cycle(
        host: impl Into<String>,
        proxy: impl Into<String>,
        chain: Vec<String>,
    ) -> Self {
        let proxy = proxy.into();
        let message = format!(
            "Connection proxy cycle through `{}`: {}",
            proxy,
            chain.join(" -> ")
        );

        Self::new(
            ErrorCode::HostProxyCycle,
            message,
            to_details(ProxyDetails {
                host: host.into(),
                proxy,
                chain,
            }),
        )
    }

    pub fn host_invalid_range(pattern: impl Into<String>, problem: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let problem = problem.into();
        Self::new(
            ErrorCode::HostInvalidRange,
            format!("Invalid host range in `{}`: {}", pattern, problem),
            serde_json::json!({ "pattern": pattern, "problem": problem }),
        )
    }

    pub fn ssh_connect_failed(host: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SshConnectFailed,
            "Failed to start ssh",
            serde_json::json!({ "host": host.into(), "error": error.into() }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_cluster_names_token() {
        let err = Error::host_unresolved("cluster", "prod");
        assert_eq!(err.code, ErrorCode::HostUnresolvedSelector);
        assert_eq!(err.message, "Hostname or cluster `prod` was not found.");
        assert_eq!(err.details["token"], "prod");
        assert_eq!(err.details["selector"], "cluster");
    }

    #[test]
    fn unresolved_role_message() {
        let err = Error::host_unresolved("role", "db, cache");
        assert_eq!(err.message, "No hosts match role `db, cache`.");
    }

    #[test]
    fn proxy_not_found_names_alias() {
        let err = Error::host_proxy_not_found("web1", "bastion");
        assert_eq!(err.code.as_str(), "host.proxy_not_found");
        assert!(err.message.contains("bastion"));
        assert_eq!(err.details["host"], "web1");
        assert!(err.details.get("chain").is_none());
    }

    #[test]
    fn proxy_cycle_lists_chain() {
        let err = Error::host_proxy_cycle(
            "a",
            "a",
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
        );
        assert_eq!(err.message, "Connection proxy cycle through `a`: a -> b -> a");
    }

    #[test]
    fn with_hint_appends() {
        let err = Error::host_not_found("web9");
        assert_eq!(err.hints.len(), 1);
        assert_eq!(err.to_string(), "Host `web9` was not found.");
    }
}
