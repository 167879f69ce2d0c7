use clap::Args;
use deckhand::command::{self, CommandNode};
use deckhand::host::HostAttrs;
use deckhand::ssh::{self, SshClient};
use deckhand::{log_status, shell, Error, Host, HostRegistry};
use serde::Serialize;
use std::sync::Arc;

use super::CmdResult;

#[derive(Args)]
pub struct SshArgs {
    /// Host alias (omit to pick from the declared hosts)
    pub hostname: Option<String>,

    /// Print the ssh invocation instead of running it
    #[arg(long)]
    pub print: bool,

    /// Command to run instead of a login shell.
    ///
    /// Examples:
    ///   deckhand ssh web1 -- ls -la
    ///   deckhand ssh web1 -- tail -n 50 storage/logs/app.log
    ///
    /// Every word is escaped, so shell operators are passed literally.
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SshOutput {
    pub host: String,
    pub target: String,
    pub remote_command: String,
    pub invocation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

pub fn is_interactive(args: &SshArgs) -> bool {
    !args.print
}

pub fn run(args: SshArgs, global: &crate::commands::GlobalArgs) -> CmdResult<SshOutput> {
    let registry = global.load_inventory()?.registry()?;
    let host = resolve_host(&registry, args.hostname.as_deref())?;

    let remote_command = remote_command(&host, &args.command).to_string();
    let client = SshClient::from_host(&host, &registry)?;
    let invocation = ssh::to_shell_text(&client.command_line(&remote_command));

    let exit_code = if args.print {
        None
    } else {
        log_status!("ssh", "Connecting to {}", host.description());
        Some(client.execute_interactive(&remote_command)?)
    };

    Ok((
        SshOutput {
            host: host.alias().to_string(),
            target: client.target.clone(),
            remote_command,
            invocation,
            exit_code,
        },
        exit_code.unwrap_or(0),
    ))
}

/// `cd <deploy_path>` when set, then the given command, or a login shell.
pub fn remote_command(host: &Host, words: &[String]) -> CommandNode {
    let work = match words.split_first() {
        Some((name, args)) => command::arg(name.as_str(), args),
        None => match host.get_string(HostAttrs::SHELL_PATH) {
            Some(path) if !path.is_empty() => {
                command::raw([format!("exec {} -l", shell::quote_arg(&path))])
            }
            _ => command::raw(["exec $SHELL -l"]),
        },
    };

    match host.get_string(HostAttrs::DEPLOY_PATH) {
        Some(path) if !path.is_empty() => command::all([command::arg("cd", [path]), work]),
        _ => work,
    }
}

/// Explicit alias, else the only remote host, else ask.
fn resolve_host(registry: &HostRegistry, hostname: Option<&str>) -> deckhand::Result<Arc<Host>> {
    if let Some(alias) = hostname {
        return registry
            .get(alias)
            .ok_or_else(|| Error::host_not_found(alias));
    }

    let remote = registry.select(|host| !host.is_local());
    match remote.len() {
        0 => Err(Error::host_none_specified()),
        1 => remote
            .iter()
            .next()
            .cloned()
            .ok_or_else(|| Error::internal_unexpected("remote host vanished")),
        _ => prompt_for_host(&remote),
    }
}

fn prompt_for_host(remote: &HostRegistry) -> deckhand::Result<Arc<Host>> {
    if !crate::tty::require_tty_for_interactive() {
        return Err(Error::validation_missing_argument(vec![
            "hostname".to_string()
        ])
        .with_hint("Pass a host alias when not running in a terminal"));
    }

    let choices: Vec<String> = remote.iter().map(|host| host.description()).collect();
    let answer = crate::tty::select_host(&choices)?;
    find_by_target(remote, &answer).ok_or_else(|| Error::host_not_found(answer))
}

/// Match `[user@]realhost` against the declared hosts.
pub fn find_by_target(registry: &HostRegistry, answer: &str) -> Option<Arc<Host>> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }

    let (user, hostname) = match answer.split_once('@') {
        Some((user, hostname)) => (Some(user), hostname),
        None => (None, answer),
    };

    registry
        .iter()
        .find(|host| {
            host.real_hostname() == hostname
                && user.map_or(true, |u| host.get_user().as_deref() == Some(u))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn login_shell_by_default() {
        let host = Host::new("web1");
        assert_eq!(remote_command(&host, &[]).to_string(), "exec $SHELL -l");
    }

    #[test]
    fn shell_path_overrides_login_shell() {
        let host = Host::new("web1").set(HostAttrs::SHELL_PATH, "/bin/zsh");
        assert_eq!(remote_command(&host, &[]).to_string(), "exec /bin/zsh -l");
    }

    #[test]
    fn deploy_path_is_entered_first() {
        let host = Host::new("web1").set(HostAttrs::DEPLOY_PATH, "/srv/shop");
        assert_eq!(
            remote_command(&host, &words(&["ls", "-la"])).to_string(),
            "( 'cd' '/srv/shop' && 'ls' '-la' )"
        );
    }

    #[test]
    fn command_words_are_escaped() {
        let host = Host::new("web1");
        assert_eq!(
            remote_command(&host, &words(&["echo", "a; rm -rf /"])).to_string(),
            "'echo' 'a; rm -rf /'"
        );
    }

    #[test]
    fn resolves_explicit_alias() {
        let registry = HostRegistry::from_hosts([Host::new("web1"), Host::new("web2")]);
        assert_eq!(resolve_host(&registry, Some("web2")).unwrap().alias(), "web2");
        let err = resolve_host(&registry, Some("web3")).unwrap_err();
        assert_eq!(err.code, deckhand::ErrorCode::HostNotFound);
    }

    #[test]
    fn single_remote_host_needs_no_prompt() {
        let registry = HostRegistry::from_hosts([Host::localhost(), Host::new("web1")]);
        assert_eq!(resolve_host(&registry, None).unwrap().alias(), "web1");
    }

    #[test]
    fn no_remote_hosts() {
        let registry = HostRegistry::from_hosts([Host::localhost()]);
        let err = resolve_host(&registry, None).unwrap_err();
        assert_eq!(err.code, deckhand::ErrorCode::HostNoneSpecified);
    }

    #[test]
    fn answers_match_user_and_real_hostname() {
        let registry = HostRegistry::from_hosts([
            Host::new("a").hostname("10.0.0.1").user("root"),
            Host::new("b").hostname("10.0.0.1").user("deploy"),
        ]);

        assert_eq!(find_by_target(&registry, "10.0.0.1").unwrap().alias(), "a");
        assert_eq!(
            find_by_target(&registry, "deploy@10.0.0.1").unwrap().alias(),
            "b"
        );
        assert!(find_by_target(&registry, "nobody@10.0.0.1").is_none());
        assert!(find_by_target(&registry, "").is_none());
    }
}
