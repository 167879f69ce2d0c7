use crate::error::{Error, Result};
use crate::host::{Host, HostRegistry};
use crate::shell;
use std::process::{Command, ExitStatus, Stdio};

use super::SshArguments;

/// Connection multiplexing socket, one per user/host/port.
const CONTROL_PATH: &str = "~/.ssh/deckhand_%C";
const CONTROL_PERSIST: &str = "60";

pub struct SshClient {
    pub alias: String,
    /// `user@realhost`, or the bare real hostname.
    pub target: String,
    pub arguments: SshArguments,
    /// Remote program that reads a script on stdin.
    pub shell_command: String,
    /// When true, commands run through the local shell instead of ssh.
    pub is_local: bool,
}

impl SshClient {
    pub fn from_host(host: &Host, registry: &HostRegistry) -> Result<Self> {
        let mut arguments = host.ssh_arguments(registry)?;

        if host.get_multiplexing() == Some(true) {
            arguments = arguments.with_options([
                ("ControlMaster", "auto"),
                ("ControlPath", CONTROL_PATH),
                ("ControlPersist", CONTROL_PERSIST),
            ]);
        }

        let is_local = host.is_local() || is_local_host(&host.real_hostname());
        if is_local {
            log_status!("ssh", "Host '{}' is local, skipping ssh", host.alias());
        }

        Ok(Self {
            alias: host.alias().to_string(),
            target: host.connection_string(),
            arguments,
            shell_command: host.get_shell_command().to_string(),
            is_local,
        })
    }

    /// argv for an interactive session that runs `remote_command` on a
    /// forced TTY.
    pub fn command_line(&self, remote_command: &str) -> Vec<String> {
        let mut argv = vec!["ssh".to_string(), "-t".to_string()];
        argv.extend(self.arguments.to_args());
        argv.push(self.target.clone());
        argv.push(remote_command.to_string());
        argv
    }

    /// argv that hands a script on stdin to the host's shell command.
    pub fn script_command_line(&self) -> Vec<String> {
        let mut argv = vec!["ssh".to_string()];
        argv.extend(self.arguments.to_args());
        argv.push(self.target.clone());
        argv.push(self.shell_command.clone());
        argv
    }

    pub fn execute_interactive(&self, remote_command: &str) -> Result<i32> {
        let mut cmd = if self.is_local {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", remote_command]);
            cmd
        } else {
            let argv = self.command_line(remote_command);
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            cmd
        };

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Error::ssh_connect_failed(&self.alias, e.to_string()))?;

        Ok(exit_code(status))
    }
}

/// The child's exit code, or `128 + signal` when it was killed.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Shell text for an argv, for display or copy-paste.
pub fn to_shell_text(argv: &[String]) -> String {
    shell::quote_args(argv)
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: Host) -> SshClient {
        let registry = HostRegistry::new();
        SshClient::from_host(&host, &registry).unwrap()
    }

    #[test]
    fn command_line_places_target_after_arguments() {
        let client = client(Host::new("web1").user("deploy").port(2222));
        assert_eq!(
            client.command_line("exec $SHELL -l"),
            vec!["ssh", "-t", "-p", "2222", "-A", "deploy@web1", "exec $SHELL -l"]
        );
    }

    #[test]
    fn script_command_line_uses_shell_command() {
        let client = client(
            Host::new("web1")
                .forward_agent(false)
                .shell_command("sh -s"),
        );
        assert_eq!(client.script_command_line(), vec!["ssh", "web1", "sh -s"]);
    }

    #[test]
    fn multiplexing_adds_control_options() {
        let muxed = client(Host::new("web1").forward_agent(false).multiplexing(true));
        assert_eq!(muxed.arguments.option("ControlMaster"), Some("auto"));
        assert_eq!(muxed.arguments.option("ControlPath"), Some(CONTROL_PATH));
        assert_eq!(muxed.arguments.option("ControlPersist"), Some("60"));

        let plain = client(Host::new("web2").multiplexing(false));
        assert_eq!(plain.arguments.option("ControlMaster"), None);
    }

    #[test]
    fn shell_text_quotes_remote_command() {
        let client = client(Host::new("web1").forward_agent(false));
        let text = to_shell_text(&client.command_line("cd /srv && exec $SHELL -l"));
        assert_eq!(text, "ssh -t web1 'cd /srv && exec $SHELL -l'");
    }

    #[test]
    fn local_hosts_are_detected() {
        assert!(client(Host::localhost()).is_local);
        assert!(client(Host::new("box").hostname("127.0.0.1")).is_local);
        assert!(!client(Host::new("web1")).is_local);
    }

    #[test]
    fn proxy_errors_propagate() {
        let host = Host::new("web1").connection_proxy("ghost");
        let err = SshClient::from_host(&host, &HostRegistry::new())
            .err()
            .map(|e| e.code);
        assert_eq!(err, Some(crate::error::ErrorCode::HostProxyNotFound));
    }

    #[cfg(unix)]
    #[test]
    fn local_execution_returns_exit_code() {
        let client = client(Host::localhost());
        assert_eq!(client.execute_interactive("exit 3").unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn killed_child_reports_signal_code() {
        let client = client(Host::localhost());
        assert_eq!(client.execute_interactive("kill -TERM $$").unwrap(), 128 + 15);
    }
}
