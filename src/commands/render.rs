use clap::Args;
use deckhand::command::{self, CommandNode, SetOptions};
use deckhand::host::HostAttrs;
use deckhand::ssh::{self, SshClient};
use deckhand::{Error, Host};
use serde::Serialize;

use super::CmdResult;

#[derive(Args)]
pub struct RenderArgs {
    /// Command name
    pub name: String,

    /// Arguments, escaped one by one
    #[arg(num_args = 0.., allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Run in the background
    #[arg(long)]
    pub bg: bool,

    /// Redirect stderr into stdout
    #[arg(long)]
    pub merge_stderr: bool,

    /// Treat a non-zero exit status as success
    #[arg(long)]
    pub ignore_error: bool,

    /// Prefix with `set -e -o pipefail`
    #[arg(long)]
    pub strict: bool,

    /// Also show the ssh invocation that runs the command on this host
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Feed `command` to this on stdin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<String>,
}

pub fn run(args: RenderArgs, global: &crate::commands::GlobalArgs) -> CmdResult<RenderOutput> {
    let Some(alias) = args.host.clone() else {
        let command = build(&args, None).to_string();
        return Ok((
            RenderOutput {
                command,
                host: None,
                invocation: None,
            },
            0,
        ));
    };

    let registry = global.load_inventory()?.registry()?;
    let host = registry
        .get(&alias)
        .ok_or_else(|| Error::host_not_found(&alias))?;
    let client = SshClient::from_host(&host, &registry)?;

    Ok((
        RenderOutput {
            command: build(&args, Some(&*host)).to_string(),
            host: Some(host.alias().to_string()),
            invocation: Some(ssh::to_shell_text(&client.script_command_line())),
        },
        0,
    ))
}

/// The composite command, run as the host's `become` user when set, with
/// the requested suffixes applied outermost.
pub fn build(args: &RenderArgs, host: Option<&Host>) -> CommandNode {
    let mut node = command::arg(args.name.as_str(), &args.args);

    if let Some(user) = host.and_then(|h| h.get_string(HostAttrs::BECOME)) {
        node = command::arg("sudo", ["-H", "-u"]).with(user).with(node);
    }
    if args.merge_stderr {
        node = node.pipe_out_2_err();
    }
    if args.bg {
        node = node.bg();
    }
    if args.ignore_error {
        node = node.ignore_error();
    }
    if args.strict {
        let options = SetOptions {
            errexit: Some(true),
            pipefail: Some(true),
            ..SetOptions::default()
        };
        node = command::batch([command::setopt(options), node]);
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str, rest: &[&str]) -> RenderArgs {
        RenderArgs {
            name: name.to_string(),
            args: rest.iter().map(|s| s.to_string()).collect(),
            bg: false,
            merge_stderr: false,
            ignore_error: false,
            strict: false,
            host: None,
        }
    }

    #[test]
    fn escapes_every_argument() {
        let node = build(&args("echo", &["it's", "$HOME"]), None);
        assert_eq!(node.to_string(), "'echo' 'it'\\''s' '$HOME'");
    }

    #[test]
    fn suffixes_apply_in_order() {
        let mut a = args("make", &["build"]);
        a.merge_stderr = true;
        a.ignore_error = true;
        assert_eq!(
            build(&a, None).to_string(),
            "( 'make' 'build' 2>&1 || true )"
        );
    }

    #[test]
    fn strict_prefixes_setopt() {
        let mut a = args("true", &[]);
        a.strict = true;
        assert_eq!(build(&a, None).to_string(), "( set -e -o pipefail ; 'true' )");
    }

    #[test]
    fn become_wraps_in_sudo() {
        let host = Host::new("db1").become_user("postgres");
        let mut a = args("psql", &["-c", "select 1"]);
        a.bg = true;
        assert_eq!(
            build(&a, Some(&host)).to_string(),
            "'sudo' '-H' '-u' 'postgres' 'psql' '-c' 'select 1' &"
        );
    }
}
