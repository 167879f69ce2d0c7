use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    InteractivePassthrough,
}

mod commands;
mod output;
mod tty;

use commands::{hosts, render, ssh};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(version = VERSION)]
#[command(about = "Host selection and safe remote command construction for deployment fleets")]
struct Cli {
    /// Inventory file (JSON, YAML or TOML). Defaults to ./deckhand.json
    #[arg(long, global = true, value_name = "PATH")]
    inventory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared remote hosts
    Hosts(hosts::HostsArgs),
    /// Open a shell (or run a command) on a host over ssh
    Ssh(ssh::SshArgs),
    /// Render a command as escaped shell text
    Render(render::RenderArgs),
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Ssh(args) if ssh::is_interactive(args) => ResponseMode::InteractivePassthrough,
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        inventory: cli.inventory,
    };

    let mode = response_mode(&cli.command);

    if let ResponseMode::InteractivePassthrough = mode {
        if !tty::require_tty_for_interactive() {
            let err = deckhand::Error::validation_invalid_argument(
                "tty",
                "This command requires an interactive TTY",
                None,
                None,
            )
            .with_hint("Use --print to get the ssh invocation instead");
            let _ = output::print_result::<serde_json::Value>(Err(err));
            return std::process::ExitCode::from(exit_code_to_u8(2));
        }
    }

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    match mode {
        ResponseMode::Json => {
            let _ = output::print_json_result(json_result);
        }
        ResponseMode::InteractivePassthrough => {
            if let Err(err) = json_result {
                let _ = output::print_result::<serde_json::Value>(Err(err));
            }
        }
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code == 0 {
        0
    } else if code < 0 {
        1
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::exit_code_to_u8;

    #[test]
    fn exit_codes_clamp_without_turning_failure_into_success() {
        assert_eq!(exit_code_to_u8(0), 0);
        assert_eq!(exit_code_to_u8(4), 4);
        assert_eq!(exit_code_to_u8(143), 143);
        assert_eq!(exit_code_to_u8(-1), 1);
        assert_eq!(exit_code_to_u8(300), 255);
    }
}
