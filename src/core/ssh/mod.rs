mod arguments;
mod client;

pub use arguments::SshArguments;
pub use client::{is_local_host, to_shell_text, SshClient};
