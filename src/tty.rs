//! Terminal detection and the interactive host picker.

use std::io::{self, BufRead, IsTerminal, Write};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stdout_tty() -> bool {
    io::stdout().is_terminal()
}

pub fn require_tty_for_interactive() -> bool {
    is_stdin_tty() && is_stdout_tty()
}

/// List `choices` on stderr and read the picked host from stdin.
pub fn select_host(choices: &[String]) -> deckhand::Result<String> {
    let stdin = io::stdin();
    read_choice(stdin.lock(), io::stderr(), choices)
}

fn read_choice<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    choices: &[String],
) -> deckhand::Result<String> {
    let io_error = |e: io::Error| {
        deckhand::Error::internal_io(e.to_string(), Some("host selection prompt".to_string()))
    };

    for choice in choices {
        writeln!(output, "  {}", choice).map_err(io_error)?;
    }
    write!(output, "Select host: ").map_err(io_error)?;
    output.flush().map_err(io_error)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(io_error)?;

    let answer = line.trim();
    if answer.is_empty() {
        return Err(
            deckhand::Error::validation_missing_argument(vec!["hostname".to_string()])
                .with_hint("Answer with [user@]host from the list, or pass an alias"),
        );
    }
    Ok(answer.to_string())
}
