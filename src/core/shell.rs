//! Shell escaping and quoting.
//!
//! Every escaper here returns text that can be spliced into a larger POSIX
//! command line without further quoting.

use crate::command::{self, CommandNode};

/// Remote utility that turns a hex dump back into bytes.
pub const HEX_DECODER: [&str; 3] = ["xxd", "-r", "-p"];

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// True when every byte is printable ASCII (0x20..0x7F).
pub fn is_plain(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| (0x20..0x7f).contains(b))
}

/// Escape an arbitrary byte string as a single shell word.
///
/// Plain input is single-quoted. Anything else (control bytes, NUL, bytes
/// >= 0x80) is hex encoded and decoded on the remote side:
///
/// ```text
/// "$( ( 'echo' '0a41' | 'xxd' '-r' '-p' ) )"
/// ```
pub fn escape_bytes(bytes: &[u8]) -> String {
    if is_plain(bytes) {
        // ASCII is always valid UTF-8.
        let text = String::from_utf8_lossy(bytes);
        return format!("'{}'", escape_single_quote_content(&text));
    }

    binary_literal(bytes).to_string()
}

/// Escape a string argument. See [`escape_bytes`].
pub fn escape_arg(arg: &str) -> String {
    escape_bytes(arg.as_bytes())
}

fn binary_literal(bytes: &[u8]) -> CommandNode {
    let echo = command::arg("echo", [to_hex(bytes)]);
    let decode = command::arg(HEX_DECODER[0], HEX_DECODER[1..].iter().copied());

    command::sub_shell(command::pipe([echo, decode]), true)
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(DIGITS[usize::from(byte >> 4)] as char);
        out.push(DIGITS[usize::from(byte & 0x0f)] as char);
    }
    out
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Plain words without shell metacharacters are left bare
/// - Everything else goes through [`escape_arg`]
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if is_plain(arg.as_bytes()) && !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    escape_arg(arg)
}

/// Quote and join multiple arguments for shell execution.
pub fn quote_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_arg_wraps_plain_text() {
        assert_eq!(escape_arg("version"), "'version'");
        assert_eq!(escape_arg("hello world"), "'hello world'");
        assert_eq!(escape_arg(""), "''");
    }

    #[test]
    fn escape_arg_with_single_quote() {
        assert_eq!(escape_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn escape_arg_leaves_metacharacters_inert() {
        assert_eq!(escape_arg("$(rm -rf /); `x`"), "'$(rm -rf /); `x`'");
    }

    #[test]
    fn escape_bytes_exact_rendering() {
        assert_eq!(
            escape_bytes(b"a\nb"),
            "\"$( ( 'echo' '610a62' | 'xxd' '-r' '-p' ) )\""
        );
    }

    #[test]
    fn escape_bytes_keeps_nul_and_trailing_bytes() {
        let rendered = escape_bytes(b"x\0y\xff");
        assert_eq!(
            rendered,
            "\"$( ( 'echo' '780079ff' | 'xxd' '-r' '-p' ) )\""
        );
    }

    #[test]
    fn escape_bytes_high_bytes_are_binary() {
        assert!(!is_plain("café".as_bytes()));
        assert!(escape_arg("café").contains("'636166c3a9'"));
    }

    #[test]
    fn delete_byte_is_binary() {
        assert!(!is_plain(b"\x7f"));
        assert!(is_plain(b" ~"));
    }

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("22"), "22");
        assert_eq!(quote_arg("deploy@web1"), "deploy@web1");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_arg_with_control_bytes_uses_binary_form() {
        assert!(quote_arg("a\tb").starts_with("\"$("));
    }

    #[test]
    fn quote_args_mixed() {
        let args = vec!["ls".to_string(), "my dir".to_string()];
        assert_eq!(quote_args(&args), "ls 'my dir'");
    }

    #[cfg(unix)]
    #[test]
    fn plain_arguments_survive_shell_parsing() {
        let samples = [
            "plain",
            "with space",
            "it's",
            "'''",
            "\"double\" $HOME `id` \\ ; | & > < * ? [a] {b} ~ # !",
            "  leading and trailing  ",
            "",
        ];

        for sample in samples {
            let script = format!("printf '%s' {}", escape_arg(sample));
            let output = std::process::Command::new("sh")
                .args(["-c", &script])
                .output()
                .expect("sh should run");
            assert_eq!(String::from_utf8_lossy(&output.stdout), sample);
        }
    }

    #[cfg(unix)]
    fn shell_output(script: &str) -> Vec<u8> {
        std::process::Command::new("sh")
            .args(["-c", script])
            .output()
            .expect("sh should run")
            .stdout
    }

    #[cfg(unix)]
    #[test]
    fn binary_arguments_survive_hex_decoding() {
        let has_xxd = std::process::Command::new("sh")
            .args(["-c", "command -v xxd"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !has_xxd {
            eprintln!("xxd not installed, skipping");
            return;
        }

        let samples: [&[u8]; 5] = [
            b"\x01",
            b"\xff\xfe",
            b"a\tb",
            "café ∑".as_bytes(),
            b"two\nlines",
        ];
        for sample in samples {
            let rendered = escape_bytes(sample);
            assert!(rendered.starts_with("\"$("), "{:?}", sample);
            let output = shell_output(&format!("printf '%s' {}", rendered));
            assert_eq!(output, sample);
        }

        // Command substitution drops trailing newlines.
        let output = shell_output(&format!("printf '%s' {}", escape_bytes(b"line\n\n")));
        assert_eq!(output, b"line");
    }
}
