//! Composable shell command construction.
//!
//! A [`CommandNode`] is either a raw fragment of shell syntax, an empty
//! placeholder, or a composite command whose arguments are escaped on
//! render. Combinators join nodes with shell control operators:
//!
//! ```
//! use deckhand::command;
//!
//! let deploy = command::all([
//!     command::arg("cd", ["/var/www/app"]),
//!     deckhand::arg!("git", "pull", "--ff-only").pipe_out_2_err(),
//! ]);
//! assert_eq!(
//!     deploy.to_string(),
//!     "( 'cd' '/var/www/app' && 'git' 'pull' '--ff-only' 2>&1 )"
//! );
//! ```

use std::fmt;

use crate::shell;

/// A node in a shell command tree.
///
/// Raw and nil nodes are told apart by variant, never by their text, so an
/// argument that happens to spell shell syntax is still escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    /// Shell syntax spliced verbatim.
    Raw(String),
    /// Renders as nothing and is skipped inside argument lists.
    Nil,
    /// A command with escaped arguments.
    Composite(Composite),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    pub name: String,
    pub args: Vec<ArgValue>,
    /// Stream redirections such as `2>&1`; each appears at most once.
    pub redirections: Vec<String>,
    /// Control suffixes such as `&`.
    pub controls: Vec<String>,
}

/// One argument of a composite command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    Node(CommandNode),
}

impl ArgValue {
    /// Rendered token and whether it glues to its neighbours.
    /// `None` for nil nodes, which take no part in spacing.
    fn token(&self) -> Option<(String, bool)> {
        match self {
            ArgValue::Str(s) => Some((shell::escape_arg(s), false)),
            ArgValue::Bytes(b) => Some((shell::escape_bytes(b), false)),
            ArgValue::Int(i) => Some((i.to_string(), false)),
            ArgValue::Bool(b) => Some((if *b { "1" } else { "0" }.to_string(), false)),
            ArgValue::Node(CommandNode::Nil) => None,
            ArgValue::Node(CommandNode::Raw(text)) => Some((text.clone(), true)),
            ArgValue::Node(node) => Some((node.to_string(), false)),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<&String> for ArgValue {
    fn from(value: &String) -> Self {
        ArgValue::Str(value.clone())
    }
}

impl From<&[u8]> for ArgValue {
    fn from(value: &[u8]) -> Self {
        ArgValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(value: Vec<u8>) -> Self {
        ArgValue::Bytes(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<u16> for ArgValue {
    fn from(value: u16) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<CommandNode> for ArgValue {
    fn from(value: CommandNode) -> Self {
        ArgValue::Node(value)
    }
}

impl From<&CommandNode> for ArgValue {
    fn from(value: &CommandNode) -> Self {
        ArgValue::Node(value.clone())
    }
}

/// A piece of a raw fragment: literal text or an already-built node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPart {
    Text(String),
    Node(CommandNode),
}

impl From<&str> for RawPart {
    fn from(value: &str) -> Self {
        RawPart::Text(value.to_string())
    }
}

impl From<String> for RawPart {
    fn from(value: String) -> Self {
        RawPart::Text(value)
    }
}

impl From<CommandNode> for RawPart {
    fn from(value: CommandNode) -> Self {
        RawPart::Node(value)
    }
}

impl From<&CommandNode> for RawPart {
    fn from(value: &CommandNode) -> Self {
        RawPart::Node(value.clone())
    }
}

fn concat<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: Into<RawPart>,
{
    let mut text = String::new();
    for part in parts {
        match part.into() {
            RawPart::Text(s) => text.push_str(&s),
            RawPart::Node(node) => text.push_str(&node.to_string()),
        }
    }
    text
}

/// Concatenate text and nodes without escaping or separators.
pub fn raw<I, P>(parts: I) -> CommandNode
where
    I: IntoIterator<Item = P>,
    P: Into<RawPart>,
{
    CommandNode::Raw(concat(parts))
}

/// The empty placeholder.
pub fn nil() -> CommandNode {
    CommandNode::Nil
}

/// Like [`raw`], padded with a space on each side so the fragment stands as
/// its own token between escaped arguments.
pub fn raw_arg<I, P>(parts: I) -> CommandNode
where
    I: IntoIterator<Item = P>,
    P: Into<RawPart>,
{
    CommandNode::Raw(format!(" {} ", concat(parts)))
}

/// A composite command: `name` followed by escaped `args`.
///
/// For mixed argument kinds use [`CommandNode::with`] or the [`arg!`](crate::arg) macro.
pub fn arg<I, V>(name: impl Into<String>, args: I) -> CommandNode
where
    I: IntoIterator<Item = V>,
    V: Into<ArgValue>,
{
    CommandNode::Composite(Composite {
        name: name.into(),
        args: args.into_iter().map(Into::into).collect(),
        redirections: Vec::new(),
        controls: Vec::new(),
    })
}

fn join<I>(operator: &str, nodes: I) -> CommandNode
where
    I: IntoIterator<Item = CommandNode>,
{
    let separator = format!(" {} ", operator);
    let mut parts: Vec<RawPart> = Vec::new();

    for node in nodes.into_iter().filter(|n| !n.is_nil()) {
        parts.push(if parts.is_empty() {
            RawPart::from("( ")
        } else {
            RawPart::from(separator.as_str())
        });
        parts.push(node.into());
    }

    if parts.is_empty() {
        return raw(["true"]);
    }

    parts.push(RawPart::from(" )"));
    raw(parts)
}

/// `( a ; b )`: run every node in sequence.
pub fn batch<I: IntoIterator<Item = CommandNode>>(nodes: I) -> CommandNode {
    join(";", nodes)
}

/// `( a && b )`: stop at the first failure.
pub fn all<I: IntoIterator<Item = CommandNode>>(nodes: I) -> CommandNode {
    join("&&", nodes)
}

/// `( a || b )`: stop at the first success.
pub fn first<I: IntoIterator<Item = CommandNode>>(nodes: I) -> CommandNode {
    join("||", nodes)
}

/// `( a | b )`: connect stdout to stdin.
pub fn pipe<I: IntoIterator<Item = CommandNode>>(nodes: I) -> CommandNode {
    join("|", nodes)
}

/// `$( node )`, or `"$( node )"` when `quote` is set.
pub fn sub_shell(node: CommandNode, quote: bool) -> CommandNode {
    if quote {
        raw([RawPart::from("\"$( "), node.into(), RawPart::from(" )\"")])
    } else {
        raw([RawPart::from("$( "), node.into(), RawPart::from(" )")])
    }
}

/// Shell options toggled by [`setopt`]. `None` leaves an option untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub verbose: Option<bool>,
    pub xtrace: Option<bool>,
    pub pipefail: Option<bool>,
    pub noglob: Option<bool>,
    pub errexit: Option<bool>,
}

/// `set -e +o pipefail ...`, or `true` when nothing is set.
pub fn setopt(options: SetOptions) -> CommandNode {
    let flags = [
        (options.errexit, "-e", "+e"),
        (options.noglob, "-f", "+f"),
        (options.pipefail, "-o pipefail", "+o pipefail"),
        (options.verbose, "-v", "+v"),
        (options.xtrace, "-x", "+x"),
    ];

    let opts: Vec<&str> = flags
        .iter()
        .filter_map(|(value, on, off)| value.map(|v| if v { *on } else { *off }))
        .collect();

    if opts.is_empty() {
        return raw(["true"]);
    }
    raw([format!("set {}", opts.join(" "))])
}

impl CommandNode {
    pub fn is_raw(&self) -> bool {
        matches!(self, CommandNode::Raw(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, CommandNode::Nil)
    }

    /// Append one more argument.
    ///
    /// On a raw fragment the value is added as a further escaped word; on
    /// nil it becomes the whole fragment.
    pub fn with(self, value: impl Into<ArgValue>) -> Self {
        let value = value.into();
        match self {
            CommandNode::Composite(mut composite) => {
                composite.args.push(value);
                CommandNode::Composite(composite)
            }
            CommandNode::Raw(mut text) => {
                if let Some((token, _)) = value.token() {
                    text.push(' ');
                    text.push_str(&token);
                }
                CommandNode::Raw(text)
            }
            CommandNode::Nil => match value.token() {
                Some((token, _)) => CommandNode::Raw(token),
                None => CommandNode::Nil,
            },
        }
    }

    /// Redirect stderr into stdout (`2>&1`).
    pub fn pipe_out_2_err(self) -> Self {
        self.suffixed("2>&1", true)
    }

    /// Run in the background (`&`).
    pub fn bg(self) -> Self {
        self.suffixed("&", false)
    }

    /// Mask a non-zero exit status: `( self || true )`.
    pub fn ignore_error(self) -> Self {
        first([self, raw(["true"])])
    }

    fn suffixed(self, token: &str, redirection: bool) -> Self {
        match self {
            CommandNode::Composite(mut composite) => {
                if redirection {
                    if !composite.redirections.iter().any(|r| r == token) {
                        composite.redirections.push(token.to_string());
                    }
                } else {
                    composite.controls.push(token.to_string());
                }
                CommandNode::Composite(composite)
            }
            CommandNode::Raw(text) => CommandNode::Raw(format!("{} {}", text, token)),
            CommandNode::Nil => CommandNode::Nil,
        }
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = shell::escape_arg(&self.name);
        let mut last_is_raw = false;

        for arg in &self.args {
            let Some((token, is_raw)) = arg.token() else {
                continue;
            };
            if !last_is_raw && !is_raw {
                out.push(' ');
            }
            out.push_str(&token);
            last_is_raw = is_raw;
        }

        for suffix in self.redirections.iter().chain(&self.controls) {
            out.push(' ');
            out.push_str(suffix);
        }

        f.write_str(&out)
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandNode::Raw(text) => f.write_str(text),
            CommandNode::Nil => Ok(()),
            CommandNode::Composite(composite) => composite.fmt(f),
        }
    }
}

/// Build a raw fragment from mixed text and nodes.
///
/// ```
/// let node = deckhand::raw!("cd ", deckhand::arg!("echo", "x"));
/// assert_eq!(node.to_string(), "cd 'echo' 'x'");
/// ```
#[macro_export]
macro_rules! raw {
    ($($part:expr),* $(,)?) => {{
        let parts: ::std::vec::Vec<$crate::command::RawPart> =
            ::std::vec![$($crate::command::RawPart::from($part)),*];
        $crate::command::raw(parts)
    }};
}

/// Build a standalone raw token from mixed text and nodes.
#[macro_export]
macro_rules! raw_arg {
    ($($part:expr),* $(,)?) => {{
        let parts: ::std::vec::Vec<$crate::command::RawPart> =
            ::std::vec![$($crate::command::RawPart::from($part)),*];
        $crate::command::raw_arg(parts)
    }};
}

/// Build a composite command with mixed argument kinds.
///
/// ```
/// let node = deckhand::arg!("head", "-n", 5, deckhand::command::nil());
/// assert_eq!(node.to_string(), "'head' '-n' 5");
/// ```
#[macro_export]
macro_rules! arg {
    ($name:expr $(, $value:expr)* $(,)?) => {
        $crate::command::arg($name, ::std::iter::empty::<$crate::command::ArgValue>())
            $(.with($value))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(s: &str) -> CommandNode {
        arg("echo", [s])
    }

    #[test]
    fn raw_concatenates_without_separators() {
        assert_eq!(raw(["a", "b"]).to_string(), "ab");
        assert_eq!(crate::raw!("a", raw(["b"]), "c").to_string(), "abc");
    }

    #[test]
    fn composite_escapes_name_and_arguments() {
        assert_eq!(echo("hello world").to_string(), "'echo' 'hello world'");
    }

    #[test]
    fn combinators_change_only_the_operator() {
        let x = || raw(["x"]);
        let y = || raw(["y"]);
        assert_eq!(batch([x(), y()]).to_string(), "( x ; y )");
        assert_eq!(all([x(), y()]).to_string(), "( x && y )");
        assert_eq!(first([x(), y()]).to_string(), "( x || y )");
        assert_eq!(pipe([x(), y()]).to_string(), "( x | y )");
    }

    #[test]
    fn combinator_with_single_node() {
        assert_eq!(batch([raw(["x"])]).to_string(), "( x )");
    }

    #[test]
    fn empty_combinator_is_a_no_op() {
        assert_eq!(all(Vec::new()).to_string(), "true");
        assert_eq!(batch([nil(), nil()]).to_string(), "true");
    }

    #[test]
    fn combinators_skip_nil_nodes() {
        assert_eq!(
            batch([raw(["x"]), nil(), raw(["y"])]).to_string(),
            "( x ; y )"
        );
    }

    #[test]
    fn nil_is_invisible_in_argument_lists() {
        let with_nil = crate::arg!("echo", nil(), "a");
        assert_eq!(with_nil.to_string(), echo("a").to_string());
        assert_eq!(crate::arg!("echo", "a", nil()).to_string(), "'echo' 'a'");
    }

    #[test]
    fn nil_renders_empty() {
        assert_eq!(nil().to_string(), "");
    }

    #[test]
    fn raw_children_glue_to_neighbours() {
        let node = crate::arg!("ls", raw(["-la"]), "dir");
        assert_eq!(node.to_string(), "'ls'-la'dir'");
    }

    #[test]
    fn raw_arg_stands_alone() {
        let node = crate::arg!("cat", "in.txt", raw_arg([">"]), "out.txt");
        assert_eq!(node.to_string(), "'cat' 'in.txt' > 'out.txt'");
    }

    #[test]
    fn literal_marker_text_is_still_escaped() {
        let node = crate::arg!("echo", "( ", " )&&( ", "raw");
        assert_eq!(node.to_string(), "'echo' '( ' ' )&&( ' 'raw'");
    }

    #[test]
    fn integers_and_booleans() {
        let node = crate::arg!("seq", 1, -3, true, false);
        assert_eq!(node.to_string(), "'seq' 1 -3 1 0");
    }

    #[test]
    fn nested_composite_renders_as_token() {
        let node = crate::arg!("sudo", echo("hi"));
        assert_eq!(node.to_string(), "'sudo' 'echo' 'hi'");
    }

    #[test]
    fn sub_shell_quoting() {
        assert_eq!(sub_shell(raw(["date"]), false).to_string(), "$( date )");
        assert_eq!(sub_shell(raw(["date"]), true).to_string(), "\"$( date )\"");
    }

    #[test]
    fn setopt_flags_in_fixed_order() {
        let node = setopt(SetOptions {
            errexit: Some(true),
            pipefail: Some(false),
            ..SetOptions::default()
        });
        assert_eq!(node.to_string(), "set -e +o pipefail");

        let all_flags = setopt(SetOptions {
            verbose: Some(true),
            xtrace: Some(false),
            pipefail: Some(true),
            noglob: Some(false),
            errexit: Some(false),
        });
        assert_eq!(all_flags.to_string(), "set +e +f -o pipefail -v +x");
    }

    #[test]
    fn setopt_without_options_is_true() {
        assert_eq!(setopt(SetOptions::default()).to_string(), "true");
    }

    #[test]
    fn ignore_error_equals_first_with_true() {
        let node = echo("x");
        assert_eq!(
            node.clone().ignore_error(),
            first([node, raw(["true"])])
        );
        assert_eq!(echo("x").ignore_error().to_string(), "( 'echo' 'x' || true )");
    }

    #[test]
    fn redirections_then_controls() {
        let node = echo("x").bg().pipe_out_2_err();
        assert_eq!(node.to_string(), "'echo' 'x' 2>&1 &");
    }

    #[test]
    fn redirection_added_once() {
        let node = echo("x").pipe_out_2_err().pipe_out_2_err();
        assert_eq!(node.to_string(), "'echo' 'x' 2>&1");
    }

    #[test]
    fn builders_do_not_touch_the_original() {
        let base = echo("x");
        let backgrounded = base.clone().bg();
        assert_eq!(base.to_string(), "'echo' 'x'");
        assert_eq!(backgrounded.to_string(), "'echo' 'x' &");
    }

    #[test]
    fn suffixes_on_raw_fragments() {
        let node = batch([raw(["a"]), raw(["b"])]).bg();
        assert_eq!(node.to_string(), "( a ; b ) &");
        assert_eq!(nil().bg(), nil());
    }

    #[test]
    fn with_on_raw_adds_escaped_word() {
        let node = raw(["sudo -u"]).with("www data");
        assert_eq!(node.to_string(), "sudo -u 'www data'");
    }

    #[test]
    fn binary_arguments_use_hex_form() {
        let node = crate::arg!("printf", "%s", b"\x00\x01".as_slice());
        assert_eq!(
            node.to_string(),
            "'printf' '%s' \"$( ( 'echo' '0001' | 'xxd' '-r' '-p' ) )\""
        );
    }

    #[test]
    fn nodes_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandNode>();
    }

    #[cfg(unix)]
    #[test]
    fn hostile_arguments_stay_quoted_under_nesting() {
        let hostile = [
            "'; echo pwned; '",
            "\" && echo pwned && \"",
            ") ; echo pwned ; (",
            "$(echo pwned)",
        ];
        let inner = all(
            hostile
                .iter()
                .map(|h| crate::arg!("printf", "%s|", *h))
                .collect::<Vec<_>>(),
        );
        let script = batch([pipe([inner, arg("cat", Vec::<String>::new())])]);

        let output = std::process::Command::new("sh")
            .args(["-c", &script.to_string()])
            .output()
            .expect("sh should run");

        let expected: String = hostile.iter().map(|h| format!("{}|", h)).collect();
        assert_eq!(String::from_utf8_lossy(&output.stdout), expected);
    }
}
