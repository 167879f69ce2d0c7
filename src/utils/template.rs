//! String template rendering utilities.
//!
//! Templates use `{{key}}` placeholders. Unknown keys are left in place.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::context;

pub struct TemplateVars;

impl TemplateVars {
    pub const ALIAS: &'static str = "alias";
    pub const HOSTNAME: &'static str = "hostname";
    pub const USER: &'static str = "user";
    pub const PORT: &'static str = "port";
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("Invalid placeholder pattern")
    })
}

pub fn render_with<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    placeholder()
        .replace_all(template, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Render against the host on top of the context stack.
/// Without an active context the template is returned unchanged.
pub fn parse(template: &str) -> String {
    match context::current() {
        Some(host) => render_with(template, |key| host.lookup(key)),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use std::sync::Arc;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "user" => Some("deploy".to_string()),
            "hostname" => Some("web1".to_string()),
            _ => None,
        }
    }

    #[test]
    fn render_with_replaces_known_keys() {
        assert_eq!(render_with("{{user}}@{{ hostname }}", lookup), "deploy@web1");
    }

    #[test]
    fn render_with_keeps_unknown_keys() {
        assert_eq!(render_with("{{missing}}/x", lookup), "{{missing}}/x");
        assert_eq!(render_with("{user}", lookup), "{user}");
    }

    #[test]
    fn parse_without_context_is_identity() {
        assert_eq!(parse("{{stage}}"), "{{stage}}");
    }

    #[test]
    fn parse_uses_current_host() {
        let host = Arc::new(Host::new("web1").stage("prod"));
        let _guard = context::push(host);
        assert_eq!(parse("{{alias}} in {{stage}}"), "web1 in prod");
    }
}
