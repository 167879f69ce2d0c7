//! Hostname range expansion.
//!
//! `web[1:3]` expands to `web1`, `web2`, `web3`. Groups may be numeric
//! (`[01:10]` keeps the start's zero padding, `[5:1]` counts down) or single
//! letters (`[a:c]`). Several groups expand to their Cartesian product with
//! the leftmost group varying slowest.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Most hostnames a single pattern may expand to.
pub const MAX_EXPANSION: u64 = 10_000;

fn group_pattern() -> &'static Regex {
    static GROUP: OnceLock<Regex> = OnceLock::new();
    GROUP.get_or_init(|| Regex::new(r"\[([^\[\]]*)\]").expect("Invalid range pattern"))
}

enum Group {
    Numeric { from: u64, to: u64, width: usize },
    Letter { from: u32, to: u32 },
}

impl Group {
    fn len(&self) -> u64 {
        match *self {
            Group::Numeric { from, to, .. } => from.abs_diff(to).saturating_add(1),
            Group::Letter { from, to } => u64::from(from.abs_diff(to)) + 1,
        }
    }

    fn values(&self) -> Vec<String> {
        match *self {
            Group::Numeric { from, to, width } => step(from, to)
                .map(|n| format!("{:0width$}", n, width = width))
                .collect(),
            Group::Letter { from, to } => step(from, to)
                .filter_map(char::from_u32)
                .map(String::from)
                .collect(),
        }
    }
}

/// Expand every range group in `pattern`. A pattern without groups
/// expands to itself.
///
/// The size of the product is checked against [`MAX_EXPANSION`] before
/// anything is generated.
pub fn expand(pattern: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut total: u64 = 1;
    let mut last = 0;

    for caps in group_pattern().captures_iter(pattern) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let group = parse_group(pattern, body.as_str())?;
        total = total.saturating_mul(group.len());
        if total > MAX_EXPANSION {
            return Err(Error::host_invalid_range(
                pattern,
                format!("expands to more than {} hostnames", MAX_EXPANSION),
            ));
        }

        segments.push((&pattern[last..whole.start()], group));
        last = whole.end();
    }

    let mut results = vec![String::new()];
    for (literal, group) in &segments {
        let values = group.values();
        results = results
            .iter()
            .flat_map(|prefix| {
                values
                    .iter()
                    .map(move |value| format!("{}{}{}", prefix, literal, value))
            })
            .collect();
    }

    let tail = &pattern[last..];
    Ok(results.into_iter().map(|prefix| prefix + tail).collect())
}

/// Expand each pattern in order.
pub fn expand_all<I, S>(patterns: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hostnames = Vec::new();
    for pattern in patterns {
        hostnames.extend(expand(pattern.as_ref())?);
    }
    Ok(hostnames)
}

fn parse_group(pattern: &str, body: &str) -> Result<Group> {
    let Some((start, end)) = body.split_once(':') else {
        return Err(Error::host_invalid_range(
            pattern,
            format!("group `[{}]` must be written as [start:end]", body),
        ));
    };
    let (start, end) = (start.trim(), end.trim());

    if is_number(start) && is_number(end) {
        let parse = |bound: &str| {
            bound.parse::<u64>().map_err(|_| {
                Error::host_invalid_range(pattern, format!("`{}` is out of range", bound))
            })
        };
        let width = if start.len() > 1 && start.starts_with('0') {
            start.len()
        } else {
            0
        };
        return Ok(Group::Numeric {
            from: parse(start)?,
            to: parse(end)?,
            width,
        });
    }

    if let (Some(from), Some(to)) = (single_letter(start), single_letter(end)) {
        if from.is_ascii_lowercase() == to.is_ascii_lowercase() {
            return Ok(Group::Letter {
                from: from as u32,
                to: to as u32,
            });
        }
    }

    Err(Error::host_invalid_range(
        pattern,
        format!(
            "group `[{}]` needs two numbers or two letters of the same case",
            body
        ),
    ))
}

/// Inclusive range counting up or down.
fn step<T>(from: T, to: T) -> Box<dyn Iterator<Item = T>>
where
    T: Copy + PartialOrd + 'static,
    std::ops::RangeInclusive<T>: DoubleEndedIterator<Item = T>,
{
    if from <= to {
        Box::new(from..=to)
    } else {
        Box::new((to..=from).rev())
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn single_letter(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
        _ => None,
    }
}
