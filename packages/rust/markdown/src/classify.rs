//! Block-level line classification.
//!
//! Patterns are tried in a fixed priority order:
//! header > ordered item > unordered item > blank > plain.

use std::sync::LazyLock;

use regex::Regex;

/// Block-level shape of one dispatched line.
///
/// Text slices borrow from the classified line and are not yet inline-formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `#` to `######` followed by whitespace.
    Header { level: usize, text: &'a str },
    /// `N. text`, where `N` is a run of ASCII digits. Other Unicode decimal
    /// digits (`١.`, `５.`) do not start an item and the line stays plain.
    OrderedItem {
        number: u64,
        text: &'a str,
        indent: usize,
    },
    /// `- text`.
    UnorderedItem { text: &'a str, indent: usize },
    /// Empty or whitespace-only.
    Blank,
    /// Anything else.
    Plain { text: &'a str, indent: usize },
}

/// Classify a single line (without its trailing newline).
///
/// `indent` counts the leading whitespace characters; all prefix checks run on
/// the line with that whitespace stripped.
pub fn classify(line: &str) -> Line<'_> {
    static HEADER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s").expect("valid regex"));
    static ORDERED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([0-9]+)\.\s").expect("valid regex"));

    let stripped = line.trim_start();
    let indent = line[..line.len() - stripped.len()].chars().count();

    if let Some(caps) = HEADER_RE.captures(stripped) {
        let marker = caps.get(0).map_or(0, |m| m.end());
        return Line::Header {
            level: caps[1].len(),
            text: &stripped[marker..],
        };
    }

    if let Some(caps) = ORDERED_RE.captures(stripped) {
        // An absurdly long digit run is not a usable list number.
        if let Ok(number) = caps[1].parse::<u64>() {
            let marker = caps.get(0).map_or(0, |m| m.end());
            return Line::OrderedItem {
                number,
                text: &stripped[marker..],
                indent,
            };
        }
    }

    if let Some(text) = stripped.strip_prefix("- ") {
        return Line::UnorderedItem { text, indent };
    }

    if stripped.is_empty() {
        return Line::Blank;
    }

    Line::Plain {
        text: stripped,
        indent,
    }
}
