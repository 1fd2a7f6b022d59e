//! Inline emphasis substitution.
//!
//! Runs on one already-joined line at a time. Bold is rewritten before italic
//! so a `**x**` pair is never half-consumed by the single-star pattern.

use std::sync::LazyLock;

use regex::Regex;

/// Rewrite `**X**` to `<strong>X</strong>`, then `*X*` to `<em>X</em>`.
///
/// Matches are lazy and non-overlapping. Unpaired markers stay literal.
pub(crate) fn format_inline(text: &str) -> String {
    static BOLD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
    static ITALIC_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));

    if !text.contains('*') {
        return text.to_string();
    }

    let bold = BOLD_RE.replace_all(text, "<strong>${1}</strong>");
    ITALIC_RE.replace_all(&bold, "<em>${1}</em>").into_owned()
}
