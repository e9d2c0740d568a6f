//! Human-readable diff rendering for a completed or proposed edit (spec §4.9
//! `EditSuccess.diff` — a caller reviewing an applied change shouldn't have
//! to diff the file itself).
//!
//! Grounded on the teacher's `editor::diff_generator::DiffGenerator`: same
//! `diffy`-based unified diff with file headers and hunk line numbers
//! stripped out, since a single-function edit doesn't need them and they
//! only add noise for a caller (or an LLM) reading the result.

use diffy::{DiffOptions, PatchFormatter};

/// Render a unified diff between `before` and `after`, with `---`/`+++`
/// file headers and `@@` hunk headers stripped.
pub fn unified_diff(before: &str, after: &str) -> String {
    let patch = DiffOptions::new().create_patch(before, after);
    let formatter = PatchFormatter::new().missing_newline_message(false);
    let rendered = formatter.fmt_patch(&patch).to_string();

    let mut out = String::new();
    for line in rendered.lines() {
        if line.starts_with("---") || line.starts_with("+++") || line.starts_with("@@") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_produces_an_empty_diff() {
        let text = "fn add(a: i32, b: i32) -> i32 { a + b }";
        assert_eq!(unified_diff(text, text), "");
    }

    #[test]
    fn changed_line_is_rendered_as_removed_then_added() {
        let before = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let after = "fn add(a: i32, b: i32) -> i32 { a - b }";
        let diff = unified_diff(before, after);
        assert!(diff.contains("-fn add(a: i32, b: i32) -> i32 { a + b }"));
        assert!(diff.contains("+fn add(a: i32, b: i32) -> i32 { a - b }"));
        assert!(!diff.contains("---"));
        assert!(!diff.contains("@@"));
    }
}
