//! Terminal output sanitization
//!
//! Child processes tend to emit ANSI color codes, progress bars driven by
//! carriage returns, and the odd bell. The caller wants the text a human
//! would see, so this strips escape sequences, collapses `\r` overwrites to
//! the final visible state, and drops remaining control bytes while keeping
//! newlines and tabs. Pure and idempotent.

use std::sync::OnceLock;

use regex::Regex;

fn ansi_re() -> &'static Regex {
    static ANSI_RE: OnceLock<Regex> = OnceLock::new();
    ANSI_RE.get_or_init(|| {
        // ESC followed by a single final byte, or a CSI sequence.
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static regex")
    })
}

/// Strip ANSI escape sequences and non-printable control bytes
///
/// Newline and tab survive; within each line only the text after the last
/// carriage return survives, matching what a terminal would display.
/// Sanitizing already-clean text returns it unchanged.
pub fn sanitize_output(text: &str) -> String {
    let stripped = ansi_re().replace_all(text, "");

    let mut out = String::with_capacity(stripped.len());
    for (i, line) in stripped.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let visible = line.rsplit('\r').next().unwrap_or(line);
        out.extend(visible.chars().filter(|c| !c.is_control() || *c == '\t'));
    }
    out
}
