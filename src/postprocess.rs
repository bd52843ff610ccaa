//! Post-processing: deterministic cleanup of OCR-produced Markdown.
//!
//! The OCR service returns per-page Markdown that is usually clean but not
//! uniform: line endings vary with the source document, scanned pages can
//! carry trailing whitespace and invisible Unicode, and the page join can
//! stack blank lines. These rules normalise the output without touching
//! content. Each rule is a pure `&str → String` function and is tested on
//! its own.
//!
//! Dry-run placeholders bypass this module; they are already deterministic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules in order.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Trim trailing whitespace per line
/// 3. Collapse 3+ consecutive blank lines down to one blank line
/// 4. Strip invisible Unicode (zero-width spaces, BOM, word joiners)
/// 5. Ensure the output ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").unwrap_or_else(|e| panic!("invalid blank-run regex: {e}"))
});

fn collapse_blank_lines(input: &str) -> String {
    BLANK_RUNS.replace_all(input, "\n\n").into_owned()
}

const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
