//! Text sanitizers for better speech output.
//!
//! Deliberately minimal: only the Markdown constructs that audibly leak
//! into synthesis ("hash hash title", "asterisk asterisk") are stripped.

use regex::Regex;
use std::sync::OnceLock;

fn bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap())
}

fn italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\n]+?)\*").unwrap())
}

/// Strip a leading ATX header marker (1-5 hashes) from one line. Six or
/// more hashes are left alone, mirroring common Markdown header depth.
fn strip_header(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let hashes = trimmed.bytes().take_while(|&b| b == b'#').count();
    if (1..=5).contains(&hashes) {
        let rest = trimmed[hashes..].trim_start_matches([' ', '\t']);
        if !rest.is_empty() {
            return rest;
        }
    }
    line
}

/// Remove Markdown header and emphasis syntax so it is not spoken.
///
/// Bold runs before italic so `**x**` is never half-matched as italic.
pub fn sanitize_markdown_for_speech(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = text.lines().map(strip_header).collect();
    let mut joined = lines.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }

    let without_bold = bold().replace_all(&joined, "$1");
    italic().replace_all(&without_bold, "$1").into_owned()
}
