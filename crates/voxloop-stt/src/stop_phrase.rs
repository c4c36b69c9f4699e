//! Tolerant stop-phrase matching.
//!
//! Matching has to survive real STT output ("stop.", "okey stop") without
//! ever firing on embedded words ("don't stop now"), because a false
//! positive kills playback mid-sentence.

use regex::Regex;
use std::sync::OnceLock;

fn non_alnum() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s]+").unwrap())
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Lowercase, strip punctuation to spaces, collapse whitespace.
pub fn normalize_phrase(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = non_alnum().replace_all(&lowered, " ");
    whitespace()
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// "ok stop"/"okay stop" with a slightly garbled leading token still counts.
fn matches_ok_stop_tolerantly(normalized: &str) -> bool {
    let tokens: Vec<&str> = normalized.split(' ').collect();
    if !(2..=3).contains(&tokens.len()) || *tokens.last().unwrap() != "stop" {
        return false;
    }
    let near_ok = |t: &str| levenshtein(t, "ok") <= 1 || levenshtein(t, "okay") <= 1;
    // The token right before "stop" is the usual case; with three tokens a
    // split "o kay" is also accepted joined.
    if near_ok(tokens[tokens.len() - 2]) {
        return true;
    }
    tokens.len() == 3 && near_ok(&tokens[..2].concat())
}

/// Return the matched phrase (normalized) or `None`.
///
/// Only exact, prefix ("stop please") and suffix ("please stop") matches
/// count; embedded occurrences never do. When the phrase set contains
/// "ok stop"/"okay stop", a near-miss leading token within edit distance 1
/// is tolerated.
pub fn match_stop_phrase<'a, I, S>(text: &str, phrases: I) -> Option<String>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + 'a,
{
    let normalized = normalize_phrase(text);
    if normalized.is_empty() {
        return None;
    }

    // Most specific phrase first, so "okay stop" is reported as itself and
    // not as a suffix match on bare "stop" (the two have different
    // confirmation rules downstream). The tolerant ok-stop check also runs
    // before any single-word phrase for the same reason.
    let mut candidates: Vec<String> = phrases
        .into_iter()
        .map(|p| normalize_phrase(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect();
    candidates.sort_by_key(|p| std::cmp::Reverse(p.len()));

    let has_ok_stop = candidates
        .iter()
        .any(|p| p == "ok stop" || p == "okay stop");

    let matches_exactly = |phrase: &str| {
        normalized == phrase
            || normalized.starts_with(&format!("{phrase} "))
            || normalized.ends_with(&format!(" {phrase}"))
    };

    for phrase in candidates.iter().filter(|p| p.contains(' ')) {
        if matches_exactly(phrase) {
            return Some(phrase.clone());
        }
    }
    if has_ok_stop && matches_ok_stop_tolerantly(&normalized) {
        return Some("ok stop".to_string());
    }
    for phrase in candidates.iter().filter(|p| !p.contains(' ')) {
        if matches_exactly(phrase) {
            return Some(phrase.clone());
        }
    }
    None
}

/// True when `text` matches any configured stop phrase.
pub fn is_stop_phrase<'a, I, S>(text: &str, phrases: I) -> bool
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + 'a,
{
    match_stop_phrase(text, phrases).is_some()
}
