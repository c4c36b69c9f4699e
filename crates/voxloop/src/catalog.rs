//! Language catalog: ISO 639-1 codes the runtime accepts.

/// (code, display name) pairs, roughly ordered by synthesis voice
/// availability in common local TTS model zoos.
const LANGUAGES: [(&str, &str); 10] = [
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
];

pub const SAFE_FALLBACK: &str = "en";

pub fn is_supported(code: &str) -> bool {
    LANGUAGES.iter().any(|(c, _)| *c == code)
}

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

pub fn supported_languages() -> Vec<String> {
    LANGUAGES.iter().map(|(c, _)| (*c).to_string()).collect()
}
