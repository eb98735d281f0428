use regex::Regex;
use std::sync::LazyLock;

// Absolute http/https/ftp URLs or bare `www.` hosts. The final character
// class excludes trailing punctuation such as a sentence-ending period.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?-u:\b)(?:(?:https?|ftp)://|www\.)[-a-z0-9+&@#/%?=~_|!:,.;]*[-a-z0-9+&@#/%=~_|]",
    )
    .unwrap()
});

/// Candidate URLs in order of appearance, duplicates kept.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
