//! Slug derivation and collision suffixing shared by both storage backends.

use chrono::Utc;
use regex::Regex;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    static ref STRIP_REGEX: Regex = Regex::new(r"[^a-z0-9\s]").unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Lowercases, drops everything but ASCII letters/digits/whitespace, and joins words with `-`.
///
/// `"Hello, World!"` becomes `"hello-world"`. May return an empty string.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = STRIP_REGEX.replace_all(&lowered, "");
    WHITESPACE_REGEX
        .replace_all(stripped.trim(), "-")
        .into_owned()
}

/// Base slug for a new row: the requested one, else derived from `source`,
/// else `<fallback>-<millis>` when derivation leaves nothing.
pub fn base_slug(requested: Option<&str>, source: &str, fallback: &str) -> String {
    if let Some(slug) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        return slug.to_string();
    }
    let derived = slugify(source);
    if derived.is_empty() {
        format!("{}-{}", fallback, Utc::now().timestamp_millis())
    } else {
        derived
    }
}

/// Appends the current unix-millis timestamp to force uniqueness.
pub fn with_timestamp_suffix(base: &str) -> String {
    format!("{}-{}", base, Utc::now().timestamp_millis())
}

/// Returns `base` if free, otherwise the first free timestamp-suffixed variant.
///
/// A numeric counter is appended after the timestamp only when two rows with
/// the same base land in the same millisecond.
pub fn unique_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let suffixed = with_timestamp_suffix(base);
    if !is_taken(&suffixed) {
        return suffixed;
    }
    (2..)
        .map(|n| format!("{}-{}", suffixed, n))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(suffixed)
}
