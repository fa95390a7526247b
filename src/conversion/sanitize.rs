//! Maps arbitrary titles to storage-safe file name stems.

/// Upper bound, in characters, of a sanitized name.
pub const MAX_FILENAME_LEN: usize = 100;

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.')
}

/// Sanitize a title for use as a storage key.
///
/// - keeps alphanumerics (any script), space, `-`, `_` and `.`
/// - drops every other character
/// - trims, then collapses each whitespace run into a single `_`
/// - truncates to [`MAX_FILENAME_LEN`] characters
///
/// Total and idempotent: `sanitize_filename(&sanitize_filename(x)) == sanitize_filename(x)`.
pub fn sanitize_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| is_allowed(*c) || c.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}
