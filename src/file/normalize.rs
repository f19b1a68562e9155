//! Filesystem-safe name normalization.

/// Characters removed outright from user-supplied names.
const ILLEGAL_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Sanitize a user-supplied name into a filesystem-safe identifier.
///
/// Illegal characters are dropped (not replaced) and every space becomes
/// a hyphen. The result may be empty; callers decide whether that is
/// acceptable.
///
/// ```
/// use filekeep::file::normalize;
///
/// assert_eq!(normalize("my file"), "my-file");
/// assert_eq!(normalize("a/b?c"), "abc");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}
