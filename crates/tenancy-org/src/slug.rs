//! Organization slug derivation
//!
//! `slug(name, creator)`: lower-case the name, collapse every run of
//! characters outside `[a-z0-9]` into one `-`, trim `-` from both ends,
//! keep at most 30 characters, then append `-` and the first 8 characters of
//! the creator ID.
//!
//! The result is deterministic. Uniqueness is enforced by the store; a
//! collision is reported as `SlugExists` and never retried with another
//! suffix.

/// Maximum length of the name-derived part of a slug.
pub const SLUG_BASE_MAX_LEN: usize = 30;

/// Number of creator-ID characters appended to a slug.
pub const SLUG_SUFFIX_LEN: usize = 8;

/// Derive an organization slug from its display name and creator ID.
///
/// Creator IDs shorter than 8 characters contribute no suffix.
///
/// # Examples
///
/// ```
/// use tenancy_org::generate_slug;
///
/// assert_eq!(generate_slug("My Team!!", "abcdefgh12"), "my-team-abcdefgh");
/// ```
pub fn generate_slug(name: &str, creator_id: &str) -> String {
    // Simple per-char mapping: 'İ' lowers to a bare 'i', not 'i' plus U+0307.
    let lowered = name
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c));

    let mut base = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in lowered {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            base.push(c);
            in_separator = false;
        } else if !in_separator {
            base.push('-');
            in_separator = true;
        }
    }

    // Only ASCII survives the loop above, so byte and char lengths agree.
    let mut base = base.trim_matches('-').to_string();
    base.truncate(SLUG_BASE_MAX_LEN);

    match creator_id.get(..SLUG_SUFFIX_LEN) {
        Some(suffix) => format!("{base}-{suffix}"),
        None => base,
    }
}
