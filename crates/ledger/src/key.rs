//! Key normalization for ledger lookups.

/// Normalizes a series or chapter title into a ledger key.
///
/// Case-folds and keeps alphanumeric characters only, so `"Chapter 1."` and
/// `"chapter-1"` collide. It also means `"Chapter 1.5"` and `"Chapter 15"`
/// collide: the key is lossy and that's accepted.
pub fn normalize(title: impl AsRef<str>) -> String {
    title.as_ref().chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}
