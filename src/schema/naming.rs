//! Column name sanitization and per-request collision handling

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;

static UNSAFE_CHAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Longest identifier Postgres keeps without truncating (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Each character maps to exactly one output character, so the result has the
/// same length (in characters) as the input and is always ASCII.
pub fn sanitize(key: &str) -> Cow<'_, str> {
    UNSAFE_CHAR_REGEX.replace_all(key, "_")
}

/// Hands out unique column names within one schema
#[derive(Debug, Clone, Default)]
pub struct ColumnNamer {
    taken: HashSet<String>,
}

impl ColumnNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as unavailable, e.g. the synthetic primary key column.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(truncate(name, MAX_IDENTIFIER_LEN).to_string());
    }

    /// Claim a unique name for a source key.
    ///
    /// The key is sanitized and clipped to the identifier limit. If that name is
    /// already taken, the first free `_2`, `_3`, ... suffix is appended. The
    /// empty key becomes `column`, since Postgres rejects empty identifiers.
    pub fn assign(&mut self, source_key: &str) -> String {
        let sanitized = sanitize(source_key);
        let base = match truncate(&sanitized, MAX_IDENTIFIER_LEN) {
            "" => "column",
            clipped => clipped,
        };

        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 2usize;
        loop {
            let suffix = format!("_{n}");
            let stem = truncate(base, MAX_IDENTIFIER_LEN - suffix.len());
            let candidate = format!("{stem}{suffix}");
            if self.taken.insert(candidate.clone()) {
                tracing::warn!(
                    key = source_key,
                    column = %candidate,
                    "Column name collision, renamed"
                );
                return candidate;
            }
            n += 1;
        }
    }
}

/// Sanitized names are ASCII, so byte slicing is safe. The guard keeps this
/// correct for reserved names that were never sanitized.
fn truncate(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize("first name"), "first_name");
        assert_eq!(sanitize("price($)"), "price___");
        assert_eq!(sanitize("already_safe_123"), "already_safe_123");
        assert_eq!(sanitize("café"), "caf_");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_assign_without_collision() {
        let mut namer = ColumnNamer::new();
        assert_eq!(namer.assign("user id"), "user_id");
        assert_eq!(namer.assign("email"), "email");
    }

    #[test]
    fn test_assign_suffixes_collisions() {
        let mut namer = ColumnNamer::new();
        assert_eq!(namer.assign("a-b"), "a_b");
        assert_eq!(namer.assign("a b"), "a_b_2");
        assert_eq!(namer.assign("a.b"), "a_b_3");
    }

    #[test]
    fn test_suffix_skips_literal_names() {
        let mut namer = ColumnNamer::new();
        assert_eq!(namer.assign("a_b_2"), "a_b_2");
        assert_eq!(namer.assign("a_b"), "a_b");
        assert_eq!(namer.assign("a b"), "a_b_3");
    }

    #[test]
    fn test_reserved_names_are_avoided() {
        let mut namer = ColumnNamer::new();
        namer.reserve("_generated_id");
        assert_eq!(namer.assign("_generated_id"), "_generated_id_2");
    }

    #[test]
    fn test_empty_key_gets_placeholder() {
        let mut namer = ColumnNamer::new();
        assert_eq!(namer.assign(""), "column");
        assert_eq!(namer.assign("column"), "column_2");
    }

    #[test]
    fn test_long_names_are_clipped() {
        let mut namer = ColumnNamer::new();
        let long = "x".repeat(80);

        let first = namer.assign(&long);
        let second = namer.assign(&format!("{long}!"));

        assert_eq!(first.len(), MAX_IDENTIFIER_LEN);
        assert_eq!(second.len(), MAX_IDENTIFIER_LEN);
        assert!(second.ends_with("_2"));
        assert_ne!(first, second);
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_total_and_length_preserving(key in any::<String>()) {
            let out = sanitize(&key);
            prop_assert_eq!(out.chars().count(), key.chars().count());
            prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert_eq!(sanitize(&key), out.clone());
        }

        #[test]
        fn prop_assigned_names_are_unique(keys in proptest::collection::vec("[a-c .-]{0,4}", 0..20)) {
            let mut namer = ColumnNamer::new();
            let mut seen = HashSet::new();
            for key in &keys {
                prop_assert!(seen.insert(namer.assign(key)));
            }
        }
    }
}
