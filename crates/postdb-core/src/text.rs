// crates/postdb-core/src/text.rs

/// Convert a string into a folded key suitable for comparison.
///
/// Transliterates Unicode to ASCII with `deunicode` (`Łódź` -> `Lodz`) and
/// lowercases the result.
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Derive the URL-safe slug for a display name.
///
/// The name is folded with [`fold_key`], every run of non-alphanumeric
/// characters becomes a single `-`, and leading/trailing hyphens are dropped.
/// Applying `slugify` to its own output is a no-op.
///
/// # Examples
/// ```rust
/// use postdb_core::text::slugify;
///
/// assert_eq!(slugify("United Kingdom"), "united-kingdom");
/// assert_eq!(slugify("  Brighton & Hove "), "brighton-hove");
/// assert_eq!(slugify("Ynys Môn"), "ynys-mon");
/// ```
pub fn slugify(name: &str) -> String {
    let folded = fold_key(name);
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;

    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Canonical form of an outcode/incode: trimmed, ASCII-lowercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slug_collapses_punctuation_and_whitespace() {
        assert_eq!(slugify("Greater London"), "greater-london");
        assert_eq!(slugify("St. Helens -- North"), "st-helens-north");
        assert_eq!(slugify("King's Lynn"), "king-s-lynn");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slug_folds_accents() {
        assert_eq!(slugify("Zürich"), "zurich");
        assert_eq!(slugify("Łódź"), "lodz");
    }

    #[test]
    fn codes_are_lowercased_and_trimmed() {
        assert_eq!(normalize_code(" SW1A "), "sw1a");
        assert_eq!(normalize_code("1aa"), "1aa");
    }

    proptest! {
        #[test]
        fn slugify_is_idempotent(name in "\\PC{0,40}") {
            let once = slugify(&name);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn slug_alphabet_is_url_safe(name in "[a-zA-Z0-9 ,.'&-]{0,40}") {
            let slug = slugify(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
