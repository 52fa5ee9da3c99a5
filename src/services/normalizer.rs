//! Canonical matching keys for user-typed game names.
//!
//! Keys are lower-case ASCII alphanumerics with diacritics folded away and
//! runs of a repeated character collapsed, so "Pokémon", "POKEMON" and
//! "poookemon" all land on `pokemon`. The collapse is lossy on purpose:
//! "Book" and "Bok" share a key.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Map a raw display name to its matching key. Returns an empty string when
/// nothing alphanumeric survives; callers must reject that.
pub fn normalize(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut previous = None;

    for ch in raw
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
    {
        if previous == Some(ch) {
            continue;
        }
        previous = Some(ch);
        key.push(ch);
    }

    key
}

/// Prefix compatibility: one key is a prefix of the other. Not transitive.
pub fn keys_are_prefix_compatible(left: &str, right: &str) -> bool {
    !left.is_empty() && !right.is_empty() && (left.starts_with(right) || right.starts_with(left))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_variants_share_a_key() {
        assert_eq!(normalize("Counter-Strike"), "counterstrike");
        assert_eq!(normalize("counterstrike"), "counterstrike");
        assert_eq!(normalize("Counter Strike"), "counterstrike");
    }

    #[test]
    fn diacritics_are_folded() {
        assert_eq!(normalize("Pokémon"), "pokemon");
        assert_eq!(normalize("ÉLITE"), "elite");
        assert_eq!(normalize("Çà ïrâ"), "caira");
    }

    #[test]
    fn repeated_characters_collapse() {
        assert_eq!(normalize("poooker"), "poker");
        assert_eq!(normalize("Book"), "bok");
        assert_eq!(normalize("2048"), "2048");
        assert_eq!(normalize("1100"), "10");
    }

    #[test]
    fn collapse_applies_after_punctuation_is_dropped() {
        assert_eq!(normalize("Po-ok-er"), "poker");
    }

    #[test]
    fn blank_or_symbol_only_names_yield_empty_key() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
        assert_eq!(normalize("!!! ---"), "");
        assert_eq!(normalize("日本"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["Counter-Strike: GO", "Pokémon Rouge", "aaa bbb"] {
            let key = normalize(raw);
            assert_eq!(normalize(&key), key);
        }
    }

    #[test]
    fn prefix_compatibility_is_symmetric_but_not_transitive() {
        assert!(keys_are_prefix_compatible("counter", "counterstrike"));
        assert!(keys_are_prefix_compatible("counterstrike", "counter"));
        assert!(keys_are_prefix_compatible("chess", "chess"));
        assert!(!keys_are_prefix_compatible("chess", "checkers"));
        assert!(!keys_are_prefix_compatible("", "chess"));

        // "ab" ~ "a" and "a" ~ "ac", yet "ab" !~ "ac".
        assert!(keys_are_prefix_compatible("ab", "a"));
        assert!(keys_are_prefix_compatible("a", "ac"));
        assert!(!keys_are_prefix_compatible("ab", "ac"));
    }
}
