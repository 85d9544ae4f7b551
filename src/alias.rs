//! Alias and target validation, plus random alias generation.

use crate::storage::config::{DEFAULT_ALIAS_ALPHABET, DEFAULT_ALIAS_LENGTH};
use rand::Rng;
use url::Url;

/// Longest alias accepted.
pub const MAX_ALIAS_LEN: usize = 64;

/// Returns true for characters allowed in an alias: `[A-Za-z0-9_-]`.
#[inline]
pub fn is_alias_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Checks an alias against the format rule: 1 to 64 characters from
/// `[A-Za-z0-9_-]`.
///
/// ```
/// use flashlink::alias::is_valid_alias;
///
/// assert!(is_valid_alias("my-link_01"));
/// assert!(!is_valid_alias(""));
/// assert!(!is_valid_alias("has space"));
/// ```
pub fn is_valid_alias(alias: &str) -> bool {
    !alias.is_empty() && alias.len() <= MAX_ALIAS_LEN && alias.chars().all(is_alias_char)
}

/// Parses a target and checks that it is an absolute URL.
pub fn parse_target(target: &str) -> Option<Url> {
    Url::parse(target).ok()
}

/// Produces candidate aliases for records created without one.
///
/// Candidates are not checked for uniqueness here. The store retries on
/// collision.
pub trait AliasGenerator: Send + Sync + std::fmt::Debug {
    fn generate(&self) -> String;
}

/// Draws aliases uniformly from a fixed alphabet.
#[derive(Debug, Clone)]
pub struct RandomAliasGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl RandomAliasGenerator {
    /// Creates a generator. An empty alphabet falls back to the default
    /// alphanumeric one, and the length is kept within `1..=64`.
    pub fn new(alphabet: &str, length: usize) -> Self {
        let mut alphabet: Vec<char> = alphabet.chars().filter(|c| is_alias_char(*c)).collect();
        if alphabet.is_empty() {
            alphabet = DEFAULT_ALIAS_ALPHABET.chars().collect();
        }
        Self {
            alphabet,
            length: length.clamp(1, MAX_ALIAS_LEN),
        }
    }
}

impl Default for RandomAliasGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_ALPHABET, DEFAULT_ALIAS_LENGTH)
    }
}

impl AliasGenerator for RandomAliasGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_format() {
        assert!(is_valid_alias("abc"));
        assert!(is_valid_alias("A-Z_0-9"));
        assert!(is_valid_alias(&"a".repeat(64)));

        assert!(!is_valid_alias(""));
        assert!(!is_valid_alias(&"a".repeat(65)));
        assert!(!is_valid_alias("a/b"));
        assert!(!is_valid_alias("naïve"));
        assert!(!is_valid_alias("a.b"));
    }

    #[test]
    fn test_parse_target() {
        assert!(parse_target("http://example.com").is_some());
        assert!(parse_target("https://example.com/a?b=c#d").is_some());

        assert!(parse_target("").is_none());
        assert!(parse_target("example.com").is_none());
        assert!(parse_target("/relative/path").is_none());
    }

    #[test]
    fn test_generated_aliases_are_valid() {
        let generator = RandomAliasGenerator::default();
        for _ in 0..100 {
            let alias = generator.generate();
            assert_eq!(alias.len(), DEFAULT_ALIAS_LENGTH);
            assert!(is_valid_alias(&alias));
        }
    }

    #[test]
    fn test_generator_respects_alphabet() {
        let generator = RandomAliasGenerator::new("xy", 16);
        let alias = generator.generate();
        assert_eq!(alias.len(), 16);
        assert!(alias.chars().all(|c| c == 'x' || c == 'y'));
    }

    #[test]
    fn test_generator_falls_back_on_empty_alphabet() {
        let generator = RandomAliasGenerator::new("/?#", 0);
        let alias = generator.generate();
        assert_eq!(alias.len(), 1);
        assert!(is_valid_alias(&alias));
    }
}
