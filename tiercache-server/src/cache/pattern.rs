//! Key pattern matching for bulk invalidation
//!
//! A pattern is matched against the whole key. `*` matches any run of
//! characters (including none) and may appear any number of times; every
//! other character matches itself. `user:*` therefore matches `user:1` and
//! `user:` but not `admin:user:1`.

use crate::core::{CacheError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    raw: String,
    tokens: Vec<char>,
}

impl KeyPattern {
    /// Parse a pattern. An empty pattern is rejected.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidPattern("pattern is empty".to_string()));
        }
        Ok(Self {
            raw: pattern.to_string(),
            tokens: pattern.chars().collect(),
        })
    }

    /// Whether the pattern contains no wildcard
    pub fn is_literal(&self) -> bool {
        !self.tokens.contains(&'*')
    }

    /// Two-pointer glob match with single-point backtracking to the last `*`
    pub fn matches(&self, key: &str) -> bool {
        let key: Vec<char> = key.chars().collect();
        let pat = &self.tokens;

        let (mut p, mut k) = (0, 0);
        let mut star: Option<usize> = None;
        let mut resume = 0;

        while k < key.len() {
            if p < pat.len() && pat[p] == '*' {
                star = Some(p);
                p += 1;
                resume = k;
            } else if p < pat.len() && pat[p] == key[k] {
                p += 1;
                k += 1;
            } else if let Some(s) = star {
                p = s + 1;
                resume += 1;
                k = resume;
            } else {
                return false;
            }
        }

        pat[p..].iter().all(|&c| c == '*')
    }
}

impl std::fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        KeyPattern::parse(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(matches("user:*", "user:1"));
        assert!(matches("user:*", "user:"));
        assert!(!matches("user:*", "order:1"));
        assert!(!matches("user:*", "admin:user:1"));
    }

    #[test]
    fn test_literal() {
        let pattern = KeyPattern::parse("order:1").unwrap();
        assert!(pattern.is_literal());
        assert!(pattern.matches("order:1"));
        assert!(!pattern.matches("order:10"));
    }

    #[test]
    fn test_multiple_wildcards() {
        assert!(matches("http:*:/api/*", "http:alice:/api/tasks"));
        assert!(matches("*:profile", "user:42:profile"));
        assert!(matches("a*b*c", "aXXbYYc"));
        assert!(matches("a*b*c", "abc"));
        assert!(!matches("a*b*c", "aXXbYY"));
        assert!(matches("**", ""));
    }

    #[test]
    fn test_backtracking() {
        assert!(matches("*ab", "aab"));
        assert!(matches("a*aab", "aaaab"));
        assert!(!matches("*ab", "aba"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("task.*", "task.1"));
        assert!(!matches("task.*", "taskX1"));
        assert!(matches("(x)+", "(x)+"));
    }

    #[test]
    fn test_unicode_keys() {
        assert!(matches("café:*", "café:menu"));
        assert!(!matches("caf*:x", "café:y"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            KeyPattern::parse(""),
            Err(CacheError::InvalidPattern(_))
        ));
    }
}
