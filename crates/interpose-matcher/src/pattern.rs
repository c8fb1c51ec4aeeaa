//! Compiled name patterns

use std::fmt;
use std::hash::{Hash, Hasher};

use interpose_core::ConfigurationError;
use regex::Regex;

/// Regular expression matched against a whole name
///
/// Equality and hashing use the source text, so two patterns built from the
/// same string are interchangeable.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source`; the pattern must match the entire name
    pub fn new(source: &str) -> Result<Self, ConfigurationError> {
        let anchored = format!("^(?:{})$", source);
        let regex = Regex::new(&anchored).map_err(|e| {
            tracing::warn!("[Matcher] rejected pattern {:?}: {}", source, e);
            ConfigurationError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_name_match() {
        let p = Pattern::new(r".*\.service\..*").unwrap();
        assert!(p.is_match("org.example.service.UserService"));
        assert!(!p.is_match("org.example.dao.UserDao"));

        // anchored: a substring hit is not enough
        let q = Pattern::new("service").unwrap();
        assert!(!q.is_match("org.example.service.UserService"));
        assert!(q.is_match("service"));
    }

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        let err = Pattern::new("org.(example").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidPattern { ref pattern, .. } if pattern == "org.(example"
        ));
    }

    #[test]
    fn test_equality_by_source() {
        assert_eq!(Pattern::new("a.*").unwrap(), Pattern::new("a.*").unwrap());
        assert_ne!(Pattern::new("a.*").unwrap(), Pattern::new("b.*").unwrap());
    }
}
