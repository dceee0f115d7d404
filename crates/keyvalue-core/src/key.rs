//! Key resolution
//!
//! A backend may scope every key with a configured prefix before it touches
//! native storage. Two logical keys that resolve to the same native key share
//! one storage cell; the last write wins.

/// Prefix-scoping policy shared by the backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyResolver {
    prefix: String,
}

impl KeyResolver {
    /// Create a resolver for the given prefix (may be empty)
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// The configured prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Native key for a logical key
    pub fn resolve(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Whether a raw native key starts with the prefix.
    ///
    /// This is a literal leading-substring test, so an empty prefix owns
    /// every native key.
    pub fn owns(&self, native_key: &str) -> bool {
        native_key.starts_with(&self.prefix)
    }

    /// Logical key for a native key, if the native key carries the prefix
    pub fn logical<'a>(&self, native_key: &'a str) -> Option<&'a str> {
        native_key.strip_prefix(self.prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prepends_prefix() {
        let keys = KeyResolver::new("app.");
        assert_eq!(keys.resolve("token"), "app.token");
        assert_eq!(KeyResolver::default().resolve("token"), "token");
    }

    #[test]
    fn test_colliding_keys_resolve_identically() {
        let first = KeyResolver::new("ab");
        let second = KeyResolver::new("a");
        assert_eq!(first.resolve("c"), second.resolve("bc"));
    }

    #[test]
    fn test_empty_prefix_owns_everything() {
        let keys = KeyResolver::default();
        assert!(keys.owns("anything"));
        assert!(keys.owns(""));
    }

    #[test]
    fn test_logical_strips_prefix() {
        let keys = KeyResolver::new("app.");
        assert_eq!(keys.logical("app.token"), Some("token"));
        assert_eq!(keys.logical("other.token"), None);
        assert!(!keys.owns("other.token"));
    }
}
