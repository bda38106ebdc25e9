//! Path prefix matching.
//!
//! # Design Decisions
//! - Matching is case-sensitive
//! - A prefix only matches on a segment boundary: `/api/upload` matches
//!   `/api/upload` and `/api/upload/avatar`, never `/api/uploads`
//! - No regex, so matching stays linear in the path length

/// Matches a request path against a mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a matcher. A trailing slash on `prefix` is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.len() > 1 && prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_boundary() {
        let matcher = PathPrefixMatcher::new("/api/upload");

        assert!(matcher.matches("/api/upload"));
        assert!(matcher.matches("/api/upload/"));
        assert!(matcher.matches("/api/upload/avatar"));
        assert!(!matcher.matches("/api/uploads"));
        assert!(!matcher.matches("/api/uploads/documents/a.pdf"));
        assert!(!matcher.matches("/api"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let matcher = PathPrefixMatcher::new("/api/users/");
        assert_eq!(matcher.prefix(), "/api/users");
        assert!(matcher.matches("/api/users/42"));
    }

    #[test]
    fn test_case_sensitive() {
        let matcher = PathPrefixMatcher::new("/api/events");
        assert!(!matcher.matches("/API/events"));
    }

    #[test]
    fn test_root() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything"));
    }
}
