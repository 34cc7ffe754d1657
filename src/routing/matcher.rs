//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefix matching is plain string prefix (`/ray` matches `/rayx`)
//! - No regex to guarantee O(n) matching

use crate::config::MatchKind;

/// Matches a request path against one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    pub fn new(kind: MatchKind, pattern: impl Into<String>) -> Self {
        match kind {
            MatchKind::Exact => PathMatcher::Exact(pattern.into()),
            MatchKind::Prefix => PathMatcher::Prefix(pattern.into()),
        }
    }

    /// Returns true if `path` satisfies this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(p) => path == p,
            PathMatcher::Prefix(p) => path.starts_with(p.as_str()),
        }
    }

    /// Sort key: exact patterns first, then longer patterns first.
    pub(crate) fn precedence(&self) -> (u8, std::cmp::Reverse<usize>) {
        match self {
            PathMatcher::Exact(p) => (0, std::cmp::Reverse(p.len())),
            PathMatcher::Prefix(p) => (1, std::cmp::Reverse(p.len())),
        }
    }
}

impl std::fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathMatcher::Exact(p) => write!(f, "={}", p),
            PathMatcher::Prefix(p) => write!(f, "{}*", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher() {
        let matcher = PathMatcher::new(MatchKind::Exact, "/ws");
        assert!(matcher.matches("/ws"));
        assert!(!matcher.matches("/ws/"));
        assert!(!matcher.matches("/WS"));
    }

    #[test]
    fn test_prefix_matcher() {
        let matcher = PathMatcher::new(MatchKind::Prefix, "/ray");
        assert!(matcher.matches("/ray"));
        assert!(matcher.matches("/ray/anything"));
        assert!(matcher.matches("/rayx"));
        assert!(!matcher.matches("/images"));
    }

    #[test]
    fn test_precedence_orders_exact_then_longest() {
        let mut matchers = [
            PathMatcher::Prefix("/a".into()),
            PathMatcher::Prefix("/a/b".into()),
            PathMatcher::Exact("/a".into()),
        ];
        matchers.sort_by_key(PathMatcher::precedence);
        assert_eq!(matchers[0], PathMatcher::Exact("/a".into()));
        assert_eq!(matchers[1], PathMatcher::Prefix("/a/b".into()));
        assert_eq!(matchers[2], PathMatcher::Prefix("/a".into()));
    }
}
