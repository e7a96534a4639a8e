//! Root-to-part identifier chains used as registry keys.

use std::fmt;

/// Ordered identifiers from the top-level part down to an entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(Vec<String>);

impl PathKey {
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// This key with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifier of the entry itself.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// True when `reference` occurs in this key as an ordered, not
    /// necessarily contiguous, subsequence.
    pub fn matches(&self, reference: &[&str]) -> bool {
        if reference.is_empty() {
            return false;
        }
        let mut remaining = self.0.iter();
        reference.iter().all(|wanted| remaining.any(|segment| segment.as_str() == *wanted))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(segments: &[&str]) -> PathKey {
        let mut iter = segments.iter();
        let mut key = PathKey::root(*iter.next().unwrap());
        for segment in iter {
            key = key.child(*segment);
        }
        key
    }

    #[test]
    fn test_child_appends() {
        let body = PathKey::root("body");
        let arm = body.child("arm");
        assert_eq!(arm.segments(), &["body".to_string(), "arm".to_string()]);
        assert_eq!(arm.last(), Some("arm"));
        assert_eq!(arm.to_string(), "body:arm");
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_subsequence_matching() {
        let hand = key(&["body", "arm", "hand"]);
        assert!(hand.matches(&["hand"]));
        assert!(hand.matches(&["arm", "hand"]));
        assert!(hand.matches(&["body", "hand"]));
        assert!(!hand.matches(&["hand", "arm"]));
        assert!(!hand.matches(&["leg"]));
        assert!(!hand.matches(&[]));
    }

    #[test]
    fn test_repeated_segments_need_increasing_positions() {
        let k = key(&["a", "b", "a"]);
        assert!(k.matches(&["b", "a"]));
        assert!(k.matches(&["a", "a"]));
        assert!(!k.matches(&["b", "b"]));
    }
}
