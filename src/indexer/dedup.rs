//! Content addressing and run-scoped deduplication

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// SHA-256 hex digest of chunk content; the chunk id
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Result of offering an id to [`SeenHashes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    New,
    Duplicate,
}

/// Ids produced so far in the current run.
///
/// Held by exactly one owner; `observe` takes `&mut self`, so concurrent
/// producers must funnel ids through that owner.
#[derive(Debug, Default)]
pub struct SeenHashes {
    seen: HashSet<String>,
}

impl SeenHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`, reporting whether it was already present
    pub fn observe(&mut self, id: &str) -> Observation {
        if self.seen.contains(id) {
            Observation::Duplicate
        } else {
            self.seen.insert(id.to_string());
            Observation::New
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc").len(), 64);
    }

    #[test]
    fn test_identical_content_same_id() {
        assert_eq!(content_hash("def a(): pass"), content_hash("def a(): pass"));
        assert_ne!(content_hash("def a(): pass"), content_hash("def a(): pass "));
    }

    #[test]
    fn test_observe() {
        let mut seen = SeenHashes::new();
        let id = content_hash("x = 1");

        assert!(seen.is_empty());
        assert_eq!(seen.observe(&id), Observation::New);
        assert_eq!(seen.observe(&id), Observation::Duplicate);
        assert_eq!(seen.observe(&content_hash("x = 2")), Observation::New);
        assert!(seen.contains(&id));
        assert_eq!(seen.len(), 2);
    }
}
