//! Origin/kind index: derived counts for O(1) duplicate checks.
//!
//! The index is a secondary structure maintained alongside the store by the
//! lifecycle engine. Invariant: for every origin, the sum of per-kind counts
//! equals the number of store entries with that origin, and each
//! (origin, kind) count equals the number of matching entries.

use std::collections::HashMap;

/// Mapping `origin → (kind → count)`.
#[derive(Clone, Debug, Default)]
pub struct OriginIndex {
    counts: HashMap<String, HashMap<String, usize>>,
}

impl OriginIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `(origin, kind)`.
    pub fn increment(&mut self, origin: &str, kind: &str) {
        *self
            .counts
            .entry(origin.to_string())
            .or_default()
            .entry(kind.to_string())
            .or_insert(0) += 1;
    }

    /// Decrements the count for `(origin, kind)`, pruning empty entries.
    pub fn decrement(&mut self, origin: &str, kind: &str) {
        if let Some(kinds) = self.counts.get_mut(origin) {
            if let Some(count) = kinds.get_mut(kind) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    kinds.remove(kind);
                }
            }
            if kinds.is_empty() {
                self.counts.remove(origin);
            }
        }
    }

    /// Returns true if any request is pending for the origin, optionally
    /// narrowed to a kind.
    #[must_use]
    pub fn has(&self, origin: &str, kind: Option<&str>) -> bool {
        match kind {
            Some(kind) => self.count(origin, kind) > 0,
            None => self.count_for_origin(origin) > 0,
        }
    }

    /// Returns the count for the exact `(origin, kind)` pair.
    #[must_use]
    pub fn count(&self, origin: &str, kind: &str) -> usize {
        self.counts
            .get(origin)
            .and_then(|kinds| kinds.get(kind))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the sum of per-kind counts for the origin.
    #[must_use]
    pub fn count_for_origin(&self, origin: &str) -> usize {
        self.counts
            .get(origin)
            .map(|kinds| kinds.values().sum())
            .unwrap_or(0)
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Returns true if the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns the total count across all origins and kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts
            .values()
            .map(|kinds| kinds.values().sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_count() {
        let mut index = OriginIndex::new();
        index.increment("a", "tx");
        index.increment("a", "tx");
        index.increment("a", "sign");

        assert_eq!(index.count("a", "tx"), 2);
        assert_eq!(index.count("a", "sign"), 1);
        assert_eq!(index.count_for_origin("a"), 3);
        assert_eq!(index.total(), 3);
    }

    #[test]
    fn test_decrement_prunes_empty_entries() {
        let mut index = OriginIndex::new();
        index.increment("a", "tx");
        index.decrement("a", "tx");

        assert_eq!(index.count("a", "tx"), 0);
        assert!(!index.has("a", None));
        assert!(index.is_empty());
    }

    #[test]
    fn test_decrement_unknown_is_noop() {
        let mut index = OriginIndex::new();
        index.decrement("a", "tx");
        assert!(index.is_empty());
    }

    #[test]
    fn test_has_with_and_without_kind() {
        let mut index = OriginIndex::new();
        index.increment("a", "tx");

        assert!(index.has("a", None));
        assert!(index.has("a", Some("tx")));
        assert!(!index.has("a", Some("sign")));
        assert!(!index.has("b", None));
    }

    #[test]
    fn test_clear() {
        let mut index = OriginIndex::new();
        index.increment("a", "tx");
        index.increment("b", "tx");

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.total(), 0);
    }
}
