//! Presentation-layer caches for the sync core.
//!
//! Both structures are derived from, and never the source of truth for,
//! order state; the source of truth is always the last successful fetch.

use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Known-order registry
// ---------------------------------------------------------------------------

/// Order IDs already observed this session, across both push and poll
/// sources. Grows monotonically; reset only with the session itself.
///
/// Only the reconciliation fetcher writes here: an order becomes
/// "permanently known" once confirmed present in an authoritative list
/// fetch, so a spurious push event can never suppress a later legitimate
/// alert on its own.
#[derive(Debug, Default)]
pub struct KnownOrders {
    seen: HashSet<String>,
}

impl KnownOrders {
    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn mark_seen(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    pub fn mark_seen_bulk<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.mark_seen(id);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// ---------------------------------------------------------------------------
// New-order highlight set
// ---------------------------------------------------------------------------

/// Order IDs currently flagged as "just arrived". Entries are removed by
/// the alert policy's expiry timers; membership here affects presentation
/// only.
#[derive(Debug, Default)]
pub struct HighlightSet {
    entries: HashSet<String>,
}

impl HighlightSet {
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    /// Returns false when the ID was already highlighted.
    pub fn insert(&mut self, id: &str) -> bool {
        self.entries.insert(id.to_string())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_seen_is_idempotent() {
        let mut known = KnownOrders::default();
        assert!(!known.has_seen("a"));

        known.mark_seen("a");
        known.mark_seen("a");
        assert!(known.has_seen("a"));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn bulk_marking_survives_repeated_fetches() {
        let mut known = KnownOrders::default();
        known.mark_seen_bulk(["a", "b"]);
        known.mark_seen_bulk(["b", "c"]);

        assert!(known.has_seen("a"));
        assert!(known.has_seen("b"));
        assert!(known.has_seen("c"));
        assert_eq!(known.len(), 3);
    }

    #[test]
    fn highlight_insert_reports_duplicates() {
        let mut highlights = HighlightSet::default();
        assert!(highlights.insert("a"));
        assert!(!highlights.insert("a"));
        assert!(highlights.remove("a"));
        assert!(!highlights.remove("a"));
        assert!(highlights.is_empty());
    }
}
