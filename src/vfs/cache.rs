//! Byte budget over materialized entries.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

/// A materialized entry on local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Virtual path the entry was materialized for.
    pub key: String,
    pub location: PathBuf,
    pub size: u64,
}

/// Tracks materialized entries in the order they were admitted and hands
/// back the oldest ones once the budget is exceeded.
///
/// A key can be pinned while it is being extracted or read. Pinned entries
/// are never handed back for eviction, so the budget may be exceeded until
/// a later admission finds them unpinned.
#[derive(Debug)]
pub struct CacheLedger {
    budget: u64,
    used: u64,
    entries: VecDeque<CachedEntry>,
    pins: HashMap<String, usize>,
}

impl CacheLedger {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            used: 0,
            entries: VecDeque::new(),
            pins: HashMap::new(),
        }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn pin(&mut self, key: &str) {
        *self.pins.entry(key.to_string()).or_default() += 1;
    }

    pub fn unpin(&mut self, key: &str) {
        if let Some(count) = self.pins.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(key);
            }
        }
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pins.contains_key(key)
    }

    /// Drop `key` from the ledger, returning its entry if it was tracked.
    pub fn forget(&mut self, key: &str) -> Option<CachedEntry> {
        let idx = self.entries.iter().position(|e| e.key == key)?;
        let entry = self.entries.remove(idx)?;
        self.used -= entry.size;
        Some(entry)
    }

    /// Record a fresh materialization and return the entries that must be
    /// evicted to get back under budget, oldest first. The admitted entry
    /// itself is never evicted, even if it alone exceeds the budget, and
    /// neither is any pinned entry.
    pub fn admit(&mut self, entry: CachedEntry) -> Vec<CachedEntry> {
        self.forget(&entry.key);
        self.used += entry.size;
        self.entries.push_back(entry);

        let mut evicted = Vec::new();
        let mut idx = 0;
        // The newcomer sits at the back
        while self.used > self.budget && idx + 1 < self.entries.len() {
            if self.is_pinned(&self.entries[idx].key) {
                idx += 1;
                continue;
            }
            let Some(oldest) = self.entries.remove(idx) else {
                break;
            };
            self.used -= oldest.size;
            evicted.push(oldest);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, size: u64) -> CachedEntry {
        CachedEntry {
            key: key.to_string(),
            location: PathBuf::from("/cache").join(key.trim_start_matches('/')),
            size,
        }
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut ledger = CacheLedger::new(100);
        assert!(ledger.admit(entry("/a", 40)).is_empty());
        assert!(ledger.admit(entry("/b", 40)).is_empty());

        let evicted = ledger.admit(entry("/c", 40));
        assert_eq!(evicted, [entry("/a", 40)]);
        assert_eq!(ledger.used(), 80);
        assert!(!ledger.contains("/a"));
    }

    #[test]
    fn test_readmit_replaces() {
        let mut ledger = CacheLedger::new(100);
        ledger.admit(entry("/a", 40));
        ledger.admit(entry("/a", 50));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.used(), 50);
    }

    #[test]
    fn test_oversized_entry_is_kept() {
        let mut ledger = CacheLedger::new(10);
        ledger.admit(entry("/small", 5));
        let evicted = ledger.admit(entry("/huge", 500));
        assert_eq!(evicted, [entry("/small", 5)]);
        assert!(ledger.contains("/huge"));
    }

    #[test]
    fn test_pinned_entries_survive() {
        let mut ledger = CacheLedger::new(100);
        ledger.admit(entry("/a", 40));
        ledger.admit(entry("/b", 40));
        ledger.pin("/a");

        let evicted = ledger.admit(entry("/c", 40));
        assert_eq!(evicted, [entry("/b", 40)]);
        assert!(ledger.contains("/a"));

        // Over budget while everything else is pinned
        ledger.pin("/c");
        assert!(ledger.admit(entry("/d", 40)).is_empty());
        assert_eq!(ledger.used(), 120);

        ledger.unpin("/a");
        ledger.unpin("/c");
        assert!(!ledger.is_pinned("/a"));
        let evicted = ledger.admit(entry("/e", 10));
        assert_eq!(evicted, [entry("/a", 40)]);
        assert_eq!(ledger.used(), 90);
    }

    #[test]
    fn test_pins_nest() {
        let mut ledger = CacheLedger::new(10);
        ledger.pin("/a");
        ledger.pin("/a");
        ledger.unpin("/a");
        assert!(ledger.is_pinned("/a"));
        ledger.unpin("/a");
        assert!(!ledger.is_pinned("/a"));
        // Unpinning an unknown key is a no-op
        ledger.unpin("/zzz");
    }
}
