//! The live entry registry.
//!
//! An ordered list of [`Entry`] records. Lookup is first-match-wins on
//! insertion order; code uniqueness is assumed but not enforced, so an
//! operator who configures two entries with the same code gets the first
//! one, always. Temporary entries are appended at the tail and therefore
//! can never shadow a configured entry.

use crate::types::Entry;
use chrono::{DateTime, Local};
use tracing::{debug, info};

/// Ordered registry of permanent and temporary entries.
///
/// Owned by the access controller; everything here is plain single-owner
/// mutation, no interior locking.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: Vec<Entry>,
}

impl EntryRegistry {
    /// Create a registry from the configured entry list.
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        EntryRegistry { entries }
    }

    /// Number of live records (including expired temporaries not yet
    /// purged).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    /// Resolve a submitted code to a registry index.
    ///
    /// The first entry whose code matches decides the outcome: if that
    /// entry is an expired temporary, the submission is a miss and the
    /// search does not continue past it. Codes are assumed unique, so this
    /// only matters for the (unenforced) duplicate case.
    #[must_use]
    pub fn resolve(&self, code: &str, now: DateTime<Local>) -> Option<usize> {
        let (index, entry) = self
            .entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.code.matches(code))?;

        if entry.is_expired(now) {
            info!(name = %entry.name, "entry expired");
            return None;
        }

        Some(index)
    }

    /// Append a runtime-created temporary entry.
    pub fn push(&mut self, entry: Entry) {
        debug!(name = %entry.name, "registry append");
        self.entries.push(entry);
    }

    /// Remove expired temporary entries, returning how many were dropped.
    ///
    /// Expired temporaries are harmless (they never authorize) but grow the
    /// registry without bound on a busy door; this sweep is opt-in from the
    /// daemon rather than an automatic side effect of lookup.
    pub fn purge_expired(&mut self, now: DateTime<Local>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            info!(removed, "purged expired temporary entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryCode;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 3, 12, 0, 0).unwrap()
    }

    fn entry(name: &str, code: &str) -> Entry {
        Entry::new(name, EntryCode::new(code).unwrap())
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let registry = EntryRegistry::new(vec![
            entry("First", "1234"),
            entry("Second", "1234"),
            entry("Other", "9999"),
        ]);

        let index = registry.resolve("1234", now()).unwrap();
        assert_eq!(registry.get(index).unwrap().name, "First");
    }

    #[test]
    fn test_resolve_miss() {
        let registry = EntryRegistry::new(vec![entry("First", "1234")]);
        assert!(registry.resolve("0000", now()).is_none());
    }

    #[test]
    fn test_resolve_expired_temporary_is_a_miss() {
        let parent = entry("Gardener", "1357");
        let expired = Entry::temporary(
            &parent,
            EntryCode::new("55555").unwrap(),
            now() - chrono::Duration::minutes(1),
        );
        let live = Entry::temporary(
            &parent,
            EntryCode::new("66666").unwrap(),
            now() + chrono::Duration::minutes(10),
        );

        let mut registry = EntryRegistry::new(vec![parent]);
        registry.push(expired);
        registry.push(live);

        assert!(registry.resolve("55555", now()).is_none());
        assert!(registry.resolve("66666", now()).is_some());
    }

    #[test]
    fn test_purge_expired_keeps_permanent_and_live() {
        let parent = entry("Gardener", "1357");
        let expired = Entry::temporary(
            &parent,
            EntryCode::new("55555").unwrap(),
            now() - chrono::Duration::minutes(1),
        );
        let live = Entry::temporary(
            &parent,
            EntryCode::new("66666").unwrap(),
            now() + chrono::Duration::minutes(10),
        );

        let mut registry = EntryRegistry::new(vec![parent]);
        registry.push(expired);
        registry.push(live);

        assert_eq!(registry.purge_expired(now()), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("66666", now()).is_some());
    }
}
