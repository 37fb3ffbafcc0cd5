//! Append-only, hash-chained event journal.

use serde::{Deserialize, Serialize};

use super::LedgerEvent;
use crate::crypto::{EventHasher, Hash, HashChainError};

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Sequence number, starting at 1.
    pub seq: u64,
    /// Emission time.
    pub timestamp_ms: u64,
    /// The event.
    pub event: LedgerEvent,
    /// Hash of the preceding entry (zero for the first).
    pub prev_hash: Hash,
    /// `blake3(prev_hash || timestamp || canonical_bytes(event))`.
    pub entry_hash: Hash,
}

impl JournalEntry {
    fn content(timestamp_ms: u64, event: &LedgerEvent) -> Vec<u8> {
        let mut content = timestamp_ms.to_be_bytes().to_vec();
        content.extend_from_slice(&event.canonical_bytes());
        content
    }
}

/// In-memory event journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventJournal {
    entries: Vec<JournalEntry>,
}

impl EventJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the last entry, or the genesis hash.
    #[must_use]
    pub fn head_hash(&self) -> Hash {
        self.entries
            .last()
            .map_or(EventHasher::GENESIS_PREV_HASH, |e| e.entry_hash)
    }

    /// Appends an event and returns the new entry.
    pub fn append(&mut self, event: LedgerEvent, timestamp_ms: u64) -> &JournalEntry {
        let prev_hash = self.head_hash();
        let entry_hash =
            EventHasher::hash_event(&JournalEntry::content(timestamp_ms, &event), &prev_hash);
        let seq = self.entries.len() as u64 + 1;
        self.entries.push(JournalEntry {
            seq,
            timestamp_ms,
            event,
            prev_hash,
            entry_hash,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// All entries in order.
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Entries with `seq > after`.
    #[must_use]
    pub fn since(&self, after: u64) -> &[JournalEntry] {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    /// Events only, in order.
    pub fn events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Recomputes every hash and link.
    ///
    /// # Errors
    ///
    /// Returns the first [`HashChainError`] found.
    pub fn verify(&self) -> Result<(), HashChainError> {
        let contents: Vec<Vec<u8>> = self
            .entries
            .iter()
            .map(|e| JournalEntry::content(e.timestamp_ms, &e.event))
            .collect();
        EventHasher::verify_chain(
            self.entries
                .iter()
                .zip(&contents)
                .map(|(e, content)| (e.seq, content.as_slice(), &e.prev_hash, &e.entry_hash)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RequestId;

    fn created(id: u64) -> LedgerEvent {
        LedgerEvent::RecordCreated {
            id,
            owner: "alice".into(),
            created_at_ms: 10,
        }
    }

    #[test]
    fn test_append_links_entries() {
        let mut journal = EventJournal::new();
        let first_hash = journal.append(created(1), 10).entry_hash;
        let second = journal.append(created(2), 11);
        assert_eq!(second.seq, 2);
        assert_eq!(second.prev_hash, first_hash);
        assert!(journal.verify().is_ok());
    }

    #[test]
    fn test_since() {
        let mut journal = EventJournal::new();
        journal.append(created(1), 10);
        journal.append(created(2), 11);
        journal.append(created(3), 12);
        assert_eq!(journal.since(1).len(), 2);
        assert_eq!(journal.since(1)[0].seq, 2);
        assert!(journal.since(10).is_empty());
    }

    #[test]
    fn test_tampering_is_detected() {
        let mut journal = EventJournal::new();
        journal.append(created(1), 10);
        journal.append(
            LedgerEvent::RecordDisclosed {
                id: 1,
                request_id: RequestId(4),
            },
            11,
        );

        journal.entries[1].event = LedgerEvent::RecordDisclosed {
            id: 2,
            request_id: RequestId(4),
        };
        assert!(matches!(
            journal.verify(),
            Err(HashChainError::HashMismatch { seq: 2, .. })
        ));
    }

    #[test]
    fn test_timestamp_is_hashed() {
        let mut a = EventJournal::new();
        let mut b = EventJournal::new();
        a.append(created(1), 10);
        b.append(created(1), 11);
        assert_ne!(a.head_hash(), b.head_hash());
    }
}
