//! Encrypted record store.
//!
//! Holds each record's mesh/material/boundary-condition handle triple and
//! the disclosure slot attached to it.
//!
//! # Lifecycle
//!
//! ```text
//! submit --> EncryptedRecord + DisclosedRecord (revealed = false)
//!                                   |
//!                                reveal (exactly once)
//!                                   v
//!                         DisclosedRecord (revealed = true)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::RecordCleartexts;
use crate::correlator::MAX_RECORD_ID;
use crate::error::{LedgerError, LedgerResult};
use crate::handle::{CiphertextHandle, RecordId, RequestId};

/// An encrypted engineering record. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    /// Record id.
    pub id: RecordId,
    /// Actor that submitted the record.
    pub owner: String,
    /// Encrypted mesh.
    pub mesh: CiphertextHandle,
    /// Encrypted material properties.
    pub material: CiphertextHandle,
    /// Encrypted boundary conditions.
    pub boundary: CiphertextHandle,
    /// Creation time (Unix millis).
    pub created_at_ms: u64,
}

impl EncryptedRecord {
    /// The three handles in disclosure order.
    #[must_use]
    pub const fn handles(&self) -> [CiphertextHandle; 3] {
        [self.mesh, self.material, self.boundary]
    }
}

/// Cleartext view of a record, populated once on disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisclosedRecord {
    /// Disclosed mesh, empty until revealed.
    pub mesh: String,
    /// Disclosed material, empty until revealed.
    pub material: String,
    /// Disclosed boundary conditions, empty until revealed.
    pub boundary: String,
    /// Whether the record has been disclosed.
    pub revealed: bool,
    /// Disclosure time.
    pub revealed_at_ms: Option<u64>,
    /// Request whose callback disclosed the record.
    pub revealed_by: Option<RequestId>,
}

impl DisclosedRecord {
    /// Returns the disclosed fields as [`RecordCleartexts`].
    #[must_use]
    pub fn cleartexts(&self) -> RecordCleartexts {
        RecordCleartexts {
            mesh: self.mesh.clone(),
            material: self.material.clone(),
            boundary: self.boundary.clone(),
        }
    }
}

/// Record and disclosure tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordStore {
    records: BTreeMap<RecordId, EncryptedRecord>,
    disclosures: BTreeMap<RecordId, DisclosedRecord>,
    next_id: RecordId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            disclosures: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl RecordStore {
    /// Creates an empty store. The first id handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records whose disclosure flag is set.
    #[must_use]
    pub fn revealed_count(&self) -> usize {
        self.disclosures.values().filter(|d| d.revealed).count()
    }

    /// Stores a new record and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IdSpaceExhausted`] once ids would no longer fit
    /// the composite descriptor range.
    pub fn submit(
        &mut self,
        owner: &str,
        handles: [CiphertextHandle; 3],
        now_ms: u64,
    ) -> LedgerResult<RecordId> {
        let id = self.next_id;
        if id > MAX_RECORD_ID {
            return Err(LedgerError::IdSpaceExhausted);
        }
        self.next_id += 1;

        let [mesh, material, boundary] = handles;
        self.records.insert(
            id,
            EncryptedRecord {
                id,
                owner: owner.to_owned(),
                mesh,
                material,
                boundary,
                created_at_ms: now_ms,
            },
        );
        self.disclosures.insert(id, DisclosedRecord::default());
        Ok(id)
    }

    /// Looks up a record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids.
    pub fn get(&self, id: RecordId) -> LedgerResult<&EncryptedRecord> {
        self.records
            .get(&id)
            .ok_or(LedgerError::NotFound { what: "record", id })
    }

    /// Looks up a record's disclosure slot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids.
    pub fn disclosure(&self, id: RecordId) -> LedgerResult<&DisclosedRecord> {
        self.disclosures
            .get(&id)
            .ok_or(LedgerError::NotFound { what: "record", id })
    }

    /// Iterates records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EncryptedRecord> {
        self.records.values()
    }

    /// Performs the one-shot disclosure transition.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids and
    /// [`LedgerError::AlreadyRevealed`] if the record was already disclosed;
    /// in both cases nothing is written.
    pub fn reveal(
        &mut self,
        id: RecordId,
        cleartexts: RecordCleartexts,
        request_id: RequestId,
        now_ms: u64,
    ) -> LedgerResult<()> {
        let slot = self
            .disclosures
            .get_mut(&id)
            .ok_or(LedgerError::NotFound { what: "record", id })?;
        if slot.revealed {
            return Err(LedgerError::AlreadyRevealed {
                target: format!("record {id}"),
            });
        }

        *slot = DisclosedRecord {
            mesh: cleartexts.mesh,
            material: cleartexts.material,
            boundary: cleartexts.boundary,
            revealed: true,
            revealed_at_ms: Some(now_ms),
            revealed_by: Some(request_id),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(seed: u8) -> [CiphertextHandle; 3] {
        [
            CiphertextHandle::from_bytes([seed; 32]),
            CiphertextHandle::from_bytes([seed.wrapping_add(1); 32]),
            CiphertextHandle::from_bytes([seed.wrapping_add(2); 32]),
        ]
    }

    fn cleartexts() -> RecordCleartexts {
        RecordCleartexts {
            mesh: "hex8".into(),
            material: "steel".into(),
            boundary: "clamped".into(),
        }
    }

    #[test]
    fn test_ids_start_at_one_and_increment() {
        let mut store = RecordStore::new();
        assert_eq!(store.submit("alice", handles(1), 10).unwrap(), 1);
        assert_eq!(store.submit("bob", handles(4), 11).unwrap(), 2);
        assert_eq!(store.len(), 2);

        let record = store.get(2).unwrap();
        assert_eq!(record.owner, "bob");
        assert_eq!(record.created_at_ms, 11);
        assert_eq!(record.handles(), handles(4));
    }

    #[test]
    fn test_new_record_is_not_revealed() {
        let mut store = RecordStore::new();
        let id = store.submit("alice", handles(1), 10).unwrap();
        let disclosure = store.disclosure(id).unwrap();
        assert!(!disclosure.revealed);
        assert!(disclosure.mesh.is_empty());
        assert_eq!(store.revealed_count(), 0);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = RecordStore::new();
        assert!(matches!(
            store.get(1),
            Err(LedgerError::NotFound { what: "record", id: 1 })
        ));
    }

    #[test]
    fn test_reveal_exactly_once() {
        let mut store = RecordStore::new();
        let id = store.submit("alice", handles(1), 10).unwrap();

        store.reveal(id, cleartexts(), RequestId(9), 20).unwrap();
        let disclosure = store.disclosure(id).unwrap();
        assert!(disclosure.revealed);
        assert_eq!(disclosure.cleartexts(), cleartexts());
        assert_eq!(disclosure.revealed_by, Some(RequestId(9)));

        let second = RecordCleartexts {
            mesh: "other".into(),
            ..cleartexts()
        };
        let result = store.reveal(id, second, RequestId(10), 30);
        assert!(matches!(result, Err(LedgerError::AlreadyRevealed { .. })));
        assert_eq!(store.disclosure(id).unwrap().mesh, "hex8");
        assert_eq!(store.disclosure(id).unwrap().revealed_at_ms, Some(20));
    }

    #[test]
    fn test_exhausted_id_space() {
        let mut store = RecordStore::new();
        store.next_id = MAX_RECORD_ID + 1;
        assert!(matches!(
            store.submit("alice", handles(1), 10),
            Err(LedgerError::IdSpaceExhausted)
        ));
        assert!(store.is_empty());
    }
}
