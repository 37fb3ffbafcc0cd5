//! Ledger notifications.
//!
//! One event is emitted per state transition and appended to the
//! hash-chained [`EventJournal`].

mod journal;

use serde::{Deserialize, Serialize};

pub use journal::{EventJournal, JournalEntry};

use crate::codec::encode_fields;
use crate::handle::{RecordId, RequestId};
use crate::results::ResultField;

/// A state transition in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A record was submitted.
    RecordCreated {
        /// New record id.
        id: RecordId,
        /// Submitting actor.
        owner: String,
        /// Creation time.
        created_at_ms: u64,
    },
    /// An analysis result was submitted or replaced.
    ResultAvailable {
        /// Record id.
        id: RecordId,
        /// Submitting actor.
        submitted_by: String,
    },
    /// Decryption of a whole record was requested.
    RecordDecryptionRequested {
        /// Record id.
        id: RecordId,
        /// Oracle request id.
        request_id: RequestId,
    },
    /// Decryption of one result field was requested.
    ResultDecryptionRequested {
        /// Record id.
        id: RecordId,
        /// Output field.
        field: ResultField,
        /// Composite descriptor of `(id, field)`.
        composite: u64,
        /// Oracle request id.
        request_id: RequestId,
    },
    /// A record's cleartexts were disclosed.
    RecordDisclosed {
        /// Record id.
        id: RecordId,
        /// Request that carried the cleartexts.
        request_id: RequestId,
    },
    /// A result field's value was disclosed.
    ResultDisclosed {
        /// Record id.
        id: RecordId,
        /// Output field.
        field: ResultField,
        /// Disclosed value.
        value: u64,
        /// Request that carried the value.
        request_id: RequestId,
    },
    /// A pending request expired without a callback.
    DecryptionRequestExpired {
        /// Record id of the target.
        id: RecordId,
        /// The expired request.
        request_id: RequestId,
    },
}

impl LedgerEvent {
    /// Dotted event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::RecordCreated { .. } => "record.created",
            Self::ResultAvailable { .. } => "result.available",
            Self::RecordDecryptionRequested { .. } => "record.decryption_requested",
            Self::ResultDecryptionRequested { .. } => "result.decryption_requested",
            Self::RecordDisclosed { .. } => "record.disclosed",
            Self::ResultDisclosed { .. } => "result.disclosed",
            Self::DecryptionRequestExpired { .. } => "decryption.expired",
        }
    }

    /// Record id the event concerns.
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::RecordCreated { id, .. }
            | Self::ResultAvailable { id, .. }
            | Self::RecordDecryptionRequested { id, .. }
            | Self::ResultDecryptionRequested { id, .. }
            | Self::RecordDisclosed { id, .. }
            | Self::ResultDisclosed { id, .. }
            | Self::DecryptionRequestExpired { id, .. } => *id,
        }
    }

    /// Deterministic encoding hashed into the journal chain.
    ///
    /// Fields are length-prefixed in declaration order after the event type.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let be = u64::to_be_bytes;
        match self {
            Self::RecordCreated {
                id,
                owner,
                created_at_ms,
            } => encode_fields(&[
                self.event_type().as_bytes(),
                &be(*id),
                owner.as_bytes(),
                &be(*created_at_ms),
            ]),
            Self::ResultAvailable { id, submitted_by } => encode_fields(&[
                self.event_type().as_bytes(),
                &be(*id),
                submitted_by.as_bytes(),
            ]),
            Self::RecordDecryptionRequested { id, request_id }
            | Self::RecordDisclosed { id, request_id }
            | Self::DecryptionRequestExpired { id, request_id } => encode_fields(&[
                self.event_type().as_bytes(),
                &be(*id),
                &request_id.to_be_bytes(),
            ]),
            Self::ResultDecryptionRequested {
                id,
                field,
                composite,
                request_id,
            } => encode_fields(&[
                self.event_type().as_bytes(),
                &be(*id),
                &be(field.index()),
                &be(*composite),
                &request_id.to_be_bytes(),
            ]),
            Self::ResultDisclosed {
                id,
                field,
                value,
                request_id,
            } => encode_fields(&[
                self.event_type().as_bytes(),
                &be(*id),
                &be(field.index()),
                &be(*value),
                &request_id.to_be_bytes(),
            ]),
        }
    }
}
