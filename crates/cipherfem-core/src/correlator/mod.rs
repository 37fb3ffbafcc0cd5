//! Decryption request correlator.
//!
//! Maps oracle-issued request ids to the record or result field their
//! callback will reveal. Callbacks can arrive in any order; matching is done
//! purely by request id.
//!
//! # State Machine (per target)
//!
//! ```text
//! NoRequest --register--> Pending --resolve--> Resolved (terminal)
//!                            |
//!                         expire
//!                            v
//!                         NoRequest (re-requestable)
//! ```
//!
//! # Invariants
//!
//! - Each request id maps to exactly one target.
//! - Resolving removes the entry, so a replayed callback finds nothing.
//! - At most one live (unexpired) request per target.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::handle::{RecordId, RequestId};
use crate::results::ResultField;


/// Radix of the composite descriptor. Must exceed the largest field index.
pub const COMPOSITE_RADIX: u64 = 4;

/// Largest record id whose composite descriptor fits in a `u64`.
pub const MAX_RECORD_ID: RecordId = (u64::MAX - (COMPOSITE_RADIX - 1)) / COMPOSITE_RADIX;

/// Packs `(id, field)` into one integer: `id * COMPOSITE_RADIX + field`.
///
/// Returns `None` if `id` exceeds [`MAX_RECORD_ID`].
#[must_use]
pub const fn encode_composite(id: RecordId, field: ResultField) -> Option<u64> {
    match id.checked_mul(COMPOSITE_RADIX) {
        Some(base) => base.checked_add(field.index()),
        None => None,
    }
}

/// Unpacks a composite descriptor into `(id, field)`.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidField`] if the low digit is not a field
/// selector.
pub fn decode_composite(composite: u64) -> LedgerResult<(RecordId, ResultField)> {
    let field = ResultField::from_index(composite % COMPOSITE_RADIX)?;
    Ok((composite / COMPOSITE_RADIX, field))
}

/// What a pending request will reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetDescriptor {
    /// The whole record (all three payload handles).
    Record {
        /// Record id.
        id: RecordId,
    },
    /// One output field of the record's analysis result.
    ResultField {
        /// Record id.
        id: RecordId,
        /// Output field.
        field: ResultField,
    },
}

impl TargetDescriptor {
    /// Record id the target belongs to.
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::Record { id } | Self::ResultField { id, .. } => *id,
        }
    }

    /// Short kind name used in errors and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Record { .. } => "record",
            Self::ResultField { .. } => "result field",
        }
    }

    /// Composite descriptor for result-field targets.
    #[must_use]
    pub const fn composite(&self) -> Option<u64> {
        match self {
            Self::Record { .. } => None,
            Self::ResultField { id, field } => encode_composite(*id, *field),
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { id } => write!(f, "record {id}"),
            Self::ResultField { id, field } => write!(f, "{field} of record {id}"),
        }
    }
}

/// A registered, not yet answered, decryption request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Oracle-issued request id.
    pub request_id: RequestId,
    /// What the callback will reveal.
    pub target: TargetDescriptor,
    /// Actor that asked for decryption.
    pub requested_by: String,
    /// Registration time.
    pub requested_at_ms: u64,
    /// Time from which the request no longer counts as live.
    pub expires_at_ms: Option<u64>,
}

impl PendingRequest {
    /// Returns `true` if the request has expired at `now_ms`.
    #[must_use]
    pub const fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at_ms {
            Some(expires_at) => now_ms >= expires_at,
            None => false,
        }
    }
}

/// The pending-request table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Correlator {
    pending: BTreeMap<RequestId, PendingRequest>,
    ttl_ms: Option<u64>,
}

impl Correlator {
    /// Creates a correlator. `ttl_ms` of `None` keeps requests pending
    /// forever.
    #[must_use]
    pub fn new(ttl_ms: Option<u64>) -> Self {
        Self {
            pending: BTreeMap::new(),
            ttl_ms: ttl_ms.filter(|ttl| *ttl > 0),
        }
    }

    /// Configured request lifetime.
    #[must_use]
    pub const fn ttl_ms(&self) -> Option<u64> {
        self.ttl_ms
    }

    /// Number of entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterates entries in request-id order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.values()
    }

    /// Registers a new request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateRequestId`] if the id is already
    /// pending; the existing entry is left untouched.
    pub fn register(
        &mut self,
        request_id: RequestId,
        target: TargetDescriptor,
        requested_by: &str,
        now_ms: u64,
    ) -> LedgerResult<&PendingRequest> {
        if self.pending.contains_key(&request_id) {
            return Err(LedgerError::DuplicateRequestId { request_id });
        }

        let entry = PendingRequest {
            request_id,
            target,
            requested_by: requested_by.to_owned(),
            requested_at_ms: now_ms,
            expires_at_ms: self.ttl_ms.map(|ttl| now_ms.saturating_add(ttl)),
        };
        Ok(self.pending.entry(request_id).or_insert(entry))
    }

    /// Returns the live request for `target`, if any.
    #[must_use]
    pub fn live_request_for(&self, target: &TargetDescriptor, now_ms: u64) -> Option<&PendingRequest> {
        self.pending
            .values()
            .find(|p| p.target == *target && !p.is_expired_at(now_ms))
    }

    /// Returns a live request for any result field of record `id`.
    #[must_use]
    pub fn live_result_request(&self, id: RecordId, now_ms: u64) -> Option<&PendingRequest> {
        self.pending.values().find(|p| {
            matches!(p.target, TargetDescriptor::ResultField { id: target_id, .. } if target_id == id)
                && !p.is_expired_at(now_ms)
        })
    }

    /// Non-destructive lookup of a live request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownRequest`] if the id was never issued,
    /// was already resolved, or has expired.
    pub fn peek(&self, request_id: RequestId, now_ms: u64) -> LedgerResult<&PendingRequest> {
        self.pending
            .get(&request_id)
            .filter(|p| !p.is_expired_at(now_ms))
            .ok_or(LedgerError::UnknownRequest { request_id })
    }

    /// Destructive read: removes and returns the entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownRequest`] if no entry exists, which is
    /// what a replayed callback sees.
    pub fn resolve(&mut self, request_id: RequestId) -> LedgerResult<PendingRequest> {
        self.pending
            .remove(&request_id)
            .ok_or(LedgerError::UnknownRequest { request_id })
    }

    /// Removes every entry expired at `now_ms` and returns them.
    pub fn expire_stale(&mut self, now_ms: u64) -> Vec<PendingRequest> {
        let expired: Vec<RequestId> = self
            .pending
            .values()
            .filter(|p| p.is_expired_at(now_ms))
            .map(|p| p.request_id)
            .collect();
        expired
            .into_iter()
            .filter_map(|request_id| self.pending.remove(&request_id))
            .collect()
    }
}
