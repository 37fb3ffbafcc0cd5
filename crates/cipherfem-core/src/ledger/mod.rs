//! The confidential ledger: one explicit state object owning every table.
//!
//! Each public operation takes `&mut self` and runs to completion before the
//! next one starts, which is the serialized-transaction model the protocol
//! assumes. Callers sharing a ledger across threads wrap it in a `Mutex`.
//!
//! # Flow
//!
//! ```text
//! submit_record ------------> RecordCreated
//! submit_result ------------> ResultAvailable
//! request_*_decryption -----> pending entry + *DecryptionRequested
//!        ...oracle works off-protocol...
//! on_*_decrypted -----------> verify proof -> resolve -> *Disclosed
//! ```
//!
//! # Example
//!
//! ```rust
//! use cipherfem_core::ledger::ConfidentialLedger;
//! use cipherfem_core::oracle::SoftwareOracle;
//! use cipherfem_core::LedgerConfig;
//!
//! let mut oracle = SoftwareOracle::generate();
//! let handles = [
//!     oracle.encrypt_text("tet4 mesh"),
//!     oracle.encrypt_text("E=210GPa"),
//!     oracle.encrypt_text("clamped at x=0"),
//! ];
//!
//! let mut ledger = ConfidentialLedger::new(oracle, &LedgerConfig::default()).unwrap();
//! let id = ledger.submit_record("alice", handles).unwrap();
//! let request_id = ledger.request_record_decryption("alice", id).unwrap();
//!
//! let callback = ledger.library_mut().fulfill(request_id).unwrap();
//! ledger.on_record_decrypted(&callback).unwrap();
//!
//! assert!(ledger.disclosure(id).unwrap().revealed);
//! assert_eq!(ledger.disclosure(id).unwrap().mesh, "tet4 mesh");
//! ```

mod verifier;


use std::sync::Arc;

use tracing::{debug, info, warn};

pub use verifier::Disclosure;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, LedgerConfig};
use crate::correlator::{Correlator, PendingRequest, TargetDescriptor, encode_composite};
use crate::crypto::keys_equal;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventJournal, LedgerEvent};
use crate::handle::{CiphertextHandle, RecordId, RequestId};
use crate::oracle::CiphertextLibrary;
use crate::policy::{AccessPolicy, Action, OwnerPolicy};
use crate::records::{DisclosedRecord, EncryptedRecord, RecordStore};
use crate::results::{AnalysisResult, DisclosedResultField, ResultField, ResultStore};

/// Owns the record, disclosure, result and pending-request tables.
#[derive(Debug)]
pub struct ConfidentialLedger<L: CiphertextLibrary> {
    library: L,
    records: RecordStore,
    results: ResultStore,
    correlator: Correlator,
    journal: EventJournal,
    policy: Box<dyn AccessPolicy>,
    clock: Arc<dyn Clock>,
    max_cleartext_len: usize,
}

impl<L: CiphertextLibrary> ConfidentialLedger<L> {
    /// Creates an empty ledger around `library`.
    ///
    /// The default policy is [`OwnerPolicy`] seeded with
    /// `config.trusted_compute_stages`; the default clock is [`SystemClock`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the config is invalid or pins
    /// an oracle key that `library` does not sign with.
    pub fn new(library: L, config: &LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some(pinned) = config.oracle_verifying_key()? {
            let matches = library
                .oracle_key()
                .is_some_and(|actual| keys_equal(&actual, &pinned));
            if !matches {
                return Err(ConfigError::Validation(
                    "oracle key does not match oracle_public_key".to_string(),
                ));
            }
        }

        Ok(Self {
            library,
            records: RecordStore::new(),
            results: ResultStore::new(),
            correlator: Correlator::new(config.request_ttl()),
            journal: EventJournal::new(),
            policy: Box::new(OwnerPolicy::with_compute_stages(
                config.trusted_compute_stages.iter().cloned(),
            )),
            clock: Arc::new(SystemClock),
            max_cleartext_len: config.max_cleartext_len,
        })
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the access policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The decryption library.
    pub const fn library(&self) -> &L {
        &self.library
    }

    /// Mutable access to the decryption library, e.g. to drive an in-process
    /// oracle.
    pub const fn library_mut(&mut self) -> &mut L {
        &mut self.library
    }

    /// The record store.
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// The result store.
    pub const fn results(&self) -> &ResultStore {
        &self.results
    }

    /// The event journal.
    pub const fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Looks up a record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids.
    pub fn record(&self, id: RecordId) -> LedgerResult<&EncryptedRecord> {
        self.records.get(id)
    }

    /// Looks up a record's disclosure slot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids.
    pub fn disclosure(&self, id: RecordId) -> LedgerResult<&DisclosedRecord> {
        self.records.disclosure(id)
    }

    /// Looks up a submitted result.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if none was submitted.
    pub fn result(&self, id: RecordId) -> LedgerResult<&AnalysisResult> {
        self.results.get(id)
    }

    /// Returns `true` once the record's stress handle is initialized.
    pub fn has_result(&self, id: RecordId) -> bool {
        self.results.has_result(id, &self.library)
    }

    /// Disclosed value of one result field, if any.
    pub fn disclosed_result(&self, id: RecordId, field: ResultField) -> Option<&DisclosedResultField> {
        self.results.disclosed(id, field)
    }

    /// Pending requests in request-id order, expired ones included until
    /// [`expire_stale`](Self::expire_stale) runs.
    pub fn pending_requests(&self) -> impl Iterator<Item = &PendingRequest> {
        self.correlator.iter()
    }

    /// Live pending request for `target`, if any.
    pub fn pending_request_for(&self, target: &TargetDescriptor) -> Option<&PendingRequest> {
        self.correlator.live_request_for(target, self.clock.now_ms())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Stores a new encrypted record owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if the policy rejects the actor,
    /// or [`LedgerError::IdSpaceExhausted`].
    pub fn submit_record(
        &mut self,
        actor: &str,
        handles: [CiphertextHandle; 3],
    ) -> LedgerResult<RecordId> {
        self.authorize(actor, &Action::SubmitRecord)?;
        let now = self.clock.now_ms();
        let id = self.records.submit(actor, handles, now)?;

        info!(record_id = id, owner = actor, "record created");
        self.emit(LedgerEvent::RecordCreated {
            id,
            owner: actor.to_owned(),
            created_at_ms: now,
        });
        Ok(id)
    }

    /// Creates or replaces the analysis result of record `id`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the record does not exist
    /// - [`LedgerError::Unauthorized`] if the actor is neither the owner nor a
    ///   trusted compute stage
    /// - [`LedgerError::DecryptionPending`] if a result field of the record
    ///   is awaiting a callback, since replacing the handles would disclose a
    ///   value that is no longer stored
    pub fn submit_result(
        &mut self,
        actor: &str,
        id: RecordId,
        stress: CiphertextHandle,
        displacement: CiphertextHandle,
        temperature: CiphertextHandle,
    ) -> LedgerResult<()> {
        let owner = self.records.get(id)?.owner.clone();
        self.authorize(actor, &Action::SubmitResult { id, owner: &owner })?;

        let now = self.clock.now_ms();
        if let Some(pending) = self.correlator.live_result_request(id, now) {
            return Err(LedgerError::DecryptionPending {
                target: pending.target.to_string(),
                request_id: pending.request_id,
            });
        }

        self.results.submit(
            id,
            AnalysisResult {
                stress,
                displacement,
                temperature,
                submitted_by: actor.to_owned(),
                submitted_at_ms: now,
            },
        );

        info!(record_id = id, submitted_by = actor, "result available");
        self.emit(LedgerEvent::ResultAvailable {
            id,
            submitted_by: actor.to_owned(),
        });
        Ok(())
    }

    // =========================================================================
    // Decryption requests
    // =========================================================================

    /// Asks the oracle to decrypt the whole record.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if the record does not exist
    /// - [`LedgerError::Unauthorized`] if `actor` is not the owner
    /// - [`LedgerError::AlreadyRevealed`] if the record was disclosed
    /// - [`LedgerError::DecryptionPending`] if a live request exists
    /// - [`LedgerError::Oracle`] / [`LedgerError::DuplicateRequestId`] if the
    ///   library misbehaves
    pub fn request_record_decryption(
        &mut self,
        actor: &str,
        id: RecordId,
    ) -> LedgerResult<RequestId> {
        let record = self.records.get(id)?;
        let owner = record.owner.clone();
        let handles = record.handles();
        self.authorize(actor, &Action::RequestDecryption { id, owner: &owner })?;

        if self.records.disclosure(id)?.revealed {
            return Err(LedgerError::AlreadyRevealed {
                target: format!("record {id}"),
            });
        }

        let target = TargetDescriptor::Record { id };
        let request_id = self.schedule(actor, target, &handles)?;

        info!(record_id = id, %request_id, "record decryption requested");
        self.emit(LedgerEvent::RecordDecryptionRequested { id, request_id });
        Ok(request_id)
    }

    /// Asks the oracle to decrypt one output field of the record's result.
    ///
    /// `field` is the numeric selector (0 stress, 1 displacement,
    /// 2 temperature).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidField`] if `field` is not 0, 1 or 2
    /// - [`LedgerError::NotFound`] if the record or its result is missing
    /// - [`LedgerError::Unauthorized`] if `actor` is not the owner
    /// - [`LedgerError::AlreadyRevealed`] if the field was disclosed
    /// - [`LedgerError::DecryptionPending`] if a live request exists
    pub fn request_result_decryption(
        &mut self,
        actor: &str,
        id: RecordId,
        field: u64,
    ) -> LedgerResult<RequestId> {
        let field = ResultField::from_index(field)?;
        let owner = self.records.get(id)?.owner.clone();
        if !self.results.has_result(id, &self.library) {
            return Err(LedgerError::NotFound { what: "result", id });
        }
        self.authorize(actor, &Action::RequestDecryption { id, owner: &owner })?;

        if self.results.disclosed(id, field).is_some() {
            return Err(LedgerError::AlreadyRevealed {
                target: format!("{field} of record {id}"),
            });
        }

        let handle = self.results.get(id)?.handle(field);
        let target = TargetDescriptor::ResultField { id, field };
        let composite = encode_composite(id, field).ok_or(LedgerError::IdSpaceExhausted)?;
        let request_id = self.schedule(actor, target, &[handle])?;

        info!(record_id = id, %field, composite, %request_id, "result decryption requested");
        self.emit(LedgerEvent::ResultDecryptionRequested {
            id,
            field,
            composite,
            request_id,
        });
        Ok(request_id)
    }

    /// Removes every pending request whose lifetime has passed.
    ///
    /// Their targets become re-requestable, and a late callback for any of
    /// them is rejected as [`LedgerError::UnknownRequest`].
    pub fn expire_stale(&mut self) -> Vec<RequestId> {
        let now = self.clock.now_ms();
        let expired = self.correlator.expire_stale(now);
        let ids = expired.iter().map(|p| p.request_id).collect();
        for pending in expired {
            self.emit_expired(&pending);
        }
        ids
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn authorize(&self, actor: &str, action: &Action<'_>) -> LedgerResult<()> {
        self.policy.authorize(actor, action).inspect_err(|err| {
            warn!(actor, %action, error = %err, "authorization denied");
        })
    }

    /// Checks for a live request, evicts an expired one, schedules decryption
    /// and registers the new pending entry.
    fn schedule(
        &mut self,
        actor: &str,
        target: TargetDescriptor,
        handles: &[CiphertextHandle],
    ) -> LedgerResult<RequestId> {
        let now = self.clock.now_ms();
        if let Some(live) = self.correlator.live_request_for(&target, now) {
            return Err(LedgerError::DecryptionPending {
                target: target.to_string(),
                request_id: live.request_id,
            });
        }
        for stale in self.correlator.expire_stale(now) {
            self.emit_expired(&stale);
        }

        let request_id = self.library.schedule_decryption(handles)?;
        if let Err(err) = self.correlator.register(request_id, target, actor, now).map(|_| ()) {
            warn!(%request_id, error = %err, "oracle reused a request id");
            self.library.cancel_decryption(request_id);
            return Err(err);
        }
        debug!(%request_id, %target, pending = self.correlator.len(), "pending request registered");
        Ok(request_id)
    }

    fn emit_expired(&mut self, pending: &PendingRequest) {
        info!(
            request_id = %pending.request_id,
            target = %pending.target,
            "decryption request expired"
        );
        self.emit(LedgerEvent::DecryptionRequestExpired {
            id: pending.target.record_id(),
            request_id: pending.request_id,
        });
    }

    fn emit(&mut self, event: LedgerEvent) {
        let now = self.clock.now_ms();
        let entry = self.journal.append(event, now);
        debug!(seq = entry.seq, event_type = entry.event.event_type(), "event appended");
    }
}
