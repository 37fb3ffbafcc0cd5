//! Oracle callback handling.
//!
//! Every callback runs the same steps in the same order:
//!
//! 1. check the proof (nothing is touched on failure)
//! 2. look the request id up without consuming it
//! 3. check the target kind and decode the cleartexts
//! 4. consume the pending entry
//! 5. write the disclosure and emit the event
//!
//! Steps 1-3 leave the pending entry in place, so a forged or garbled
//! callback cannot burn a request the genuine oracle is still answering.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ConfidentialLedger;
use crate::codec::{decode_record_cleartexts, decode_scalar};
use crate::correlator::{PendingRequest, TargetDescriptor};
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::handle::RecordId;
use crate::oracle::{CiphertextLibrary, DecryptionCallback};
use crate::results::ResultField;

/// What a delivered callback disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disclosure {
    /// A whole record.
    Record {
        /// Record id.
        id: RecordId,
    },
    /// One result field.
    ResultField {
        /// Record id.
        id: RecordId,
        /// Output field.
        field: ResultField,
        /// Disclosed value.
        value: u64,
    },
}

impl<L: CiphertextLibrary> ConfidentialLedger<L> {
    /// Accepts the oracle's answer to a record decryption request.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::VerificationFailed`] if the proof does not check
    /// - [`LedgerError::UnknownRequest`] if the id is not pending (never
    ///   issued, already answered, or expired)
    /// - [`LedgerError::TargetMismatch`] if the id targets a result field
    /// - [`LedgerError::MalformedCleartext`] if the payload is not three
    ///   UTF-8 strings
    /// - [`LedgerError::AlreadyRevealed`] if the record was disclosed by
    ///   another request
    pub fn on_record_decrypted(&mut self, callback: &DecryptionCallback) -> LedgerResult<RecordId> {
        let request_id = callback.request_id;
        let pending = self.authenticate(callback)?;
        let TargetDescriptor::Record { id } = pending.target else {
            return Err(rejected(LedgerError::TargetMismatch {
                request_id,
                expected: "record",
                actual: pending.target.kind(),
            }));
        };

        let cleartexts = decode_record_cleartexts(&callback.cleartexts, self.max_cleartext_len)
            .map_err(|source| rejected(LedgerError::MalformedCleartext { request_id, source }))?;

        self.correlator.resolve(request_id)?;
        let now = self.clock.now_ms();
        self.records
            .reveal(id, cleartexts, request_id, now)
            .map_err(rejected)?;

        info!(record_id = id, %request_id, "record disclosed");
        self.emit(LedgerEvent::RecordDisclosed { id, request_id });
        Ok(id)
    }

    /// Accepts the oracle's answer to a result-field decryption request.
    ///
    /// Returns the disclosed `(id, field, value)`.
    ///
    /// # Errors
    ///
    /// As [`on_record_decrypted`](Self::on_record_decrypted), with
    /// [`LedgerError::TargetMismatch`] when the id targets a whole record and
    /// [`LedgerError::MalformedCleartext`] when the payload is not one
    /// 8-byte scalar.
    pub fn on_result_decrypted(
        &mut self,
        callback: &DecryptionCallback,
    ) -> LedgerResult<(RecordId, ResultField, u64)> {
        let request_id = callback.request_id;
        let pending = self.authenticate(callback)?;
        let TargetDescriptor::ResultField { id, field } = pending.target else {
            return Err(rejected(LedgerError::TargetMismatch {
                request_id,
                expected: "result field",
                actual: pending.target.kind(),
            }));
        };

        let value = decode_scalar(&callback.cleartexts)
            .map_err(|source| rejected(LedgerError::MalformedCleartext { request_id, source }))?;

        self.correlator.resolve(request_id)?;
        let now = self.clock.now_ms();
        self.results
            .reveal(id, field, value, request_id, now)
            .map_err(rejected)?;

        info!(record_id = id, %field, value, %request_id, "result disclosed");
        self.emit(LedgerEvent::ResultDisclosed {
            id,
            field,
            value,
            request_id,
        });
        Ok((id, field, value))
    }

    /// Routes a callback to the matching handler by looking up its target.
    ///
    /// For oracles that deliver every answer through one channel.
    ///
    /// # Errors
    ///
    /// Whatever the selected handler returns.
    pub fn deliver_callback(&mut self, callback: &DecryptionCallback) -> LedgerResult<Disclosure> {
        let request_id = callback.request_id;
        let target = self
            .correlator
            .peek(request_id, self.clock.now_ms())
            .map(|p| p.target);
        match target {
            Ok(TargetDescriptor::Record { .. }) => {
                self.on_record_decrypted(callback).map(|id| Disclosure::Record { id })
            },
            Ok(TargetDescriptor::ResultField { .. }) => self
                .on_result_decrypted(callback)
                .map(|(id, field, value)| Disclosure::ResultField { id, field, value }),
            // Forged proofs are reported as such even for unknown ids.
            Err(err) => Err(self.authenticate(callback).err().unwrap_or(err)),
        }
    }

    /// Verifies the proof, then finds the live pending entry.
    fn authenticate(&self, callback: &DecryptionCallback) -> LedgerResult<PendingRequest> {
        let request_id = callback.request_id;
        if !self
            .library
            .verify(request_id, &callback.cleartexts, &callback.proof)
        {
            return Err(rejected(LedgerError::VerificationFailed { request_id }));
        }
        self.correlator
            .peek(request_id, self.clock.now_ms())
            .cloned()
            .map_err(rejected)
    }
}

fn rejected(err: LedgerError) -> LedgerError {
    if err.is_suspicious() {
        warn!(code = err.code(), error = %err, "callback rejected");
    } else {
        info!(code = err.code(), error = %err, "callback rejected");
    }
    err
}
