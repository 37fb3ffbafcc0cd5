//! Error taxonomy for ledger operations.
//!
//! Every variant is returned synchronously at the operation boundary and is
//! never retried internally. Verification and unknown-request failures are
//! raised before any table is touched.

use thiserror::Error;

use crate::codec::CodecError;
use crate::handle::{RecordId, RequestId};
use crate::oracle::OracleError;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by [`ConfidentialLedger`](crate::ledger::ConfidentialLedger)
/// operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// No record (or no submitted result) exists for this id.
    #[error("{what} not found for record {id}")]
    NotFound {
        /// Which table was consulted ("record" or "result").
        what: &'static str,
        /// The record id.
        id: RecordId,
    },

    /// The record or result field has already been disclosed.
    #[error("{target} has already been revealed")]
    AlreadyRevealed {
        /// Human-readable target description.
        target: String,
    },

    /// The result field selector is outside the enumerated set.
    #[error("invalid result field selector: {value}")]
    InvalidField {
        /// The rejected selector.
        value: u64,
    },

    /// The callback references a request id with no live pending entry.
    #[error("no pending decryption request for {request_id}")]
    UnknownRequest {
        /// The unmatched request id.
        request_id: RequestId,
    },

    /// The callback proof did not authenticate its cleartexts.
    #[error("decryption proof verification failed for {request_id}")]
    VerificationFailed {
        /// The request id named by the callback.
        request_id: RequestId,
    },

    /// The actor is not allowed to perform this action.
    #[error("actor {actor} is not authorized to {action}")]
    Unauthorized {
        /// The rejected actor.
        actor: String,
        /// Description of the attempted action.
        action: String,
    },

    /// A live decryption request already exists for this target.
    #[error("{target} already has a pending decryption request {request_id}")]
    DecryptionPending {
        /// Human-readable target description.
        target: String,
        /// The live request.
        request_id: RequestId,
    },

    /// The oracle issued a request id that is already pending.
    #[error("oracle issued duplicate request id {request_id}")]
    DuplicateRequestId {
        /// The colliding request id.
        request_id: RequestId,
    },

    /// The callback was delivered to the handler for the wrong target kind.
    #[error("request {request_id} targets a {actual}, not a {expected}")]
    TargetMismatch {
        /// The request id.
        request_id: RequestId,
        /// Target kind the handler expected.
        expected: &'static str,
        /// Target kind the pending entry holds.
        actual: &'static str,
    },

    /// The verified cleartext payload could not be decoded.
    #[error("malformed cleartext for {request_id}: {source}")]
    MalformedCleartext {
        /// The request id.
        request_id: RequestId,
        /// Decoder error.
        #[source]
        source: CodecError,
    },

    /// No further record ids can be allocated.
    #[error("record id space exhausted")]
    IdSpaceExhausted,

    /// The decryption library refused to schedule a request.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
}

impl LedgerError {
    /// Returns `true` for errors that indicate replay or forgery attempts.
    ///
    /// These are logged at `warn` by the ledger.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::UnknownRequest { .. }
                | Self::VerificationFailed { .. }
                | Self::Unauthorized { .. }
                | Self::DuplicateRequestId { .. }
        )
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyRevealed { .. } => "already_revealed",
            Self::InvalidField { .. } => "invalid_field",
            Self::UnknownRequest { .. } => "unknown_request",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::DecryptionPending { .. } => "decryption_pending",
            Self::DuplicateRequestId { .. } => "duplicate_request_id",
            Self::TargetMismatch { .. } => "target_mismatch",
            Self::MalformedCleartext { .. } => "malformed_cleartext",
            Self::IdSpaceExhausted => "id_space_exhausted",
            Self::Oracle(_) => "oracle_error",
        }
    }
}
