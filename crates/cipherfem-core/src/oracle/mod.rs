//! Contract with the external decryption library.
//!
//! The ledger never decrypts anything itself. It hands ciphertext handles to
//! a [`CiphertextLibrary`], receives an opaque [`RequestId`], and later
//! accepts a [`DecryptionCallback`] carrying cleartexts plus a proof that the
//! library can check.
//!
//! ```text
//! schedule_decryption(handles) --> RequestId
//!            ...off-protocol decryption...
//! callback(RequestId, cleartexts, proof) --> verify() --> ledger
//! ```
//!
//! [`SoftwareOracle`] is an in-process implementation that signs callbacks
//! with Ed25519. It backs the tests and the CLI demo.

mod software;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use software::{Plaintext, SoftwareOracle};

use crate::codec::callback_message;
use crate::crypto::{
    DECRYPTION_CALLBACK_PREFIX, VerifyingKey, parse_signature, verify_with_domain,
};
use crate::handle::{CiphertextHandle, RequestId};

/// Errors reported by a decryption library.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OracleError {
    /// A handle passed for decryption is unknown to the library.
    #[error("unknown ciphertext handle {handle}")]
    UnknownHandle {
        /// The unrecognized handle.
        handle: CiphertextHandle,
    },

    /// Decryption was requested for an empty handle list.
    #[error("no handles to decrypt")]
    EmptyBatch,

    /// The library has no scheduled decryption under this id.
    #[error("no scheduled decryption for {request_id}")]
    NotScheduled {
        /// The request id.
        request_id: RequestId,
    },

    /// The library ran out of request ids.
    #[error("request id space exhausted")]
    RequestIdsExhausted,

    /// A plaintext is too large for one length-prefixed cleartext field.
    #[error("plaintext behind {handle} is {len} bytes, too large for a cleartext field")]
    PlaintextTooLarge {
        /// The offending handle.
        handle: CiphertextHandle,
        /// Plaintext length in bytes.
        len: usize,
    },
}

/// Operations the ledger needs from the encryption/decryption library.
pub trait CiphertextLibrary: Send {
    /// Returns `true` if `handle` refers to an initialized ciphertext.
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool;

    /// Schedules off-protocol decryption of `handles` and returns the id the
    /// eventual callback will carry.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if the request cannot be scheduled.
    fn schedule_decryption(&mut self, handles: &[CiphertextHandle])
    -> Result<RequestId, OracleError>;

    /// Returns `true` if `proof` authenticates `cleartexts` for `request_id`.
    fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool;

    /// Drops the most recent decryption scheduled under `request_id`.
    ///
    /// The ledger calls this when it refuses an id that
    /// [`schedule_decryption`](Self::schedule_decryption) just returned, so
    /// the library does not keep work nobody will collect.
    fn cancel_decryption(&mut self, request_id: RequestId) {
        let _ = request_id;
    }

    /// Public key the library signs callbacks with, if it exposes one.
    fn oracle_key(&self) -> Option<VerifyingKey> {
        None
    }
}

/// Payload of an oracle callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCallback {
    /// Request id issued by [`CiphertextLibrary::schedule_decryption`].
    pub request_id: RequestId,
    /// Length-prefixed cleartext payload (see [`crate::codec`]).
    pub cleartexts: Vec<u8>,
    /// Proof over `request_id || cleartexts`.
    pub proof: Vec<u8>,
}

/// Checks Ed25519 callback proofs against a pinned oracle key.
///
/// Malformed proofs count as failed verification.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    key: VerifyingKey,
}

impl CallbackVerifier {
    /// Creates a verifier for callbacks signed by `key`.
    #[must_use]
    pub const fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Returns the pinned key.
    #[must_use]
    pub const fn key(&self) -> &VerifyingKey {
        &self.key
    }

    /// Verifies `proof` over the domain-separated callback message.
    #[must_use]
    pub fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        let Ok(signature) = parse_signature(proof) else {
            return false;
        };
        verify_with_domain(
            &self.key,
            DECRYPTION_CALLBACK_PREFIX,
            &callback_message(request_id, cleartexts),
            &signature,
        )
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Signer, sign_with_domain};

    fn signed(signer: &Signer, request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
        sign_with_domain(
            signer,
            DECRYPTION_CALLBACK_PREFIX,
            &callback_message(request_id, cleartexts),
        )
        .to_bytes()
        .to_vec()
    }

    #[test]
    fn test_callback_verifier_accepts_valid_proof() {
        let signer = Signer::generate();
        let verifier = CallbackVerifier::new(signer.verifying_key());
        let proof = signed(&signer, RequestId(5), b"payload");
        assert!(verifier.verify(RequestId(5), b"payload", &proof));
    }

    #[test]
    fn test_callback_verifier_exposes_key() {
        let signer = Signer::generate();
        let verifier = CallbackVerifier::new(signer.verifying_key());
        assert_eq!(verifier.key(), &signer.verifying_key());
        assert_ne!(verifier.key(), &Signer::generate().verifying_key());
    }

    #[test]
    fn test_callback_verifier_binds_request_id() {
        let signer = Signer::generate();
        let verifier = CallbackVerifier::new(signer.verifying_key());
        let proof = signed(&signer, RequestId(5), b"payload");
        assert!(!verifier.verify(RequestId(6), b"payload", &proof));
    }

    #[test]
    fn test_callback_verifier_rejects_malformed_proof() {
        let signer = Signer::generate();
        let verifier = CallbackVerifier::new(signer.verifying_key());
        assert!(!verifier.verify(RequestId(5), b"payload", &[0u8; 12]));
        assert!(!verifier.verify(RequestId(5), b"payload", &[]));
    }
}
