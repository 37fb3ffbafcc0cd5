//! In-process decryption oracle.
//!
//! Stands in for an external threshold-decryption network. "Encryption"
//! here only hides the plaintext behind a random-looking handle; the point is
//! to exercise the request/callback protocol, not to provide secrecy.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{CallbackVerifier, CiphertextLibrary, DecryptionCallback, OracleError};
use crate::codec::{callback_message, encode_fields, field_len_fits};
use crate::crypto::{
    DECRYPTION_CALLBACK_PREFIX, EventHasher, HANDLE_DERIVATION_PREFIX, Signer, VerifyingKey,
    sign_with_domain,
};
use crate::handle::{CiphertextHandle, RequestId};

/// A value held behind a ciphertext handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plaintext {
    /// Free-form text, used for record payloads.
    Text(String),
    /// Unsigned scalar, used for analysis results.
    Scalar(u64),
}

impl Plaintext {
    fn to_field_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::Scalar(value) => value.to_be_bytes().to_vec(),
        }
    }
}

/// Software implementation of [`CiphertextLibrary`].
#[derive(Debug)]
pub struct SoftwareOracle {
    signer: Signer,
    verifier: CallbackVerifier,
    plaintexts: HashMap<CiphertextHandle, Plaintext>,
    scheduled: BTreeMap<RequestId, Vec<CiphertextHandle>>,
    next_request_id: u64,
    handle_nonce: u64,
}

impl SoftwareOracle {
    /// Creates an oracle that signs callbacks with `signer`.
    #[must_use]
    pub fn new(signer: Signer) -> Self {
        let verifier = CallbackVerifier::new(signer.verifying_key());
        Self {
            signer,
            verifier,
            plaintexts: HashMap::new(),
            scheduled: BTreeMap::new(),
            next_request_id: 1,
            handle_nonce: 0,
        }
    }

    /// Creates an oracle with a freshly generated key.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Signer::generate())
    }

    /// Starts request-id allocation at `base`.
    ///
    /// Lets tests place request ids far from record ids so the two cannot be
    /// confused.
    #[must_use]
    pub const fn with_request_id_base(mut self, base: u64) -> Self {
        self.next_request_id = base;
        self
    }

    /// Public key callbacks are signed with.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.verifier.key()
    }

    /// Encrypts a text value and returns its handle.
    pub fn encrypt_text(&mut self, text: impl Into<String>) -> CiphertextHandle {
        self.encrypt(Plaintext::Text(text.into()))
    }

    /// Encrypts a scalar value and returns its handle.
    pub fn encrypt_scalar(&mut self, value: u64) -> CiphertextHandle {
        self.encrypt(Plaintext::Scalar(value))
    }

    fn encrypt(&mut self, plaintext: Plaintext) -> CiphertextHandle {
        self.handle_nonce += 1;
        let mut preimage = HANDLE_DERIVATION_PREFIX.to_vec();
        preimage.extend_from_slice(&self.handle_nonce.to_be_bytes());
        preimage.extend_from_slice(&self.verifying_key().to_bytes());
        let handle = CiphertextHandle::from_bytes(EventHasher::hash_content(&preimage));
        self.plaintexts.insert(handle, plaintext);
        handle
    }

    /// Request ids scheduled but not yet fulfilled, in ascending order.
    #[must_use]
    pub fn scheduled_requests(&self) -> Vec<RequestId> {
        self.scheduled.keys().copied().collect()
    }

    /// Performs the scheduled decryption and produces the signed callback.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::NotScheduled`] if `request_id` is unknown or was
    /// already fulfilled.
    pub fn fulfill(&mut self, request_id: RequestId) -> Result<DecryptionCallback, OracleError> {
        let handles = self
            .scheduled
            .remove(&request_id)
            .ok_or(OracleError::NotScheduled { request_id })?;

        let fields: Vec<Vec<u8>> = handles
            .iter()
            .map(|handle| {
                self.plaintexts
                    .get(handle)
                    .map(Plaintext::to_field_bytes)
                    .ok_or(OracleError::UnknownHandle { handle: *handle })
            })
            .collect::<Result<_, _>>()?;
        if let Some((handle, field)) = handles
            .iter()
            .zip(&fields)
            .find(|(_, field)| !field_len_fits(field.len()))
        {
            return Err(OracleError::PlaintextTooLarge {
                handle: *handle,
                len: field.len(),
            });
        }
        let borrowed: Vec<&[u8]> = fields.iter().map(Vec::as_slice).collect();
        let cleartexts = encode_fields(&borrowed);

        let proof = self.sign_callback(request_id, &cleartexts);
        debug!(%request_id, fields = fields.len(), "oracle fulfilled decryption");

        Ok(DecryptionCallback {
            request_id,
            cleartexts,
            proof,
        })
    }

    /// Signs an arbitrary payload for `request_id`.
    ///
    /// Useful for building callbacks whose cleartexts differ from what the
    /// handles hold, e.g. to test malformed-payload handling.
    #[must_use]
    pub fn sign_callback(&self, request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
        sign_with_domain(
            &self.signer,
            DECRYPTION_CALLBACK_PREFIX,
            &callback_message(request_id, cleartexts),
        )
        .to_bytes()
        .to_vec()
    }
}

impl CiphertextLibrary for SoftwareOracle {
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
        *handle != CiphertextHandle::ZERO && self.plaintexts.contains_key(handle)
    }

    fn schedule_decryption(
        &mut self,
        handles: &[CiphertextHandle],
    ) -> Result<RequestId, OracleError> {
        if handles.is_empty() {
            return Err(OracleError::EmptyBatch);
        }
        if let Some(unknown) = handles.iter().find(|h| !self.plaintexts.contains_key(*h)) {
            return Err(OracleError::UnknownHandle { handle: *unknown });
        }

        let request_id = RequestId(self.next_request_id);
        self.next_request_id = self
            .next_request_id
            .checked_add(1)
            .ok_or(OracleError::RequestIdsExhausted)?;
        self.scheduled.insert(request_id, handles.to_vec());
        debug!(%request_id, handles = handles.len(), "oracle scheduled decryption");
        Ok(request_id)
    }

    fn cancel_decryption(&mut self, request_id: RequestId) {
        if self.scheduled.remove(&request_id).is_some() {
            debug!(%request_id, "oracle dropped scheduled decryption");
        }
    }

    fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        self.verifier.verify(request_id, cleartexts, proof)
    }

    fn oracle_key(&self) -> Option<VerifyingKey> {
        Some(self.verifying_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_fields, decode_scalar};

    #[test]
    fn test_handles_are_unique_and_initialized() {
        let mut oracle = SoftwareOracle::generate();
        let a = oracle.encrypt_text("same");
        let b = oracle.encrypt_text("same");
        assert_ne!(a, b);
        assert!(oracle.is_initialized(&a));
        assert!(!oracle.is_initialized(&CiphertextHandle::ZERO));
        assert!(!oracle.is_initialized(&CiphertextHandle::from_bytes([3u8; 32])));
    }

    #[test]
    fn test_schedule_and_fulfill() {
        let mut oracle = SoftwareOracle::generate().with_request_id_base(1000);
        let mesh = oracle.encrypt_text("mesh");
        let load = oracle.encrypt_scalar(77);

        let request_id = oracle.schedule_decryption(&[mesh, load]).unwrap();
        assert_eq!(request_id, RequestId(1000));
        assert_eq!(oracle.scheduled_requests(), vec![RequestId(1000)]);

        let callback = oracle.fulfill(request_id).unwrap();
        assert!(oracle.verify(request_id, &callback.cleartexts, &callback.proof));

        let fields = decode_fields(&callback.cleartexts, 2, 64).unwrap();
        assert_eq!(fields[0], b"mesh");
        assert!(oracle.scheduled_requests().is_empty());
    }

    #[test]
    fn test_scalar_callback_decodes() {
        let mut oracle = SoftwareOracle::generate();
        let stress = oracle.encrypt_scalar(123_456);
        let request_id = oracle.schedule_decryption(&[stress]).unwrap();
        let callback = oracle.fulfill(request_id).unwrap();
        assert_eq!(decode_scalar(&callback.cleartexts).unwrap(), 123_456);
    }

    #[test]
    fn test_fulfill_twice_fails() {
        let mut oracle = SoftwareOracle::generate();
        let h = oracle.encrypt_scalar(1);
        let request_id = oracle.schedule_decryption(&[h]).unwrap();
        oracle.fulfill(request_id).unwrap();
        assert_eq!(
            oracle.fulfill(request_id),
            Err(OracleError::NotScheduled { request_id })
        );
    }

    #[test]
    fn test_cancel_drops_scheduled_request() {
        let mut oracle = SoftwareOracle::generate();
        let h = oracle.encrypt_scalar(5);
        let request_id = oracle.schedule_decryption(&[h]).unwrap();
        oracle.cancel_decryption(request_id);
        assert!(oracle.scheduled_requests().is_empty());
        assert_eq!(
            oracle.fulfill(request_id),
            Err(OracleError::NotScheduled { request_id })
        );
        // Unknown ids are ignored.
        oracle.cancel_decryption(RequestId(999));
    }

    #[test]
    fn test_schedule_rejects_unknown_and_empty() {
        let mut oracle = SoftwareOracle::generate();
        assert_eq!(oracle.schedule_decryption(&[]), Err(OracleError::EmptyBatch));
        let foreign = CiphertextHandle::from_bytes([9u8; 32]);
        assert_eq!(
            oracle.schedule_decryption(&[foreign]),
            Err(OracleError::UnknownHandle { handle: foreign })
        );
    }

    #[test]
    fn test_other_oracle_cannot_forge() {
        let honest = SoftwareOracle::generate();
        let forger = SoftwareOracle::generate();
        let proof = forger.sign_callback(RequestId(1), b"x");
        assert!(!honest.verify(RequestId(1), b"x", &proof));
    }
}
