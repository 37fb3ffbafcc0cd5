//! Ed25519 signing and verification.

use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Ed25519 signature type.
pub type Signature = ed25519_dalek::Signature;

/// Ed25519 public key type.
pub type VerifyingKey = ed25519_dalek::VerifyingKey;

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Errors from signature parsing and verification.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignerError {
    /// The signature bytes have the wrong length.
    #[error("invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),

    /// The public key bytes have the wrong length.
    #[error("invalid public key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    /// The public key bytes are not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The signature does not verify for the message and key.
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Holds an Ed25519 signing key.
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Generates a fresh keypair from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Builds a signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Returns the 32-byte secret seed.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Returns the public half of the keypair.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("verifying_key", &hex::encode(self.verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Verifies `signature` over `message` with strict Ed25519 rules.
///
/// # Errors
///
/// Returns [`SignerError::VerificationFailed`] if the signature is invalid.
pub fn verify_signature(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignerError> {
    verifying_key
        .verify_strict(message, signature)
        .map_err(|_| SignerError::VerificationFailed)
}

/// Parses a 64-byte signature.
///
/// # Errors
///
/// Returns [`SignerError::InvalidSignatureLength`] on a length mismatch.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, SignerError> {
    let arr: [u8; SIGNATURE_SIZE] = bytes
        .try_into()
        .map_err(|_| SignerError::InvalidSignatureLength(bytes.len()))?;
    Ok(Signature::from_bytes(&arr))
}

/// Parses a 32-byte public key.
///
/// # Errors
///
/// Returns an error if the length is wrong or the point is invalid.
pub fn parse_verifying_key(bytes: &[u8]) -> Result<VerifyingKey, SignerError> {
    let arr: [u8; PUBLIC_KEY_SIZE] = bytes
        .try_into()
        .map_err(|_| SignerError::InvalidKeyLength(bytes.len()))?;
    VerifyingKey::from_bytes(&arr).map_err(|e| SignerError::InvalidKey(e.to_string()))
}

/// Compares two public keys in constant time.
#[must_use]
pub fn keys_equal(a: &VerifyingKey, b: &VerifyingKey) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
