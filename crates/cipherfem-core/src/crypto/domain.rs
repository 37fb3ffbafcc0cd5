//! Domain-separated signing.
//!
//! Each signed message type gets a unique prefix prepended to its canonical
//! bytes, so a signature over one message type never verifies as another.
//!
//! ```text
//! <PREFIX> || canonical_bytes(message)
//! ```

use super::sign::{Signature, Signer, SignerError, VerifyingKey, verify_signature};

/// Domain prefix for oracle decryption callbacks.
///
/// The signed body is `request_id (u64 BE) || encoded cleartexts`.
pub const DECRYPTION_CALLBACK_PREFIX: &[u8] = b"DECRYPTION_CALLBACK:";

/// Domain prefix used by the software oracle when deriving ciphertext
/// handles.
pub const HANDLE_DERIVATION_PREFIX: &[u8] = b"CIPHERTEXT_HANDLE:";

fn prefixed(domain_prefix: &[u8], canonical_bytes: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(domain_prefix.len() + canonical_bytes.len());
    message.extend_from_slice(domain_prefix);
    message.extend_from_slice(canonical_bytes);
    message
}

/// Signs `canonical_bytes` under `domain_prefix`.
#[must_use]
pub fn sign_with_domain(signer: &Signer, domain_prefix: &[u8], canonical_bytes: &[u8]) -> Signature {
    signer.sign(&prefixed(domain_prefix, canonical_bytes))
}

/// Verifies a signature produced by [`sign_with_domain`].
///
/// # Errors
///
/// Returns [`SignerError::VerificationFailed`] if the prefix, bytes or key
/// do not match.
pub fn verify_with_domain(
    verifying_key: &VerifyingKey,
    domain_prefix: &[u8],
    canonical_bytes: &[u8],
    signature: &Signature,
) -> Result<(), SignerError> {
    verify_signature(
        verifying_key,
        &prefixed(domain_prefix, canonical_bytes),
        signature,
    )
}
