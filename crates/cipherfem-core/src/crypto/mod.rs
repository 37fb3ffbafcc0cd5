//! Cryptographic primitives for the disclosure ledger.
//!
//! - **Blake3 hashing**: content digests and the hash chain that links
//!   journal entries
//! - **Ed25519 signatures**: the oracle signs every decryption callback, and
//!   the ledger verifies the signature before trusting any cleartext
//! - **Domain separation**: callback signatures are bound to a fixed prefix
//!   so they cannot be replayed as signatures over other message types
//!
//! # Example
//!
//! ```rust
//! use cipherfem_core::crypto::{
//!     DECRYPTION_CALLBACK_PREFIX, Signer, sign_with_domain, verify_with_domain,
//! };
//!
//! let signer = Signer::generate();
//! let signature = sign_with_domain(&signer, DECRYPTION_CALLBACK_PREFIX, b"payload");
//!
//! assert!(
//!     verify_with_domain(
//!         &signer.verifying_key(),
//!         DECRYPTION_CALLBACK_PREFIX,
//!         b"payload",
//!         &signature,
//!     )
//!     .is_ok()
//! );
//! ```

mod domain;
mod hash;
mod sign;

pub use domain::{
    DECRYPTION_CALLBACK_PREFIX, HANDLE_DERIVATION_PREFIX, sign_with_domain, verify_with_domain,
};
pub use hash::{EventHasher, HASH_SIZE, Hash, HashChainError};
pub use sign::{
    PUBLIC_KEY_SIZE, SIGNATURE_SIZE, Signature, Signer, SignerError, VerifyingKey,
    keys_equal, parse_signature, parse_verifying_key, verify_signature,
};
