//! Opaque identifiers shared by every table in the ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an encrypted record. Assigned from 1 upward, never reused.
pub type RecordId = u64;

/// Opaque reference to an encrypted numeric value.
///
/// The handle is produced by the external encryption library. The ledger
/// stores and forwards it but never interprets its bytes; whether a handle
/// counts as initialized is decided by
/// [`CiphertextLibrary::is_initialized`](crate::oracle::CiphertextLibrary::is_initialized).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// The all-zero handle, which libraries conventionally treat as unset.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps raw handle bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw handle bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({self})")
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough to tell handles apart in logs.
        write!(f, "{}..", hex::encode(&self.0[..8]))
    }
}

/// Request identifier issued by the decryption oracle.
///
/// The ledger does not control this value; it only uses it as the key of the
/// pending-request table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Big-endian encoding, as bound into callback signatures.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_is_truncated_hex() {
        let handle = CiphertextHandle::from_bytes([0xAB; 32]);
        assert_eq!(handle.to_string(), "abababababababab..");
    }

    #[test]
    fn test_request_id_serializes_as_number() {
        let json = serde_json::to_string(&RequestId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
