//! Blake3 hashing and hash-chain primitives for the event journal.

use thiserror::Error;

/// Size of a Blake3 hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Type alias for a 32-byte hash.
pub type Hash = [u8; HASH_SIZE];

/// Errors that can occur while verifying the journal hash chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashChainError {
    /// An entry's previous hash does not match the preceding entry.
    #[error("hash chain broken at sequence {seq}: expected {expected}, got {actual}")]
    ChainBroken {
        /// Sequence number of the offending entry.
        seq: u64,
        /// The expected previous hash.
        expected: String,
        /// The previous hash found in the entry.
        actual: String,
    },

    /// An entry's stored hash does not match its recomputed hash.
    #[error("entry hash mismatch at sequence {seq}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Sequence number of the offending entry.
        seq: u64,
        /// The stored hash.
        expected: String,
        /// The recomputed hash.
        actual: String,
    },
}

/// Hasher for journal entries.
///
/// Each entry hash covers `prev_hash || content`, so tampering with any
/// historical entry breaks every link after it.
pub struct EventHasher;

impl EventHasher {
    /// The previous hash recorded by the first journal entry.
    pub const GENESIS_PREV_HASH: Hash = [0u8; HASH_SIZE];

    /// Hashes entry content chained to the previous entry hash.
    #[must_use]
    pub fn hash_event(content: &[u8], prev_hash: &Hash) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(prev_hash);
        hasher.update(content);
        *hasher.finalize().as_bytes()
    }

    /// Hashes raw content without chain linking.
    #[must_use]
    pub fn hash_content(content: &[u8]) -> Hash {
        *blake3::hash(content).as_bytes()
    }

    /// Verifies a full chain of `(seq, content, prev_hash, entry_hash)`
    /// tuples starting from genesis.
    ///
    /// # Errors
    ///
    /// Returns the first broken link or hash mismatch.
    pub fn verify_chain<'a>(
        entries: impl IntoIterator<Item = (u64, &'a [u8], &'a Hash, &'a Hash)>,
    ) -> Result<(), HashChainError> {
        let mut expected_prev = Self::GENESIS_PREV_HASH;

        for (seq, content, prev_hash, entry_hash) in entries {
            if *prev_hash != expected_prev {
                return Err(HashChainError::ChainBroken {
                    seq,
                    expected: hex::encode(expected_prev),
                    actual: hex::encode(prev_hash),
                });
            }

            let computed = Self::hash_event(content, prev_hash);
            if computed != *entry_hash {
                return Err(HashChainError::HashMismatch {
                    seq,
                    expected: hex::encode(entry_hash),
                    actual: hex::encode(computed),
                });
            }

            expected_prev = *entry_hash;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content_deterministic() {
        let a = EventHasher::hash_content(b"mesh");
        assert_eq!(a, EventHasher::hash_content(b"mesh"));
        assert_ne!(a, EventHasher::hash_content(b"material"));
    }

    #[test]
    fn test_prev_hash_changes_entry_hash() {
        let a = EventHasher::hash_event(b"entry", &[1u8; HASH_SIZE]);
        let b = EventHasher::hash_event(b"entry", &[2u8; HASH_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_chain_accepts_linked_entries() {
        let first = EventHasher::hash_event(b"one", &EventHasher::GENESIS_PREV_HASH);
        let second = EventHasher::hash_event(b"two", &first);

        let entries = [
            (1, &b"one"[..], &EventHasher::GENESIS_PREV_HASH, &first),
            (2, &b"two"[..], &first, &second),
        ];
        assert!(EventHasher::verify_chain(entries).is_ok());
    }

    #[test]
    fn test_verify_chain_detects_tampered_content() {
        let first = EventHasher::hash_event(b"one", &EventHasher::GENESIS_PREV_HASH);
        let entries = [(1, &b"uno"[..], &EventHasher::GENESIS_PREV_HASH, &first)];

        let result = EventHasher::verify_chain(entries);
        assert!(matches!(result, Err(HashChainError::HashMismatch { seq: 1, .. })));
    }

    #[test]
    fn test_verify_chain_detects_broken_link() {
        let first = EventHasher::hash_event(b"one", &EventHasher::GENESIS_PREV_HASH);
        let bogus_prev = [9u8; HASH_SIZE];
        let second = EventHasher::hash_event(b"two", &bogus_prev);

        let entries = [
            (1, &b"one"[..], &EventHasher::GENESIS_PREV_HASH, &first),
            (2, &b"two"[..], &bogus_prev, &second),
        ];
        let result = EventHasher::verify_chain(entries);
        assert!(matches!(result, Err(HashChainError::ChainBroken { seq: 2, .. })));
    }
}
