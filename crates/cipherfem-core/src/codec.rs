//! Cleartext payload encoding for oracle callbacks.
//!
//! A payload is a sequence of fields, each prefixed with its length as a
//! big-endian `u32`:
//!
//! ```text
//! len(f0) || f0 || len(f1) || f1 || ...
//! ```
//!
//! Record disclosures carry three UTF-8 fields (mesh, material, boundary
//! conditions). Result disclosures carry a single 8-byte big-endian `u64`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::RequestId;

/// Width of the length prefix in bytes.
const LEN_PREFIX: usize = 4;

/// Number of fields in a record disclosure payload.
pub const RECORD_FIELD_COUNT: usize = 3;

/// Errors from decoding a callback payload.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The payload ended in the middle of a length prefix or field.
    #[error("payload truncated at offset {offset}")]
    Truncated {
        /// Offset where more bytes were expected.
        offset: usize,
    },

    /// The payload holds a different number of fields than expected.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Fields expected.
        expected: usize,
        /// Fields found.
        found: usize,
    },

    /// A single field is longer than the configured limit.
    #[error("field {index} is {len} bytes, limit is {max}")]
    FieldTooLong {
        /// Field index.
        index: usize,
        /// Actual length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A text field is not valid UTF-8.
    #[error("field {index} is not valid UTF-8")]
    InvalidUtf8 {
        /// Field index.
        index: usize,
    },

    /// A scalar field is not exactly eight bytes.
    #[error("scalar field must be 8 bytes, got {len}")]
    ScalarWidth {
        /// Actual length.
        len: usize,
    },
}

/// Decoded cleartexts of a whole record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordCleartexts {
    /// Mesh description.
    pub mesh: String,
    /// Material properties.
    pub material: String,
    /// Boundary conditions.
    pub boundary: String,
}

/// Returns `true` if a field of `len` bytes fits the `u32` length prefix.
#[must_use]
pub fn field_len_fits(len: usize) -> bool {
    u32::try_from(len).is_ok()
}

/// Encodes a list of fields into a length-prefixed payload.
///
/// # Panics
///
/// Panics if a field exceeds `u32::MAX` bytes. Callers handling untrusted
/// sizes check [`field_len_fits`] first.
#[must_use]
pub fn encode_fields(fields: &[&[u8]]) -> Vec<u8> {
    let total = fields.iter().map(|f| f.len() + LEN_PREFIX).sum();
    let mut out = Vec::with_capacity(total);
    for field in fields {
        let len = u32::try_from(field.len()).expect("cleartext field exceeds u32::MAX bytes");
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Splits a payload into exactly `expected` fields, each at most `max_len`
/// bytes.
///
/// # Errors
///
/// Returns a [`CodecError`] for truncation, trailing fields, or oversized
/// fields.
pub fn decode_fields(bytes: &[u8], expected: usize, max_len: usize) -> Result<Vec<&[u8]>, CodecError> {
    let mut fields = Vec::with_capacity(expected);
    let mut offset = 0;

    while offset < bytes.len() {
        let prefix = bytes
            .get(offset..offset + LEN_PREFIX)
            .ok_or(CodecError::Truncated { offset })?;
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        // Saturate on narrow targets; the limit check below rejects it.
        let len = usize::try_from(u32::from_be_bytes(len_bytes)).unwrap_or(usize::MAX);
        offset += LEN_PREFIX;

        let index = fields.len();
        if len > max_len {
            return Err(CodecError::FieldTooLong { index, len, max: max_len });
        }
        let field = bytes
            .get(offset..offset + len)
            .ok_or(CodecError::Truncated { offset })?;
        fields.push(field);
        offset += len;
    }

    if fields.len() != expected {
        return Err(CodecError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Encodes record cleartexts.
#[must_use]
pub fn encode_record_cleartexts(cleartexts: &RecordCleartexts) -> Vec<u8> {
    encode_fields(&[
        cleartexts.mesh.as_bytes(),
        cleartexts.material.as_bytes(),
        cleartexts.boundary.as_bytes(),
    ])
}

/// Decodes record cleartexts.
///
/// # Errors
///
/// Returns a [`CodecError`] if the payload is not three UTF-8 fields within
/// `max_len`.
pub fn decode_record_cleartexts(bytes: &[u8], max_len: usize) -> Result<RecordCleartexts, CodecError> {
    let fields = decode_fields(bytes, RECORD_FIELD_COUNT, max_len)?;
    let text = |index: usize| {
        std::str::from_utf8(fields[index])
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8 { index })
    };
    Ok(RecordCleartexts {
        mesh: text(0)?,
        material: text(1)?,
        boundary: text(2)?,
    })
}

/// Encodes a single scalar result value.
#[must_use]
pub fn encode_scalar(value: u64) -> Vec<u8> {
    encode_fields(&[&value.to_be_bytes()])
}

/// Decodes a single scalar result value.
///
/// # Errors
///
/// Returns a [`CodecError`] if the payload is not one 8-byte field.
pub fn decode_scalar(bytes: &[u8]) -> Result<u64, CodecError> {
    let fields = decode_fields(bytes, 1, 8)?;
    let raw: [u8; 8] = fields[0]
        .try_into()
        .map_err(|_| CodecError::ScalarWidth { len: fields[0].len() })?;
    Ok(u64::from_be_bytes(raw))
}

/// Canonical bytes a callback proof signs: `request_id (u64 BE) || cleartexts`.
#[must_use]
pub fn callback_message(request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(8 + cleartexts.len());
    message.extend_from_slice(&request_id.to_be_bytes());
    message.extend_from_slice(cleartexts);
    message
}
