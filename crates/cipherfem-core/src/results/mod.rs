//! Analysis result store.
//!
//! A computation stage submits three output handles per record. Each output
//! field can then be disclosed independently; a disclosed value is written
//! once and never overwritten, even if the result itself is resubmitted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::handle::{CiphertextHandle, RecordId, RequestId};
use crate::oracle::CiphertextLibrary;

/// Output field of an analysis result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResultField {
    /// Stress field.
    Stress = 0,
    /// Displacement field.
    Displacement = 1,
    /// Temperature field.
    Temperature = 2,
}

impl ResultField {
    /// All fields in selector order.
    pub const ALL: [Self; 3] = [Self::Stress, Self::Displacement, Self::Temperature];

    /// Numeric selector of this field.
    #[must_use]
    pub const fn index(self) -> u64 {
        self as u64
    }

    /// Parses a numeric selector.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidField`] for selectors outside `0..=2`.
    pub fn from_index(value: u64) -> LedgerResult<Self> {
        match value {
            0 => Ok(Self::Stress),
            1 => Ok(Self::Displacement),
            2 => Ok(Self::Temperature),
            _ => Err(LedgerError::InvalidField { value }),
        }
    }

    /// Lowercase name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::Displacement => "displacement",
            Self::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ResultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown result field '{s}'"))
    }
}

/// Encrypted outputs of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Encrypted stress.
    pub stress: CiphertextHandle,
    /// Encrypted displacement.
    pub displacement: CiphertextHandle,
    /// Encrypted temperature.
    pub temperature: CiphertextHandle,
    /// Actor that submitted the result.
    pub submitted_by: String,
    /// Submission time.
    pub submitted_at_ms: u64,
}

impl AnalysisResult {
    /// Handle of one output field.
    #[must_use]
    pub const fn handle(&self, field: ResultField) -> CiphertextHandle {
        match field {
            ResultField::Stress => self.stress,
            ResultField::Displacement => self.displacement,
            ResultField::Temperature => self.temperature,
        }
    }
}

/// A disclosed result value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedResultField {
    /// Decrypted scalar.
    pub value: u64,
    /// Disclosure time.
    pub revealed_at_ms: u64,
    /// Request whose callback disclosed the value.
    pub revealed_by: RequestId,
}

/// Result and disclosed-result tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultStore {
    results: BTreeMap<RecordId, AnalysisResult>,
    disclosed: BTreeMap<RecordId, BTreeMap<ResultField, DisclosedResultField>>,
}

impl ResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records with a submitted result.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no results have been submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Creates or replaces the result for `id`.
    pub fn submit(&mut self, id: RecordId, result: AnalysisResult) {
        self.results.insert(id, result);
    }

    /// Returns `true` once the stress handle is initialized.
    ///
    /// The stress field is the readiness signal; the other two are submitted
    /// in the same call.
    #[must_use]
    pub fn has_result<L: CiphertextLibrary + ?Sized>(&self, id: RecordId, library: &L) -> bool {
        self.results
            .get(&id)
            .is_some_and(|result| library.is_initialized(&result.stress))
    }

    /// Looks up the result for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if none was submitted.
    pub fn get(&self, id: RecordId) -> LedgerResult<&AnalysisResult> {
        self.results
            .get(&id)
            .ok_or(LedgerError::NotFound { what: "result", id })
    }

    /// Returns the disclosed value of a field, if any.
    #[must_use]
    pub fn disclosed(&self, id: RecordId, field: ResultField) -> Option<&DisclosedResultField> {
        self.disclosed.get(&id).and_then(|fields| fields.get(&field))
    }

    /// Number of disclosed result fields across all records.
    #[must_use]
    pub fn disclosed_count(&self) -> usize {
        self.disclosed.values().map(BTreeMap::len).sum()
    }

    /// Writes a disclosed value exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyRevealed`] if the field was already
    /// disclosed.
    pub fn reveal(
        &mut self,
        id: RecordId,
        field: ResultField,
        value: u64,
        request_id: RequestId,
        now_ms: u64,
    ) -> LedgerResult<()> {
        let fields = self.disclosed.entry(id).or_default();
        if fields.contains_key(&field) {
            return Err(LedgerError::AlreadyRevealed {
                target: format!("{field} of record {id}"),
            });
        }
        fields.insert(
            field,
            DisclosedResultField {
                value,
                revealed_at_ms: now_ms,
                revealed_by: request_id,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SoftwareOracle;

    fn result(oracle: &mut SoftwareOracle) -> AnalysisResult {
        AnalysisResult {
            stress: oracle.encrypt_scalar(250),
            displacement: oracle.encrypt_scalar(3),
            temperature: oracle.encrypt_scalar(293),
            submitted_by: "solver".into(),
            submitted_at_ms: 5,
        }
    }

    #[test]
    fn test_field_selectors() {
        for field in ResultField::ALL {
            assert_eq!(ResultField::from_index(field.index()).unwrap(), field);
        }
        assert!(matches!(
            ResultField::from_index(3),
            Err(LedgerError::InvalidField { value: 3 })
        ));
        assert_eq!("Temperature".parse::<ResultField>().unwrap(), ResultField::Temperature);
        assert!("strain".parse::<ResultField>().is_err());
    }

    #[test]
    fn test_has_result_tracks_stress_initialization() {
        let mut oracle = SoftwareOracle::generate();
        let mut store = ResultStore::new();
        assert!(!store.has_result(1, &oracle));

        let mut uninitialized = result(&mut oracle);
        uninitialized.stress = CiphertextHandle::ZERO;
        store.submit(1, uninitialized);
        assert!(!store.has_result(1, &oracle));

        store.submit(1, result(&mut oracle));
        assert!(store.has_result(1, &oracle));
    }

    #[test]
    fn test_reveal_is_write_once_per_field() {
        let mut store = ResultStore::new();
        store.reveal(1, ResultField::Stress, 250, RequestId(1), 10).unwrap();
        store
            .reveal(1, ResultField::Temperature, 293, RequestId(2), 11)
            .unwrap();

        let again = store.reveal(1, ResultField::Stress, 999, RequestId(3), 12);
        assert!(matches!(again, Err(LedgerError::AlreadyRevealed { .. })));
        assert_eq!(store.disclosed(1, ResultField::Stress).unwrap().value, 250);
        assert_eq!(store.disclosed_count(), 2);
        assert!(store.disclosed(1, ResultField::Displacement).is_none());
    }

    #[test]
    fn test_disclosed_table_serializes_to_json() {
        let mut store = ResultStore::new();
        store.reveal(4, ResultField::Displacement, 3, RequestId(8), 1).unwrap();
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["disclosed"]["4"]["displacement"]["value"], 3);
    }
}
