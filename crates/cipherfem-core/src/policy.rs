//! Authorization for mutating ledger operations.
//!
//! The ledger asks its [`AccessPolicy`] before every mutation that an actor
//! initiates. Oracle callbacks are not routed through the policy: they are
//! authenticated by their proof instead.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{LedgerError, LedgerResult};
use crate::handle::RecordId;

/// An actor-initiated mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Submitting a new encrypted record.
    SubmitRecord,
    /// Submitting (or replacing) the analysis result of a record.
    SubmitResult {
        /// Target record.
        id: RecordId,
        /// Owner of the target record.
        owner: &'a str,
    },
    /// Requesting decryption of a record or one of its result fields.
    RequestDecryption {
        /// Target record.
        id: RecordId,
        /// Owner of the target record.
        owner: &'a str,
    },
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitRecord => f.write_str("submit records"),
            Self::SubmitResult { id, .. } => write!(f, "submit results for record {id}"),
            Self::RequestDecryption { id, .. } => write!(f, "request decryption of record {id}"),
        }
    }
}

/// Authorization predicate consulted before every mutating operation.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// Returns `Ok(())` if `actor` may perform `action`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] otherwise.
    fn authorize(&self, actor: &str, action: &Action<'_>) -> LedgerResult<()>;
}

/// Default policy.
///
/// - Anyone may submit a record; they become its owner.
/// - Only the owner may request decryption.
/// - Results may be submitted by the owner or a trusted compute stage.
#[derive(Debug, Clone, Default)]
pub struct OwnerPolicy {
    trusted_compute_stages: BTreeSet<String>,
}

impl OwnerPolicy {
    /// Creates a policy with no trusted compute stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy trusting the given compute stages to submit results.
    #[must_use]
    pub fn with_compute_stages<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_compute_stages: stages.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `actor` is a trusted compute stage.
    #[must_use]
    pub fn is_compute_stage(&self, actor: &str) -> bool {
        self.trusted_compute_stages.contains(actor)
    }
}

impl AccessPolicy for OwnerPolicy {
    fn authorize(&self, actor: &str, action: &Action<'_>) -> LedgerResult<()> {
        let allowed = match action {
            Action::SubmitRecord => !actor.is_empty(),
            Action::SubmitResult { owner, .. } => *owner == actor || self.is_compute_stage(actor),
            Action::RequestDecryption { owner, .. } => *owner == actor,
        };
        if allowed {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                actor: actor.to_owned(),
                action: action.to_string(),
            })
        }
    }
}
