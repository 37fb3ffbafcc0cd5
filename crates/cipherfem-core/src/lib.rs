//! Confidential ledger for encrypted finite-element analysis records.
//!
//! Engineering data (mesh, material, boundary conditions) and analysis
//! outputs (stress, displacement, temperature) are stored as opaque
//! ciphertext handles. Decryption happens off-protocol: the ledger asks an
//! external oracle to decrypt, remembers what each request will reveal, and
//! accepts the oracle's answer only if its proof verifies and the request is
//! still pending.
//!
//! # Modules
//!
//! - [`handle`]: ciphertext handles and request ids
//! - [`records`]: encrypted records and their disclosure slots
//! - [`results`]: analysis results and per-field disclosures
//! - [`correlator`]: pending-request table and composite descriptors
//! - [`ledger`]: [`ConfidentialLedger`], the state object tying them together
//! - [`oracle`]: the [`CiphertextLibrary`] contract and an in-process oracle
//! - [`policy`]: who may submit and request decryption
//! - [`events`]: ledger notifications and the hash-chained journal
//! - [`codec`]: cleartext payload framing
//! - [`crypto`]: hashing and Ed25519 proof primitives
//! - [`config`]: TOML configuration
//! - [`clock`]: injectable time source

pub mod clock;
pub mod codec;
pub mod config;
pub mod correlator;
pub mod crypto;
pub mod error;
pub mod events;
pub mod handle;
pub mod ledger;
pub mod oracle;
pub mod policy;
pub mod records;
pub mod results;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use correlator::{PendingRequest, TargetDescriptor};
pub use error::{LedgerError, LedgerResult};
pub use events::{EventJournal, LedgerEvent};
pub use handle::{CiphertextHandle, RecordId, RequestId};
pub use ledger::{ConfidentialLedger, Disclosure};
pub use oracle::{CiphertextLibrary, DecryptionCallback, SoftwareOracle};
pub use results::ResultField;
