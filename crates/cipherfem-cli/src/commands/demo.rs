//! `cipherfem demo`: one full disclosure round against the software oracle.
//!
//! For each sample record the demo submits the encrypted inputs, lets a
//! compute stage post encrypted outputs, requests decryption of the record
//! and its stress value, then answers every request in reverse order. The
//! first answered callback is replayed at the end and must be rejected.

use std::path::Path;

use anyhow::{Context, Result, bail};
use cipherfem_core::crypto::Signer;
use cipherfem_core::{
    ConfidentialLedger, DecryptionCallback, LedgerEvent, RecordId, ResultField, SoftwareOracle,
};
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{load_config, print_json};

/// Upper bound on `--records`.
pub const MAX_DEMO_RECORDS: u64 = 1_000;

/// Arguments for `cipherfem demo`.
#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Number of sample records to submit.
    #[arg(long, default_value = "2")]
    pub records: u64,

    /// Actor that owns the sample records.
    #[arg(long, default_value = "alice")]
    pub owner: String,

    /// Hex-encoded 32-byte oracle secret (from `cipherfem keygen`). A
    /// random key is used when absent.
    #[arg(long)]
    pub oracle_secret: Option<String>,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Disclosed state of one sample record.
#[derive(Debug, Serialize)]
pub struct RecordReport {
    /// Record id.
    pub id: RecordId,
    /// Disclosed mesh description.
    pub mesh: String,
    /// Disclosed material description.
    pub material: String,
    /// Disclosed boundary conditions.
    pub boundary: String,
    /// Disclosed stress value.
    pub stress: Option<u64>,
}

/// Outcome of a demo run.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    /// Key the oracle signed callbacks with (hex).
    pub oracle_public_key: String,
    /// Disclosed records.
    pub records: Vec<RecordReport>,
    /// Error code the replayed callback was rejected with.
    pub replay_rejected: &'static str,
    /// Number of journal entries.
    pub journal_entries: usize,
    /// Journal head hash (hex).
    pub journal_head: String,
    /// All emitted events, in order.
    pub events: Vec<LedgerEvent>,
}

struct Sample {
    mesh: String,
    material: String,
    boundary: String,
    outputs: [u64; 3],
}

impl Sample {
    fn new(n: u64) -> Self {
        Self {
            mesh: format!("tet10 mesh, {} elements", 1_200 * n),
            material: "steel S355, E=210GPa, nu=0.3".to_string(),
            boundary: format!("fixed at x=0, {} kN at x=L", 5 * n),
            outputs: [235 + n, 2 * n, 20 + n],
        }
    }
}

fn parse_secret(encoded: &str) -> Result<Signer> {
    let bytes = hex::decode(encoded.trim()).context("oracle secret is not valid hex")?;
    let Ok(seed) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("oracle secret must be 32 bytes, got {}", bytes.len());
    };
    Ok(Signer::from_bytes(&seed))
}

/// Runs the demo.
pub fn run(args: &DemoArgs, config_path: Option<&Path>) -> Result<()> {
    if args.records == 0 || args.records > MAX_DEMO_RECORDS {
        bail!("--records must be between 1 and {MAX_DEMO_RECORDS}");
    }
    let config = load_config(config_path)?;
    let signer = match &args.oracle_secret {
        Some(encoded) => parse_secret(encoded)?,
        None => Signer::generate(),
    };
    let mut ledger = ConfidentialLedger::new(SoftwareOracle::new(signer), &config)
        .context("failed to open ledger")?;
    let stage = config
        .trusted_compute_stages
        .first()
        .cloned()
        .unwrap_or_else(|| args.owner.clone());

    let mut ids = Vec::new();
    for n in 1..=args.records {
        let sample = Sample::new(n);
        let oracle = ledger.library_mut();
        let handles = [
            oracle.encrypt_text(sample.mesh),
            oracle.encrypt_text(sample.material),
            oracle.encrypt_text(sample.boundary),
        ];
        let [stress, displacement, temperature] = sample.outputs.map(|v| oracle.encrypt_scalar(v));

        let id = ledger.submit_record(&args.owner, handles)?;
        ledger.submit_result(&stage, id, stress, displacement, temperature)?;
        ids.push(id);
    }

    let mut request_ids = Vec::new();
    for &id in &ids {
        request_ids.push(ledger.request_record_decryption(&args.owner, id)?);
        request_ids.push(ledger.request_result_decryption(
            &args.owner,
            id,
            ResultField::Stress.index(),
        )?);
    }

    let mut answered: Vec<DecryptionCallback> = Vec::new();
    for &request_id in request_ids.iter().rev() {
        let callback = ledger
            .library_mut()
            .fulfill(request_id)
            .context("oracle failed to answer")?;
        let disclosure = ledger.deliver_callback(&callback)?;
        info!(%request_id, ?disclosure, "callback delivered");
        answered.push(callback);
    }

    let replay_rejected = match answered.first().map(|cb| ledger.deliver_callback(cb)) {
        Some(Err(err)) => err.code(),
        Some(Ok(_)) => bail!("replayed callback was accepted"),
        None => bail!("no callbacks were answered"),
    };
    ledger.journal().verify().context("journal hash chain is broken")?;

    let records = ids
        .iter()
        .map(|&id| {
            let disclosure = ledger.disclosure(id)?;
            Ok(RecordReport {
                id,
                mesh: disclosure.mesh.clone(),
                material: disclosure.material.clone(),
                boundary: disclosure.boundary.clone(),
                stress: ledger
                    .disclosed_result(id, ResultField::Stress)
                    .map(|d| d.value),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = DemoReport {
        oracle_public_key: hex::encode(ledger.library().verifying_key().as_bytes()),
        records,
        replay_rejected,
        journal_entries: ledger.journal().len(),
        journal_head: hex::encode(ledger.journal().head_hash()),
        events: ledger.journal().events().cloned().collect(),
    };

    if args.json {
        print_json(&report)
    } else {
        print_text(&report);
        Ok(())
    }
}

fn print_text(report: &DemoReport) {
    println!("oracle key: {}", report.oracle_public_key);
    for record in &report.records {
        println!("record {}", record.id);
        println!("  mesh:     {}", record.mesh);
        println!("  material: {}", record.material);
        println!("  boundary: {}", record.boundary);
        match record.stress {
            Some(stress) => println!("  stress:   {stress}"),
            None => println!("  stress:   (not disclosed)"),
        }
    }
    println!("replayed callback rejected: {}", report.replay_rejected);
    println!(
        "journal: {} entries, head {}",
        report.journal_entries, report.journal_head
    );
}
