//! End-to-end disclosure flow through the public API.
//!
//! ```text
//! owner --submit_record--> ledger <--submit_result-- compute stage
//! owner --request_*_decryption--> ledger --schedule--> oracle
//! oracle --callback(request id, cleartexts, proof)--> ledger
//! ```

use std::sync::{Arc, Mutex};
use std::thread;

use cipherfem_core::{
    CiphertextHandle, ConfidentialLedger, DecryptionCallback, Disclosure, LedgerConfig,
    LedgerError, LedgerEvent, ManualClock, RecordId, ResultField, SoftwareOracle,
};

fn open_ledger() -> ConfidentialLedger<SoftwareOracle> {
    let config = LedgerConfig::from_toml(
        r#"
        request_ttl_ms = 30000
        trusted_compute_stages = ["solver"]
        "#,
    )
    .expect("config");
    ConfidentialLedger::new(SoftwareOracle::generate().with_request_id_base(1_000), &config)
        .expect("ledger")
        .with_clock(Arc::new(ManualClock::new(0)))
}

fn submit_bracket(ledger: &mut ConfidentialLedger<SoftwareOracle>, owner: &str) -> RecordId {
    let oracle = ledger.library_mut();
    let handles = [
        oracle.encrypt_text("hex8 mesh, 4096 elements"),
        oracle.encrypt_text("Al 6061-T6"),
        oracle.encrypt_text("bolted at holes 1-4, 2 kN shear"),
    ];
    ledger.submit_record(owner, handles).expect("submit record")
}

fn post_outputs(ledger: &mut ConfidentialLedger<SoftwareOracle>, id: RecordId) {
    let oracle = ledger.library_mut();
    let [stress, displacement, temperature]: [CiphertextHandle; 3] =
        [182, 1, 21].map(|v| oracle.encrypt_scalar(v));
    ledger
        .submit_result("solver", id, stress, displacement, temperature)
        .expect("submit result");
}

#[test]
fn record_and_result_disclosure_round() {
    let mut ledger = open_ledger();
    let id = submit_bracket(&mut ledger, "alice");
    post_outputs(&mut ledger, id);

    let record_req = ledger.request_record_decryption("alice", id).expect("record request");
    let stress_req = ledger
        .request_result_decryption("alice", id, ResultField::Stress.index())
        .expect("stress request");
    assert!(record_req.0 >= 1_000 && stress_req.0 >= 1_000);

    let record_cb = ledger.library_mut().fulfill(record_req).expect("fulfill record");
    let stress_cb = ledger.library_mut().fulfill(stress_req).expect("fulfill stress");

    assert_eq!(
        ledger.deliver_callback(&stress_cb).expect("stress callback"),
        Disclosure::ResultField {
            id,
            field: ResultField::Stress,
            value: 182
        }
    );
    assert_eq!(ledger.on_record_decrypted(&record_cb).expect("record callback"), id);

    let disclosure = ledger.disclosure(id).expect("disclosure");
    assert!(disclosure.revealed);
    assert_eq!(disclosure.material, "Al 6061-T6");
    assert_eq!(
        ledger.disclosed_result(id, ResultField::Stress).map(|d| d.value),
        Some(182)
    );
    assert!(ledger.journal().verify().is_ok());
}

#[test]
fn replay_does_not_alter_disclosed_fields() {
    let mut ledger = open_ledger();
    let id = submit_bracket(&mut ledger, "alice");
    let request_id = ledger.request_record_decryption("alice", id).expect("request");
    let callback = ledger.library_mut().fulfill(request_id).expect("fulfill");
    ledger.on_record_decrypted(&callback).expect("first delivery");
    let disclosed = ledger.disclosure(id).expect("disclosure").clone();

    for _ in 0..3 {
        let err = ledger.on_record_decrypted(&callback).expect_err("replay must fail");
        assert!(matches!(err, LedgerError::UnknownRequest { .. }));
    }

    // A replay re-signed by the oracle with different cleartexts fails too.
    let mut altered = callback.clone();
    altered.cleartexts = cipherfem_core::codec::encode_record_cleartexts(
        &cipherfem_core::codec::RecordCleartexts {
            mesh: "tampered".into(),
            material: "tampered".into(),
            boundary: "tampered".into(),
        },
    );
    altered.proof = ledger.library().sign_callback(request_id, &altered.cleartexts);
    assert!(matches!(
        ledger.on_record_decrypted(&altered),
        Err(LedgerError::UnknownRequest { .. })
    ));

    assert_eq!(ledger.disclosure(id).expect("disclosure"), &disclosed);
    let disclosed_events = ledger
        .journal()
        .events()
        .filter(|e| matches!(e, LedgerEvent::RecordDisclosed { .. }))
        .count();
    assert_eq!(disclosed_events, 1);
}

#[test]
fn callbacks_from_another_thread() {
    let ledger = Arc::new(Mutex::new(open_ledger()));

    let pending: Vec<DecryptionCallback> = {
        let mut guard = ledger.lock().expect("lock");
        let ids: Vec<RecordId> = (0..4).map(|_| submit_bracket(&mut guard, "alice")).collect();
        let request_ids: Vec<_> = ids
            .iter()
            .map(|&id| guard.request_record_decryption("alice", id).expect("request"))
            .collect();
        request_ids
            .into_iter()
            .map(|r| guard.library_mut().fulfill(r).expect("fulfill"))
            .collect()
    };

    let worker = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for callback in pending.iter().rev() {
                ledger
                    .lock()
                    .expect("lock")
                    .on_record_decrypted(callback)
                    .expect("callback");
            }
        })
    };
    worker.join().expect("worker");

    let guard = ledger.lock().expect("lock");
    assert_eq!(guard.records().revealed_count(), 4);
    assert_eq!(guard.pending_requests().count(), 0);
}
