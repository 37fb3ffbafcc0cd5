//! Property tests over random operation sequences.

use cipherfem_core::{
    ConfidentialLedger, LedgerConfig, LedgerError, RecordId, RequestId, SoftwareOracle,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit,
    Request(usize),
    Answer(usize),
    Replay(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Submit),
        (0usize..8).prop_map(Op::Request),
        (0usize..8).prop_map(Op::Answer),
        (0usize..8).prop_map(Op::Replay),
    ]
}

fn ledger() -> ConfidentialLedger<SoftwareOracle> {
    ConfidentialLedger::new(SoftwareOracle::generate(), &LedgerConfig::default()).unwrap()
}

fn submit(ledger: &mut ConfidentialLedger<SoftwareOracle>) -> RecordId {
    let oracle = ledger.library_mut();
    let handles = [
        oracle.encrypt_text("mesh"),
        oracle.encrypt_text("material"),
        oracle.encrypt_text("boundary"),
    ];
    ledger.submit_record("owner", handles).unwrap()
}

proptest! {
    #[test]
    fn record_ids_strictly_increase(count in 1usize..64) {
        let mut ledger = ledger();
        let ids: Vec<RecordId> = (0..count).map(|_| submit(&mut ledger)).collect();
        prop_assert_eq!(ids[0], 1);
        prop_assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn revealed_flips_at_most_once(ops in prop::collection::vec(op(), 1..48)) {
        let mut ledger = ledger();
        let mut ids: Vec<RecordId> = Vec::new();
        let mut issued: Vec<RequestId> = Vec::new();
        let mut answered = Vec::new();
        let mut flips = 0usize;

        for op in ops {
            let revealed_before = ledger.records().revealed_count();
            match op {
                Op::Submit => ids.push(submit(&mut ledger)),
                Op::Request(i) if !ids.is_empty() => {
                    let id = ids[i % ids.len()];
                    match ledger.request_record_decryption("owner", id) {
                        Ok(request_id) => issued.push(request_id),
                        Err(err) => prop_assert!(
                            matches!(
                                err,
                                LedgerError::AlreadyRevealed { .. }
                                    | LedgerError::DecryptionPending { .. }
                            ),
                            "unexpected request error {:?}",
                            err
                        ),
                    }
                },
                Op::Answer(i) if !issued.is_empty() => {
                    let request_id = issued.remove(i % issued.len());
                    let callback = ledger.library_mut().fulfill(request_id).unwrap();
                    ledger.on_record_decrypted(&callback).unwrap();
                    answered.push(callback);
                },
                Op::Replay(i) if !answered.is_empty() => {
                    let callback = answered[i % answered.len()].clone();
                    let journal_len = ledger.journal().len();
                    let replayed = ledger.on_record_decrypted(&callback);
                    prop_assert!(
                        matches!(replayed, Err(LedgerError::UnknownRequest { .. })),
                        "replay returned {:?}",
                        replayed
                    );
                    prop_assert_eq!(ledger.journal().len(), journal_len);
                },
                _ => {},
            }
            let revealed_after = ledger.records().revealed_count();
            prop_assert!(revealed_after >= revealed_before);
            flips += revealed_after - revealed_before;
        }

        prop_assert!(flips <= ids.len());
        prop_assert_eq!(flips, answered.len());
        prop_assert!(ledger.journal().verify().is_ok());
    }
}
