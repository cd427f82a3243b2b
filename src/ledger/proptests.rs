//! Property-based tests for the card ledger
//!
//! These tests verify that the status map and the action history stay
//! consistent across arbitrary sequences of operations.

use super::*;
use crate::testing::MemoryStore;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Activate(String),
    Deactivate(String),
    Reset,
}

/// A small id pool so operations collide on the same cards
fn arb_card_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("111111111".to_string()),
        Just("222222222".to_string()),
        Just("333333333".to_string()),
        "[0-9]{9}",
    ]
}

fn arb_malformed_id() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{0,8}",
        "[0-9]{10,12}",
        "[0-9]{4}[a-z ]{1}[0-9]{4}",
        "[a-zA-Z]{9}",
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_card_id().prop_map(Op::Activate),
        4 => arb_card_id().prop_map(Op::Deactivate),
        1 => Just(Op::Reset),
    ]
}

fn run(ops: &[Op]) -> Ledger {
    let mut ledger = Ledger::load(Box::new(MemoryStore::default()));
    for op in ops {
        match op {
            Op::Activate(id) => {
                ledger.activate(id).unwrap();
            }
            Op::Deactivate(id) => {
                ledger.deactivate(id).unwrap();
            }
            Op::Reset => {
                ledger.reset();
            }
        }
    }
    ledger
}

proptest! {
    /// Replaying the history last-write-wins reproduces the status map
    #[test]
    fn prop_history_replay_matches_states(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let ledger = run(&ops);
        let snapshot = ledger.snapshot();

        let mut replayed = BTreeMap::new();
        for entry in &snapshot.card_action_history {
            replayed.insert(entry.card.clone(), entry.action.resulting_status());
        }
        prop_assert_eq!(&replayed, &snapshot.card_states);
    }

    /// Consecutive entries for the same card always alternate
    #[test]
    fn prop_no_repeated_action_per_card(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let ledger = run(&ops);
        let mut last: BTreeMap<&CardId, CardAction> = BTreeMap::new();
        for entry in &ledger.snapshot().card_action_history {
            if let Some(prev) = last.insert(&entry.card, entry.action) {
                prop_assert_ne!(prev, entry.action);
            }
        }
    }

    /// Malformed ids never change the ledger
    #[test]
    fn prop_malformed_ids_rejected(
        ops in proptest::collection::vec(arb_op(), 0..10),
        bad in arb_malformed_id(),
    ) {
        let mut ledger = run(&ops);
        let before = ledger.snapshot().clone();

        prop_assert!(ledger.activate(&bad).is_err());
        prop_assert!(ledger.deactivate(&bad).is_err());
        prop_assert!(ledger.status_of(&bad).is_err());
        prop_assert_eq!(ledger.snapshot(), &before);
    }

    /// The partition is exactly the history split by action
    #[test]
    fn prop_partition_covers_history(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let ledger = run(&ops);
        let partition = ledger.all_statuses();
        prop_assert_eq!(
            partition.activated.len() + partition.deactivated.len(),
            ledger.snapshot().card_action_history.len()
        );
    }

    /// Saving and reloading through JSON is lossless
    #[test]
    fn prop_json_round_trip(ops in proptest::collection::vec(arb_op(), 0..30)) {
        let ledger = run(&ops);
        let json = serde_json::to_string(ledger.snapshot()).unwrap();
        let back: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back, ledger.snapshot());
    }
}
