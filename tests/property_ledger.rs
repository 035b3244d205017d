//! Property tests over the vote ledger's invariants (§8), in the
//! teacher's `proptest!` style (see `tests/property_consensus.rs` in the
//! reference corpus): arbitrary batches of votes, checked against the
//! supply-conservation and cap invariants rather than example-by-example.

use dpos_core::ids::DelegateId;
use dpos_core::registry::{ClaimName, DelegateRegistry};
use dpos_core::vote_ledger::{UnspentOutput, VoteLedger};
use proptest::prelude::*;

const TOTAL_SUPPLY: u64 = 1_000_000;
const CAP_BP: u32 = 200;

fn arb_vote_batch() -> impl Strategy<Value = Vec<(u64, u64, bool)>> {
    proptest::collection::vec((1u64..=5, 1u64..=1_000, proptest::bool::ANY), 0..20)
}

proptest! {
    #[test]
    fn cap_never_exceeded_after_a_successful_batch(batch in arb_vote_batch()) {
        let mut registry = DelegateRegistry::new();
        for id in 1..=5u64 {
            let _ = registry.register(
                &ClaimName { delegate_id: id, name: format!("d{id}"), data: vec![], fee_paid: 0 },
                0,
                0,
                1_000_000,
            );
        }
        let mut ledger = VoteLedger::new(TOTAL_SUPPLY, CAP_BP);

        let mut next_id = 0u64;
        let mut applied: Vec<UnspentOutput> = Vec::new();
        for (delegate, amount, support) in batch {
            next_id += 1;
            let vote = if support { DelegateId::supporting(delegate) } else { DelegateId::against(delegate) };
            let output = UnspentOutput { id: next_id, owner: "p".to_string(), amount, vote, age: 0 };
            if ledger.apply_batch(&[], std::slice::from_ref(&output), &registry).is_ok() {
                applied.push(output);
            }
        }

        let cap = (TOTAL_SUPPLY as i128) * (CAP_BP as i128) / 10_000;
        for id in 1..=5u64 {
            prop_assert!(ledger.net(id) <= cap);
        }
        let _ = applied;
    }

    #[test]
    fn spend_then_reissue_round_trips_net_votes(amount in 1u64..20_000, delegate in 1u64..5) {
        let mut registry = DelegateRegistry::new();
        registry.register(
            &ClaimName { delegate_id: delegate, name: format!("d{delegate}"), data: vec![], fee_paid: 0 },
            0,
            0,
            1_000_000,
        ).unwrap();
        let mut ledger = VoteLedger::new(TOTAL_SUPPLY, CAP_BP);
        let output = UnspentOutput { id: 1, owner: "p".to_string(), amount, vote: DelegateId::supporting(delegate), age: 0 };

        ledger.apply_batch(&[], std::slice::from_ref(&output), &registry).unwrap();
        let after_create = ledger.net(delegate);
        prop_assert_eq!(after_create, amount as i128);

        ledger.apply_batch(std::slice::from_ref(&output), &[], &registry).unwrap();
        prop_assert_eq!(ledger.net(delegate), 0);
    }
}
