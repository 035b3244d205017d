//! End-to-end scenario tests driving a whole `Coordinator`, mirroring
//! the shape of the unit tests embedded in each module but exercising
//! the full write path instead of one component in isolation.

use dpos_core::block_validator::IncomingBlock;
use dpos_core::coordinator::{Coordinator, NetworkConstants};
use dpos_core::registry::ClaimName;
use dpos_core::tracing::Tracer;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

#[test]
fn determinism_replaying_the_same_chain_twice_yields_identical_rankings() {
    let rt = runtime();
    rt.block_on(async {
        let constants = NetworkConstants {
            block_interval_secs: 10,
            ..NetworkConstants::default()
        };

        let run_chain = || async {
            let coordinator = Coordinator::new(constants, 1_000_000, Tracer::new());
            for id in 1..=3u64 {
                coordinator
                    .register_delegate(ClaimName {
                        delegate_id: id,
                        name: format!("delegate{id}"),
                        data: vec![],
                        fee_paid: 0,
                    })
                    .await
                    .unwrap();
            }
            for height in 1..=3u64 {
                let ranking = coordinator.ranking_snapshot().await;
                let slot = height - 1;
                let producer = dpos_core::scheduler::producer_at_slot(&ranking, slot).unwrap();
                let block = IncomingBlock {
                    height,
                    slot,
                    timestamp: slot * constants.block_interval_secs,
                    producer,
                    spends: &[],
                    creates: &[],
                    producer_fee: 0,
                    block_revenue: 0,
                    expected_tx_fraction: 0.0,
                    unexpected_tx_fraction: 0.0,
                };
                coordinator.apply_block(&block).await.unwrap();
            }
            coordinator.ranking_snapshot().await.all()
        };

        let first = run_chain().await;
        let second = run_chain().await;
        assert_eq!(first, second);
    });
}

#[test]
fn block_for_unregistered_producer_is_rejected_and_state_unchanged() {
    let rt = runtime();
    rt.block_on(async {
        let coordinator = Coordinator::new(NetworkConstants::default(), 1_000_000, Tracer::new());
        coordinator
            .register_delegate(ClaimName {
                delegate_id: 1,
                name: "alice".to_string(),
                data: vec![],
                fee_paid: 0,
            })
            .await
            .unwrap();

        let block = IncomingBlock {
            height: 1,
            slot: 1, // no delegate scheduled at rank 1 with only one registrant.
            timestamp: 10,
            producer: 1,
            spends: &[],
            creates: &[],
            producer_fee: 0,
            block_revenue: 0,
            expected_tx_fraction: 0.0,
            unexpected_tx_fraction: 0.0,
        };
        let result = coordinator.apply_block(&block).await;
        assert!(result.is_err());
        assert_eq!(coordinator.height().await, 0);
    });
}
