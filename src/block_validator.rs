//! Block Validator (C7).
//!
//! Applies an incoming block against the committed state, following the
//! teacher's `Ledger::validate_block`/`apply_block_with_db` shape:
//! validate every rule first, mutate nothing until all pass, then commit
//! C1/C2/C3 together and feed C5.

use thiserror::Error;

use crate::ids::{Amount, Height, UnixSeconds};
use crate::observer::ScoreObserver;
use crate::ranking::RankedDelegates;
use crate::registry::DelegateRegistry;
use crate::scheduler::{accept_slot, producer_at_slot, produce_time, SchedulerError};
use crate::vote_ledger::{LedgerError, UnspentOutput, VoteLedger};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block at slot {slot} is signed by {signer}, expected producer {expected}")]
    WrongProducer { slot: u64, signer: u64, expected: u64 },
    #[error("block at slot {slot} has no scheduled producer in the current ranking")]
    NoScheduledProducer { slot: u64 },
    #[error("block timestamp {timestamp} is outside the tolerance window for slot {slot}")]
    TimestampOutOfRange { slot: u64, timestamp: UnixSeconds },
    #[error(transparent)]
    Scheduling(#[from] SchedulerError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("producer fee {paid} exceeds the cap of {cap} (10% of average revenue {average})")]
    FeeCapExceeded { paid: Amount, cap: Amount, average: Amount },
}

/// A block as seen by the validator: already-decoded transactions split
/// into their ledger effects, plus the producer-fee payment carried by
/// the terminal transaction (§4.7.4).
pub struct IncomingBlock<'a> {
    pub height: Height,
    pub slot: u64,
    pub timestamp: UnixSeconds,
    pub producer: u64,
    pub spends: &'a [UnspentOutput],
    pub creates: &'a [UnspentOutput],
    pub producer_fee: Amount,
    /// Total transaction revenue carried by the block's ordinary
    /// transactions, excluding the terminal producer-fee payment itself
    /// (§4.2: "revenue excludes the delegate fee itself to avoid a
    /// feedback loop"). This is what feeds the rolling registration/
    /// renewal/fee-cap average, never `producer_fee`.
    pub block_revenue: Amount,
    /// Fraction of transactions the local node had already seen (e.g. in
    /// its own mempool) before this slot's scheduled time that appear in
    /// this block (§4.5's `expected_tx_included`). Mempool tracking lives
    /// outside the validator, so the caller computes this.
    pub expected_tx_fraction: f64,
    /// Fraction of this block's transactions the local node had not seen
    /// before the scheduled time (§4.5's `unexpected_tx_included`).
    pub unexpected_tx_fraction: f64,
}

/// Result of successfully validating and committing a block: the
/// caller uses this to advance its own height/slot bookkeeping and
/// persist the new snapshot.
pub struct CommitEffects {
    pub new_ranking: RankedDelegates,
}

/// Validates and (on success) applies `block` against the mutable
/// ledger/registry and the ranking snapshot taken as of the end of the
/// previous block. Every check runs before any mutation; a failure at
/// any step leaves `ledger`/`registry` untouched.
#[allow(clippy::too_many_arguments)]
pub fn validate_and_apply(
    block: &IncomingBlock,
    current_slot: u64,
    prev_ranking: &RankedDelegates,
    block_interval_secs: u64,
    timestamp_tolerance_secs: u64,
    revenue_average: Amount,
    fee_cap_fraction_bp: u32,
    ledger: &mut VoteLedger,
    registry: &mut DelegateRegistry,
    observer: &mut ScoreObserver,
) -> Result<CommitEffects, ValidationError> {
    accept_slot(block.slot, current_slot)?;

    let expected = producer_at_slot(prev_ranking, block.slot).ok_or(ValidationError::NoScheduledProducer { slot: block.slot })?;
    if expected != block.producer {
        return Err(ValidationError::WrongProducer {
            slot: block.slot,
            signer: block.producer,
            expected,
        });
    }

    let expected_time = produce_time(block.slot, block_interval_secs);
    let delta = block.timestamp.abs_diff(expected_time);
    if delta > timestamp_tolerance_secs {
        return Err(ValidationError::TimestampOutOfRange {
            slot: block.slot,
            timestamp: block.timestamp,
        });
    }

    let cap = (revenue_average as u128 * fee_cap_fraction_bp as u128 / 10_000) as Amount;
    if block.producer_fee > cap {
        return Err(ValidationError::FeeCapExceeded {
            paid: block.producer_fee,
            cap,
            average: revenue_average,
        });
    }

    // Every vote reference must resolve against the registry as it
    // stands right now; `VoteLedger::apply_batch` performs this check
    // internally against `registry` and leaves `ledger` untouched on
    // failure, satisfying the "validate fully before mutating" rule for
    // C1. C2 has nothing left to validate here: registration/renewal/
    // resignation certificates are applied per-transaction by the
    // coordinator before this call, since they don't interact with the
    // cap check this function is responsible for.
    ledger.apply_batch(block.spends, block.creates, registry)?;

    let new_ranking = RankedDelegates::rebuild(ledger, registry, block.height);

    observer.entry(block.producer).record_produced(expected_time, block.timestamp);
    if block.producer_fee > 0 {
        observer
            .entry(block.producer)
            .record_fee_fraction(block.producer_fee as f64 / cap.max(1) as f64);
    }
    observer
        .entry(block.producer)
        .record_tx_inclusion(block.expected_tx_fraction, block.unexpected_tx_fraction);

    Ok(CommitEffects { new_ranking })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DelegateId;
    use crate::registry::ClaimName;

    fn registered(ids: &[u64]) -> (DelegateRegistry, VoteLedger) {
        let mut registry = DelegateRegistry::new();
        for id in ids {
            registry
                .register(
                    &ClaimName {
                        delegate_id: *id,
                        name: format!("d{id}"),
                        data: vec![],
                        fee_paid: 0,
                    },
                    0,
                    0,
                    1_000_000,
                )
                .unwrap();
        }
        (registry, VoteLedger::new(1_000_000, 200))
    }

    #[test]
    fn fee_cap_scenario() {
        // Scenario 6: average revenue 1000; fee 100 accepted, 101 rejected.
        let (mut registry, mut ledger) = registered(&[1]);
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        let mut observer = ScoreObserver::new();

        let ok_block = IncomingBlock {
            height: 1,
            slot: 0,
            timestamp: 0,
            producer: 1,
            spends: &[],
            creates: &[],
            producer_fee: 100,
            block_revenue: 0,
            expected_tx_fraction: 0.0,
            unexpected_tx_fraction: 0.0,
        };
        validate_and_apply(&ok_block, 0, &ranking, 10, 10, 1000, 1000, &mut ledger, &mut registry, &mut observer).unwrap();

        let too_much = IncomingBlock {
            height: 2,
            slot: 0,
            timestamp: 0,
            producer: 1,
            spends: &[],
            creates: &[],
            producer_fee: 101,
            block_revenue: 0,
            expected_tx_fraction: 0.0,
            unexpected_tx_fraction: 0.0,
        };
        let err = validate_and_apply(&too_much, 0, &ranking, 10, 10, 1000, 1000, &mut ledger, &mut registry, &mut observer)
            .unwrap_err();
        assert!(matches!(err, ValidationError::FeeCapExceeded { paid: 101, cap: 100, .. }));
    }

    #[test]
    fn wrong_producer_rejected() {
        let (mut registry, mut ledger) = registered(&[1, 2]);
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        let mut observer = ScoreObserver::new();
        let expected = producer_at_slot(&ranking, 0).unwrap();
        let impostor = if expected == 1 { 2 } else { 1 };

        let block = IncomingBlock {
            height: 1,
            slot: 0,
            timestamp: 0,
            producer: impostor,
            spends: &[],
            creates: &[],
            producer_fee: 0,
            block_revenue: 0,
            expected_tx_fraction: 0.0,
            unexpected_tx_fraction: 0.0,
        };
        let err = validate_and_apply(&block, 0, &ranking, 10, 10, 0, 1000, &mut ledger, &mut registry, &mut observer)
            .unwrap_err();
        assert!(matches!(err, ValidationError::WrongProducer { .. }));
    }

    #[test]
    fn failed_validation_leaves_ledger_unchanged() {
        let (mut registry, mut ledger) = registered(&[1]);
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        let mut observer = ScoreObserver::new();
        let bad_vote = UnspentOutput {
            id: 1,
            owner: "o".to_string(),
            amount: 100,
            vote: DelegateId::supporting(999),
            age: 0,
        };
        let block = IncomingBlock {
            height: 1,
            slot: 0,
            timestamp: 0,
            producer: producer_at_slot(&ranking, 0).unwrap(),
            spends: &[],
            creates: std::slice::from_ref(&bad_vote),
            producer_fee: 0,
            block_revenue: 0,
            expected_tx_fraction: 0.0,
            unexpected_tx_fraction: 0.0,
        };
        let err = validate_and_apply(&block, 0, &ranking, 10, 10, 0, 1000, &mut ledger, &mut registry, &mut observer)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Ledger(_)));
        assert_eq!(ledger.net(999), 0);
    }

    #[test]
    fn successful_block_records_tx_inclusion_observation() {
        let (mut registry, mut ledger) = registered(&[1]);
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        let mut observer = ScoreObserver::new();
        let producer = producer_at_slot(&ranking, 0).unwrap();

        let block = IncomingBlock {
            height: 1,
            slot: 0,
            timestamp: 0,
            producer,
            spends: &[],
            creates: &[],
            producer_fee: 0,
            block_revenue: 0,
            expected_tx_fraction: 0.75,
            unexpected_tx_fraction: 0.1,
        };
        validate_and_apply(&block, 0, &ranking, 10, 10, 0, 1000, &mut ledger, &mut registry, &mut observer).unwrap();

        let observation = observer.get(producer).unwrap();
        assert_eq!(observation.expected_tx_included.mean(), 0.75);
        assert_eq!(observation.unexpected_tx_included.mean(), 0.1);
    }
}
