//! Vote Ledger (C1).
//!
//! Maintains the [`VoteTally`] derived from every unspent output's vote
//! field and enforces the 2% concentration cap (I2) and the single-vote
//! invariant (I1). Block application is atomic: either every spend and
//! every creation in a batch commits, or none do (see
//! [`VoteLedger::apply_batch`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{Amount, DelegateId, Height};

/// An unspent transaction output, carrying exactly one vote (I1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub id: u64,
    pub owner: String,
    pub amount: Amount,
    pub vote: DelegateId,
    /// Block height at which this output was created.
    pub age: Height,
}

/// Net positive/negative vote totals for one delegate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteBucket {
    pub positive: Amount,
    pub negative: Amount,
}

impl VoteBucket {
    /// Net votes: positive minus negative. Saturates at zero rather than
    /// going negative, since a delegate's concentration is only ever
    /// checked against the positive-leaning side of the cap.
    pub fn net(self) -> i128 {
        self.positive as i128 - self.negative as i128
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("output {0} does not exist or was already spent")]
    UnknownOutput(u64),
    #[error("output {0} already exists")]
    DuplicateOutput(u64),
    #[error("output {0} spent twice in the same batch")]
    DuplicateSpend(u64),
    #[error("vote references unknown delegate {0}")]
    UnknownDelegate(u64),
    #[error("vote references resigned delegate {0}")]
    ResignedDelegate(u64),
    #[error("delegate {delegate} would exceed the {cap_bp} bp concentration cap (projected net {projected}, cap {cap_amount})")]
    CapExceeded {
        delegate: u64,
        projected: i128,
        cap_amount: i128,
        cap_bp: u32,
    },
}

/// Outcome of checking a vote target against the registry (I4): it
/// either currently exists and accepts votes, exists but has resigned,
/// or never existed at all. Kept as three states rather than a bool so
/// `apply_batch` can tell a resigned delegate apart from one that was
/// never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTargetStatus {
    Eligible,
    Resigned,
    Unknown,
}

/// Caller-supplied predicate telling the ledger whether a delegate
/// magnitude currently exists and is not resigned (I4). The ledger has
/// no registry knowledge of its own; the coordinator wires this to the
/// [`crate::registry::DelegateRegistry`].
pub trait DelegateEligibility {
    fn vote_target_status(&self, magnitude: u64) -> VoteTargetStatus;
}

/// Derived vote-tally view over the set of all unspent outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    tally: HashMap<u64, VoteBucket>,
    /// The authoritative set of currently-unspent outputs, by id. Backs
    /// the double-spend/double-create checks in [`Self::apply_batch`]
    /// and is what makes re-applying an already-committed block fail
    /// (the idempotence law in §8): its creates collide with outputs
    /// already present here.
    outputs: HashMap<u64, UnspentOutput>,
    total_supply: Amount,
    /// Numerator of the concentration cap, in basis points (e.g. 200 = 2%).
    cap_bp: u32,
}

impl VoteLedger {
    pub fn new(total_supply: Amount, cap_bp: u32) -> Self {
        Self {
            tally: HashMap::new(),
            outputs: HashMap::new(),
            total_supply,
            cap_bp,
        }
    }

    /// `true` if an unspent output with this id currently exists.
    pub fn contains_output(&self, id: u64) -> bool {
        self.outputs.contains_key(&id)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Net votes for the delegate identified by `magnitude` (sign-free).
    pub fn net(&self, magnitude: u64) -> i128 {
        self.tally.get(&magnitude).copied().unwrap_or_default().net()
    }

    pub fn bucket(&self, magnitude: u64) -> VoteBucket {
        self.tally.get(&magnitude).copied().unwrap_or_default()
    }

    fn cap_amount(&self) -> i128 {
        (self.total_supply as i128) * (self.cap_bp as i128) / 10_000
    }

    /// Adds `output.amount` to the bucket side selected by `output.vote`'s
    /// polarity. A vote for the `NONE` sentinel contributes to neither
    /// side (the amount is simply unvoted).
    fn apply_create_unchecked(&mut self, output: &UnspentOutput) {
        if !output.vote.is_none() {
            let bucket = self.tally.entry(output.vote.magnitude()).or_default();
            if output.vote.is_supporting() {
                bucket.positive += output.amount;
            } else {
                bucket.negative += output.amount;
            }
        }
        self.outputs.insert(output.id, output.clone());
    }

    fn apply_spend_unchecked(&mut self, output: &UnspentOutput) {
        if !output.vote.is_none() {
            let bucket = self.tally.entry(output.vote.magnitude()).or_default();
            if output.vote.is_supporting() {
                bucket.positive = bucket.positive.saturating_sub(output.amount);
            } else {
                bucket.negative = bucket.negative.saturating_sub(output.amount);
            }
        }
        self.outputs.remove(&output.id);
    }

    /// Projects the post-batch net votes for every magnitude touched by
    /// `spends`/`creates` and returns `true` if any of them would exceed
    /// the 2% cap. Used both for mempool admission (against the last
    /// committed snapshot) and as the authoritative post-block check.
    pub fn would_exceed_cap(&self, spends: &[UnspentOutput], creates: &[UnspentOutput]) -> Option<u64> {
        let mut projected: HashMap<u64, VoteBucket> = HashMap::new();
        let touched = spends.iter().chain(creates.iter()).filter(|o| !o.vote.is_none());
        for output in touched {
            projected
                .entry(output.vote.magnitude())
                .or_insert_with(|| self.bucket(output.vote.magnitude()));
        }
        for output in spends.iter().filter(|o| !o.vote.is_none()) {
            let bucket = projected.get_mut(&output.vote.magnitude()).unwrap();
            if output.vote.is_supporting() {
                bucket.positive = bucket.positive.saturating_sub(output.amount);
            } else {
                bucket.negative = bucket.negative.saturating_sub(output.amount);
            }
        }
        for output in creates.iter().filter(|o| !o.vote.is_none()) {
            let bucket = projected.get_mut(&output.vote.magnitude()).unwrap();
            if output.vote.is_supporting() {
                bucket.positive += output.amount;
            } else {
                bucket.negative += output.amount;
            }
        }
        let cap = self.cap_amount();
        projected
            .into_iter()
            .find(|(_, bucket)| bucket.net() > cap)
            .map(|(magnitude, _)| magnitude)
    }

    /// Applies a batch of spends and creates atomically: validates every
    /// vote target against `eligibility`, projects the cap, and only then
    /// mutates the tally. On any failure the ledger is left unchanged.
    pub fn apply_batch(
        &mut self,
        spends: &[UnspentOutput],
        creates: &[UnspentOutput],
        eligibility: &dyn DelegateEligibility,
    ) -> Result<(), LedgerError> {
        let mut seen = std::collections::HashSet::new();
        for output in spends {
            if !seen.insert(output.id) {
                return Err(LedgerError::DuplicateSpend(output.id));
            }
            if !self.outputs.contains_key(&output.id) {
                return Err(LedgerError::UnknownOutput(output.id));
            }
        }
        for output in creates {
            if self.outputs.contains_key(&output.id) {
                return Err(LedgerError::DuplicateOutput(output.id));
            }
        }
        for output in spends.iter().chain(creates.iter()) {
            if output.vote.is_none() {
                continue;
            }
            let magnitude = output.vote.magnitude();
            match eligibility.vote_target_status(magnitude) {
                VoteTargetStatus::Eligible => {}
                VoteTargetStatus::Resigned => return Err(LedgerError::ResignedDelegate(magnitude)),
                VoteTargetStatus::Unknown => return Err(LedgerError::UnknownDelegate(magnitude)),
            }
        }
        if let Some(magnitude) = self.would_exceed_cap(spends, creates) {
            let cap_amount = self.cap_amount();
            let mut tmp = self.tally.get(&magnitude).copied().unwrap_or_default();
            for output in spends.iter().filter(|o| o.vote.magnitude() == magnitude) {
                if output.vote.is_supporting() {
                    tmp.positive = tmp.positive.saturating_sub(output.amount);
                } else {
                    tmp.negative = tmp.negative.saturating_sub(output.amount);
                }
            }
            for output in creates.iter().filter(|o| o.vote.magnitude() == magnitude) {
                if output.vote.is_supporting() {
                    tmp.positive += output.amount;
                } else {
                    tmp.negative += output.amount;
                }
            }
            return Err(LedgerError::CapExceeded {
                delegate: magnitude,
                projected: tmp.net(),
                cap_amount,
                cap_bp: self.cap_bp,
            });
        }
        for output in spends {
            self.apply_spend_unchecked(output);
        }
        for output in creates {
            self.apply_create_unchecked(output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllEligible;
    impl DelegateEligibility for AllEligible {
        fn vote_target_status(&self, _magnitude: u64) -> VoteTargetStatus {
            VoteTargetStatus::Eligible
        }
    }

    struct OnlyDelegate(u64);
    impl DelegateEligibility for OnlyDelegate {
        fn vote_target_status(&self, magnitude: u64) -> VoteTargetStatus {
            if magnitude == self.0 {
                VoteTargetStatus::Eligible
            } else {
                VoteTargetStatus::Unknown
            }
        }
    }

    struct AllResigned;
    impl DelegateEligibility for AllResigned {
        fn vote_target_status(&self, _magnitude: u64) -> VoteTargetStatus {
            VoteTargetStatus::Resigned
        }
    }

    fn output(id: u64, amount: Amount, vote: DelegateId) -> UnspentOutput {
        UnspentOutput {
            id,
            owner: "owner".to_string(),
            amount,
            vote,
            age: 0,
        }
    }

    #[test]
    fn create_then_net() {
        let mut ledger = VoteLedger::new(1_000_000, 200);
        let out = output(1, 500, DelegateId::supporting(1));
        ledger.apply_batch(&[], &[out], &AllEligible).unwrap();
        assert_eq!(ledger.net(1), 500);
    }

    #[test]
    fn spend_then_create_nets_to_zero() {
        let mut ledger = VoteLedger::new(1_000_000, 200);
        let out = output(1, 500, DelegateId::supporting(1));
        ledger.apply_batch(&[], &[out.clone()], &AllEligible).unwrap();
        ledger.apply_batch(&[out], &[], &AllEligible).unwrap();
        assert_eq!(ledger.net(1), 0);
    }

    #[test]
    fn cap_enforcement_scenario() {
        // Scenario 1 from spec.md §8: supply 1,000,000; delegate at 19,500.
        let mut ledger = VoteLedger::new(1_000_000, 200);
        let seed = output(1, 19_500, DelegateId::supporting(7));
        ledger.apply_batch(&[], &[seed], &AllEligible).unwrap();

        // Pushing to 20,001 is rejected.
        let over = output(2, 501, DelegateId::supporting(7));
        let err = ledger.apply_batch(&[], &[over], &AllEligible).unwrap_err();
        assert!(matches!(err, LedgerError::CapExceeded { delegate: 7, .. }));
        assert_eq!(ledger.net(7), 19_500, "rejected batch must not mutate state");

        // Pushing to exactly 20,000 is accepted.
        let at_cap = output(3, 500, DelegateId::supporting(7));
        ledger.apply_batch(&[], &[at_cap], &AllEligible).unwrap();
        assert_eq!(ledger.net(7), 20_000);
    }

    #[test]
    fn unknown_delegate_rejected() {
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(9));
        let err = ledger.apply_batch(&[], &[out], &OnlyDelegate(1)).unwrap_err();
        assert_eq!(err, LedgerError::UnknownDelegate(9));
    }

    #[test]
    fn resigned_delegate_rejected_distinctly_from_unknown() {
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(7));
        let err = ledger.apply_batch(&[], &[out], &AllResigned).unwrap_err();
        assert_eq!(err, LedgerError::ResignedDelegate(7));
    }

    #[test]
    fn duplicate_spend_rejected() {
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(1));
        ledger.apply_batch(&[], &[out.clone()], &AllEligible).unwrap();
        let err = ledger
            .apply_batch(&[out.clone(), out], &[], &AllEligible)
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateSpend(1));
    }

    #[test]
    fn spending_nonexistent_output_rejected() {
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(1));
        let err = ledger.apply_batch(&[out], &[], &AllEligible).unwrap_err();
        assert_eq!(err, LedgerError::UnknownOutput(1));
    }

    #[test]
    fn recreating_an_existing_output_id_rejected() {
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(1));
        ledger.apply_batch(&[], &[out.clone()], &AllEligible).unwrap();
        let err = ledger.apply_batch(&[], &[out], &AllEligible).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateOutput(1));
    }

    #[test]
    fn reapplying_a_committed_block_is_rejected_and_leaves_state_unchanged() {
        // Idempotence law (§8): re-applying the same create is rejected
        // and the tally is untouched by the rejected attempt.
        let mut ledger = VoteLedger::new(1_000, 200);
        let out = output(1, 10, DelegateId::supporting(1));
        ledger.apply_batch(&[], &[out.clone()], &AllEligible).unwrap();
        assert_eq!(ledger.net(1), 10);
        let err = ledger.apply_batch(&[], &[out], &AllEligible).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateOutput(1));
        assert_eq!(ledger.net(1), 10);
    }

    #[test]
    fn opposing_votes_do_not_offset_positive_for_cap() {
        let mut ledger = VoteLedger::new(1_000_000, 200);
        let pos = output(1, 20_000, DelegateId::supporting(5));
        let neg = output(2, 5_000, DelegateId::against(5));
        ledger.apply_batch(&[], &[pos, neg], &AllEligible).unwrap();
        assert_eq!(ledger.net(5), 15_000);
    }
}
