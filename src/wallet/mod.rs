//! Wallet Vote Selector (C6).
//!
//! Chooses a vote target and a set of spendable inputs for an outgoing
//! transaction, following the teacher's `Wallet::create_transaction`
//! shape (select inputs, then decide the payload, then let the caller
//! attach fee/change) generalized to the spec's trust-driven rules
//! instead of balance-driven coin selection.

use std::collections::HashSet;

use thiserror::Error;

use crate::ids::{Amount, DelegateId, Height};
use crate::observer::ScoreObserver;
use crate::ranking::RankedDelegates;
use crate::vote_ledger::{UnspentOutput, VoteLedger};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet holds no spendable outputs")]
    NoSpendableOutputs,
    #[error("every candidate vote target would exceed the concentration cap")]
    NoTargetUnderCap,
}

/// A wallet's trust configuration: delegates it actively distrusts,
/// delegates it trusts and wants to strengthen, and the set it has
/// locally observed behavior for.
#[derive(Debug, Clone, Default)]
pub struct TrustConfig {
    pub distrusted: HashSet<u64>,
    pub trusted: HashSet<u64>,
}

/// Selects vote targets and transaction inputs for a wallet, per §4.6.
pub struct WalletVoter<'a> {
    pub ledger: &'a VoteLedger,
    pub ranking: &'a RankedDelegates,
    pub observer: &'a ScoreObserver,
    pub trust: &'a TrustConfig,
}

impl<'a> WalletVoter<'a> {
    /// Picks a vote target following §4.6's first-match-wins rule chain,
    /// skipping any candidate that `would_exceed_cap` projects over the
    /// 2% ceiling and falling through to the next rule when that happens.
    pub fn choose_target(&self, spends: &[UnspentOutput], amount: Amount) -> Result<DelegateId, WalletError> {
        let candidates = self.candidate_targets();
        for delegate in candidates {
            let vote = self.target_polarity(delegate);
            let probe = UnspentOutput {
                id: u64::MAX,
                owner: String::new(),
                amount,
                vote,
                age: 0,
            };
            if self.ledger.would_exceed_cap(spends, std::slice::from_ref(&probe)).is_none() {
                return Ok(vote);
            }
        }
        Err(WalletError::NoTargetUnderCap)
    }

    /// Ordered candidate list per the three rules in §4.6, most
    /// preferred first; `choose_target` walks this list until one clears
    /// the cap projection.
    fn candidate_targets(&self) -> Vec<u64> {
        let mut out = Vec::new();

        // Rule 1: any distrusted delegate within top(200) — vote against
        // the one with the highest (best) current rank.
        let top200 = self.ranking.top(200);
        let mut distrusted_in_top200: Vec<u64> = top200
            .iter()
            .filter(|id| self.trust.distrusted.contains(id))
            .copied()
            .collect();
        distrusted_in_top200.sort_by_key(|id| self.ranking.rank_of(*id).unwrap_or(usize::MAX));
        if let Some(&target) = distrusted_in_top200.first() {
            out.push(target);
            return out; // against-vote is the sole candidate for rule 1.
        }

        // Rule 2: the trusted delegate with the lowest (worst) current rank.
        let mut trusted_ranked: Vec<(u64, usize)> = self
            .trust
            .trusted
            .iter()
            .filter_map(|id| self.ranking.rank_of(*id).map(|r| (*id, r)))
            .collect();
        trusted_ranked.sort_by_key(|(_, rank)| std::cmp::Reverse(*rank));
        if let Some((target, _)) = trusted_ranked.first() {
            out.push(*target);
        }

        // Rule 3: observed delegate with the highest local score whose
        // net votes are under 1% of total supply.
        let one_percent = self.ledger.total_supply() as i128 / 100;
        let mut scored: Vec<(u64, f64)> = self
            .observer
            .scores()
            .into_iter()
            .filter(|(id, _)| self.ledger.net(*id) < one_percent)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        out.extend(scored.into_iter().map(|(id, _)| id));

        out
    }

    /// Against-vote variant of [`choose_target`] for rule 1: when the
    /// chosen candidate comes from the distrust list, the vote polarity
    /// is negative rather than positive.
    pub fn target_polarity(&self, target: u64) -> DelegateId {
        let top200 = self.ranking.top(200);
        if self.trust.distrusted.contains(&target) && top200.contains(&target) {
            DelegateId::against(target)
        } else {
            DelegateId::supporting(target)
        }
    }

    /// Selects inputs from `available` per §4.6's three input rules:
    /// distrusted-voting outputs first, then oldest-first among the
    /// rest, with any output older than `refresh_age` proactively
    /// included regardless of distrust.
    pub fn select_inputs<'o>(
        &self,
        available: &'o [UnspentOutput],
        current_height: Height,
        refresh_age: Height,
        needed: Amount,
    ) -> Vec<&'o UnspentOutput> {
        let is_distrusted = |o: &UnspentOutput| !o.vote.is_none() && self.trust.distrusted.contains(&o.vote.magnitude());
        let is_stale = |o: &UnspentOutput| current_height.saturating_sub(o.age) > refresh_age;

        let mut priority: Vec<&UnspentOutput> = available.iter().filter(|o| is_distrusted(o) || is_stale(o)).collect();
        let mut rest: Vec<&UnspentOutput> = available
            .iter()
            .filter(|o| !is_distrusted(o) && !is_stale(o))
            .collect();
        rest.sort_by_key(|o| o.age);

        priority.append(&mut rest);

        let mut total: Amount = 0;
        let mut chosen = Vec::new();
        for output in priority {
            if total >= needed {
                break;
            }
            total += output.amount;
            chosen.push(output);
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClaimName, DelegateRegistry};

    fn output(id: u64, amount: Amount, vote: DelegateId, age: Height) -> UnspentOutput {
        UnspentOutput {
            id,
            owner: "w".to_string(),
            amount,
            vote,
            age,
        }
    }

    fn seed(ids: &[(u64, &str)]) -> (DelegateRegistry, VoteLedger, RankedDelegates) {
        let mut registry = DelegateRegistry::new();
        for (id, name) in ids {
            registry
                .register(
                    &ClaimName {
                        delegate_id: *id,
                        name: name.to_string(),
                        data: vec![],
                        fee_paid: 0,
                    },
                    0,
                    0,
                    1_000_000,
                )
                .unwrap();
        }
        let ledger = VoteLedger::new(1_000_000, 200);
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        (registry, ledger, ranking)
    }

    #[test]
    fn distrust_driven_input_selection_scenario() {
        // Scenario 3: outputs vote A, A, B; distrusted = {A}; both
        // A-voting outputs are consumed before B's.
        let (registry, ledger, ranking) = seed(&[(1, "a"), (2, "b")]);
        let observer = ScoreObserver::new();
        let mut trust = TrustConfig::default();
        trust.distrusted.insert(1);
        let voter = WalletVoter {
            ledger: &ledger,
            ranking: &ranking,
            observer: &observer,
            trust: &trust,
        };
        let outputs = vec![
            output(1, 100, DelegateId::supporting(1), 0),
            output(2, 100, DelegateId::supporting(1), 0),
            output(3, 100, DelegateId::supporting(2), 0),
        ];
        let chosen = voter.select_inputs(&outputs, 0, 1_000_000, 150);
        assert_eq!(chosen.len(), 2);
        assert!(chosen.iter().all(|o| o.vote.magnitude() == 1));
        let _ = registry;
    }

    #[test]
    fn low_rank_trusted_target_scenario() {
        // Scenario 4: trusted = {T1@rank5, T2@rank80}; T2 (worse rank) wins.
        let mut registry = DelegateRegistry::new();
        let mut ledger = VoteLedger::new(1_000_000, 200);
        for i in 0..90u64 {
            registry
                .register(
                    &ClaimName {
                        delegate_id: i + 1,
                        name: format!("d{i}"),
                        data: vec![],
                        fee_paid: 0,
                    },
                    0,
                    0,
                    1_000_000,
                )
                .unwrap();
            // higher ids get fewer votes so lower ids rank higher.
            let amount = 1000 - i;
            let out = output(100 + i, amount, DelegateId::supporting(i + 1), 0);
            ledger.apply_batch(&[], &[out], &registry).unwrap();
        }
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        let t1 = ranking.all()[5];
        let t2 = ranking.all()[80];
        assert_eq!(ranking.rank_of(t1), Some(5));
        assert_eq!(ranking.rank_of(t2), Some(80));

        let observer = ScoreObserver::new();
        let mut trust = TrustConfig::default();
        trust.trusted.insert(t1);
        trust.trusted.insert(t2);
        let voter = WalletVoter {
            ledger: &ledger,
            ranking: &ranking,
            observer: &observer,
            trust: &trust,
        };
        let target = voter.candidate_targets();
        assert_eq!(target.first().copied(), Some(t2));
    }

    #[test]
    fn distrusted_in_top200_takes_priority_over_trusted() {
        let (_, ledger, ranking) = seed(&[(1, "a"), (2, "b")]);
        let observer = ScoreObserver::new();
        let mut trust = TrustConfig::default();
        trust.distrusted.insert(1);
        trust.trusted.insert(2);
        let voter = WalletVoter {
            ledger: &ledger,
            ranking: &ranking,
            observer: &observer,
            trust: &trust,
        };
        assert_eq!(voter.candidate_targets().first(), Some(&1));
        assert!(voter.target_polarity(1).is_opposing());
    }
}
