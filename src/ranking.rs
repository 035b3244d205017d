//! Ranking Index (C3).
//!
//! An ordered view over every eligible delegate (registered, not
//! resigned, not expired), sorted by net votes descending with ties
//! broken by lower id then lexicographic name. Rebuilt from the vote
//! ledger + registry on every commit — the set of eligible delegates is
//! small enough (bounded by registration cost) that a full rebuild is
//! cheap relative to block application itself.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::registry::DelegateRegistry;
use crate::vote_ledger::VoteLedger;

/// One entry in the ranking, ordered by `(-net_votes, id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    neg_net_votes: Reverse<i128>,
    id: u64,
    name: String,
}

/// Sorted index over eligible delegates. Not authoritative for wallet
/// voting preference (§4.3) — wallets layer trust/distrust and local
/// score on top of this.
#[derive(Debug, Clone, Default)]
pub struct RankedDelegates {
    ordered: BTreeSet<RankKey>,
}

impl RankedDelegates {
    /// Rebuilds the index from the current ledger/registry state as of
    /// `current_height`.
    pub fn rebuild(ledger: &VoteLedger, registry: &DelegateRegistry, current_height: u64) -> Self {
        let mut ordered = BTreeSet::new();
        for delegate in registry.iter().filter(|d| d.is_eligible(current_height)) {
            let net = ledger.net(delegate.id);
            ordered.insert(RankKey {
                neg_net_votes: Reverse(net),
                id: delegate.id,
                name: delegate.name.clone(),
            });
        }
        Self { ordered }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// 0-indexed rank of `id`, or `None` if not currently eligible.
    pub fn rank_of(&self, id: u64) -> Option<usize> {
        self.ordered.iter().position(|key| key.id == id)
    }

    /// The first `n` delegate ids by rank.
    pub fn top(&self, n: usize) -> Vec<u64> {
        self.ordered.iter().take(n).map(|key| key.id).collect()
    }

    /// All ranked ids, in order.
    pub fn all(&self) -> Vec<u64> {
        self.ordered.iter().map(|key| key.id).collect()
    }
}
