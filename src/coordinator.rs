//! Top-level coordinator: owns the single write path shared by C1-C3
//! and exposes snapshot reads that don't block on it, per §5's
//! single-writer/multiple-reader model. Grounded on `main.rs`'s
//! `Arc<tokio::sync::Mutex<Ledger>>` wiring, generalized into a reusable
//! type instead of a binary-local construction.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::block_validator::{self, CommitEffects, IncomingBlock, ValidationError};
use crate::ids::{Amount, Height};
use crate::observer::ScoreObserver;
use crate::ranking::RankedDelegates;
use crate::registry::{ClaimName, DelegateRegistry, RegistryError, RevenueWindow};
use crate::tracing::{TraceEvent, Tracer};
use crate::vote_ledger::VoteLedger;

/// Network-wide constants that parameterize validation and scheduling
/// (§6's "Network constants").
#[derive(Debug, Clone, Copy)]
pub struct NetworkConstants {
    pub block_interval_secs: u64,
    pub vote_cap_bp: u32,
    pub renewal_period_blocks: Height,
    /// Width of the "month 11" free-renewal window before `expires_at`,
    /// in blocks (§4.2).
    pub renewal_grace_blocks: Height,
    pub fee_cap_fraction_bp: u32,
    pub revenue_window: usize,
    pub timestamp_tolerance_secs: u64,
}

impl Default for NetworkConstants {
    fn default() -> Self {
        Self {
            block_interval_secs: 10,
            vote_cap_bp: 200,
            renewal_period_blocks: 3_153_600, // ~1 year at 10s blocks.
            renewal_grace_blocks: 259_200,    // ~1 month at 10s blocks.
            fee_cap_fraction_bp: 1_000,
            revenue_window: 100,
            timestamp_tolerance_secs: 10,
        }
    }
}

struct WriteState {
    height: Height,
    ledger: VoteLedger,
    registry: DelegateRegistry,
    revenue: RevenueWindow,
}

/// Owns C1/C2/C3/C5 state behind one write lock; readers take a cloned
/// snapshot of the ranking (`RwLock`) without contending with the
/// mutating path, matching §5's shared-resource rules.
pub struct Coordinator {
    constants: NetworkConstants,
    write: Mutex<WriteState>,
    ranking: RwLock<Arc<RankedDelegates>>,
    observer: Mutex<ScoreObserver>,
    tracer: Tracer,
}

impl Coordinator {
    pub fn new(constants: NetworkConstants, total_supply: Amount, tracer: Tracer) -> Self {
        let ledger = VoteLedger::new(total_supply, constants.vote_cap_bp);
        let registry = DelegateRegistry::new();
        let ranking = RankedDelegates::rebuild(&ledger, &registry, 0);
        Self {
            constants,
            write: Mutex::new(WriteState {
                height: 0,
                ledger,
                registry,
                revenue: RevenueWindow::new(constants.revenue_window),
            }),
            ranking: RwLock::new(Arc::new(ranking)),
            observer: Mutex::new(ScoreObserver::new()),
            tracer,
        }
    }

    /// A cheap, non-blocking snapshot of the current ranking for
    /// scheduler/wallet lookups.
    pub async fn ranking_snapshot(&self) -> Arc<RankedDelegates> {
        self.ranking.read().await.clone()
    }

    pub fn constants(&self) -> NetworkConstants {
        self.constants
    }

    /// Registers a new delegate, charging the revenue-derived fee.
    pub async fn register_delegate(&self, claim: ClaimName) -> Result<(), RegistryError> {
        let mut state = self.write.lock().await;
        let required = crate::registry::registration_fee(&state.revenue);
        let height = state.height;
        state
            .registry
            .register(&claim, required, height, self.constants.renewal_period_blocks)?;
        self.tracer.trace(TraceEvent::DelegateRegistered {
            id: claim.delegate_id,
            name: claim.name.clone(),
        });
        self.refresh_ranking(&state).await;
        Ok(())
    }

    pub async fn resign_delegate(&self, id: u64) -> Result<(), RegistryError> {
        let mut state = self.write.lock().await;
        state.registry.resign(id)?;
        self.tracer.trace(TraceEvent::DelegateResigned { id });
        self.refresh_ranking(&state).await;
        Ok(())
    }

    /// Renews `id`'s registration. The fee is zero only if `id` currently
    /// holds a top-100 rank *and* sits within the renewal-grace window
    /// before its current `expires_at` ("month 11" in §4.2's terms);
    /// otherwise the full revenue-derived registration fee applies.
    pub async fn renew_delegate(&self, id: u64, paid_fee: Amount) -> Result<(), RegistryError> {
        let mut state = self.write.lock().await;
        let delegate = state.registry.get(id).ok_or(RegistryError::NotFound(id))?;
        let in_grace_window = state.height + self.constants.renewal_grace_blocks >= delegate.expires_at;
        let is_top_100 = {
            let ranking = self.ranking.read().await;
            ranking.rank_of(id).is_some_and(|rank| rank < 100)
        };
        let required = crate::registry::renewal_fee(&state.revenue, in_grace_window && is_top_100);
        let height = state.height;
        state
            .registry
            .renew(id, paid_fee, required, height, self.constants.renewal_period_blocks)?;
        let expires_at = state.registry.get(id).expect("just renewed").expires_at;
        self.tracer.trace(TraceEvent::DelegateRenewed { id, expires_at });
        self.refresh_ranking(&state).await;
        Ok(())
    }

    /// Applies one incoming block end to end: validation, C1/C2/C3
    /// commit, and C5 update, all serialized through the write lock.
    pub async fn apply_block(&self, block: &IncomingBlock<'_>) -> Result<(), ValidationError> {
        let mut state = self.write.lock().await;
        let prev_ranking = self.ranking.read().await.clone();
        let mut observer = self.observer.lock().await;

        let result = block_validator::validate_and_apply(
            block,
            state.height,
            &prev_ranking,
            self.constants.block_interval_secs,
            self.constants.timestamp_tolerance_secs,
            state.revenue.mean(),
            self.constants.fee_cap_fraction_bp,
            &mut state.ledger,
            &mut state.registry,
            &mut observer,
        );
        let CommitEffects { new_ranking } = match result {
            Ok(effects) => effects,
            Err(err) => {
                observer.entry(block.producer).record_invalid_signed();
                self.tracer.trace(TraceEvent::BlockRejected {
                    height: block.height,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        state.height = block.height;
        state.revenue.record(block.block_revenue);
        *self.ranking.write().await = Arc::new(new_ranking);
        self.tracer.trace(TraceEvent::BlockAccepted {
            height: block.height,
            producer: block.producer,
        });
        Ok(())
    }

    async fn refresh_ranking(&self, state: &tokio::sync::MutexGuard<'_, WriteState>) {
        let rebuilt = RankedDelegates::rebuild(&state.ledger, &state.registry, state.height);
        let count = rebuilt.len();
        *self.ranking.write().await = Arc::new(rebuilt);
        self.tracer.trace(TraceEvent::RankingRebuilt { eligible_count: count });
    }

    pub async fn height(&self) -> Height {
        self.write.lock().await.height
    }

    /// Delegates that have resigned but whose votes haven't been spent
    /// yet, per the open-question resolution in SPEC_FULL.md §9: the
    /// ledger doesn't force a re-vote, so these stay "stuck" on their
    /// outputs until a wallet spends them. Cheap to derive from C1+C2,
    /// so it's exposed for whatever wallet UI wants to surface it.
    pub async fn stuck_votes(&self) -> Vec<u64> {
        let state = self.write.lock().await;
        state
            .registry
            .iter()
            .filter(|d| d.resigned)
            .filter(|d| {
                let bucket = state.ledger.bucket(d.id);
                bucket.positive > 0 || bucket.negative > 0
            })
            .map(|d| d.id)
            .collect()
    }

    /// Destroys `id`'s registry entry once it has resigned and no
    /// unspent output still references it — the same has-votes check
    /// [`Self::stuck_votes`] uses, driven here instead of merely reported.
    pub async fn garbage_collect_delegate(&self, id: u64) -> Result<(), RegistryError> {
        let mut state = self.write.lock().await;
        let bucket = state.ledger.bucket(id);
        let has_votes = bucket.positive > 0 || bucket.negative > 0;
        state.registry.garbage_collect(id, has_votes)?;
        self.tracer.trace(TraceEvent::DelegateGarbageCollected { id });
        self.refresh_ranking(&state).await;
        Ok(())
    }
}
