//! Slot Scheduler (C4).
//!
//! Deterministic mapping from UTC instants to the delegate authorized to
//! produce the next block. Ported from the teacher's
//! `ConsensusState::advance_slot`/`Consensus::run_slot_leadership` wall-
//! clock loop, replacing Ouroboros Praos's probabilistic leader check
//! with the spec's deterministic `top(100)[slot mod 100]` rule.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

use crate::ids::UnixSeconds;
use crate::ranking::RankedDelegates;
use crate::tracing::tracers::{TraceEvent, Tracer};

pub const ROUND_SIZE: u64 = 100;

/// One 100-slot round, identified by its first slot number.
pub fn round_base(slot: u64) -> u64 {
    (slot / ROUND_SIZE) * ROUND_SIZE
}

pub fn slot_at(now: UnixSeconds, block_interval_secs: u64) -> u64 {
    now / block_interval_secs
}

/// Computes the next slot at which the delegate holding rank `r` (within
/// `top(100)`) is authorized to produce, per §4.4's algorithm:
///
/// ```text
/// slot_now   = floor(utc_now / BLOCK_INTERVAL)
/// round_base = floor(slot_now / 100) * 100
/// produce_slot = round_base + r
/// if produce_slot * BLOCK_INTERVAL <= utc_now: produce_slot += 100
/// ```
pub fn next_produce_slot(utc_now: UnixSeconds, block_interval_secs: u64, rank: usize) -> u64 {
    let slot_now = slot_at(utc_now, block_interval_secs);
    let mut produce_slot = round_base(slot_now) + rank as u64;
    // Strict `<`, not `<=`: a produce time exactly at `utc_now` has not yet
    // elapsed (per spec.md §8 Scenario 2, rank 0 at utc_now = 1,000,000
    // schedules produce_time = 1,000,000, not the following round).
    if produce_slot * block_interval_secs < utc_now {
        produce_slot += ROUND_SIZE;
    }
    produce_slot
}

pub fn produce_time(produce_slot: u64, block_interval_secs: u64) -> UnixSeconds {
    produce_slot * block_interval_secs
}

/// The delegate id (if any) authorized to produce at `slot`, given the
/// ranking as of the end of the previous block.
pub fn producer_at_slot(ranking: &RankedDelegates, slot: u64) -> Option<u64> {
    let rank = (slot % ROUND_SIZE) as usize;
    ranking.top(ROUND_SIZE as usize).get(rank).copied()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("block for slot {slot} arrived more than one round late (current slot {current_slot})")]
    TooLate { slot: u64, current_slot: u64 },
    #[error("block for slot {slot} is signed by {signer}, expected producer {expected}")]
    WrongProducer { slot: u64, signer: u64, expected: u64 },
}

/// Validates that a received block's slot is within the acceptance
/// window: future slots are buffered by the caller, anything more than
/// one full round (`ROUND_SIZE` slots) late is discarded.
pub fn accept_slot(block_slot: u64, current_slot: u64) -> Result<(), SchedulerError> {
    if block_slot + ROUND_SIZE < current_slot {
        return Err(SchedulerError::TooLate {
            slot: block_slot,
            current_slot,
        });
    }
    Ok(())
}

/// Per-delegate scheduling state for a wallet producing under one
/// identity; a wallet holding multiple identities runs one of these per
/// identity (§4.4).
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    pub delegate_id: u64,
    pub block_interval_secs: u64,
}

impl SlotSchedule {
    pub fn new(delegate_id: u64, block_interval_secs: u64) -> Self {
        Self {
            delegate_id,
            block_interval_secs,
        }
    }

    /// Re-derives the next produce slot/time for this identity given the
    /// current ranking and wall clock. Returns `None` if the identity is
    /// not currently ranked in `top(100)`.
    pub fn next_slot(&self, ranking: &RankedDelegates, utc_now: UnixSeconds) -> Option<(u64, UnixSeconds)> {
        let rank = ranking.rank_of(self.delegate_id).filter(|r| *r < ROUND_SIZE as usize)?;
        let slot = next_produce_slot(utc_now, self.block_interval_secs, rank);
        Some((slot, produce_time(slot, self.block_interval_secs)))
    }

    /// Drives the wait-then-wake loop: sleeps until (approximately) the
    /// next produce time, tolerating early/late timer firings by
    /// re-deriving `produce_slot` from the ranking snapshot on every
    /// wakeup rather than trusting elapsed-tick counters (§5).
    ///
    /// `on_produce` is invoked once per wakeup where this identity is
    /// still the scheduled producer at the re-derived slot; it returns
    /// `true` to keep scheduling, `false` to stop (e.g. the wallet
    /// stopped producing or the delegate fell out of top 100).
    pub async fn run<F, Fut>(&self, mut fetch_ranking: F, tracer: &Tracer, mut on_produce: impl FnMut(u64) -> Fut)
    where
        F: FnMut() -> RankedDelegates,
        Fut: std::future::Future<Output = bool>,
    {
        loop {
            let ranking = fetch_ranking();
            let now = crate::clock::unix_now();
            let Some((slot, when)) = self.next_slot(&ranking, now) else {
                tracer.trace(TraceEvent::SchedulerStopped(self.delegate_id));
                return;
            };
            let wait = when.saturating_sub(now);
            sleep(Duration::from_secs(wait)).await;
            tracer.trace(TraceEvent::SchedulerWakeup(self.delegate_id, slot));
            if !on_produce(slot).await {
                return;
            }
        }
    }
}

/// Bounded buffer of future-slot blocks, keyed by slot number, awaiting
/// their turn to be applied once the chain reaches that slot.
#[derive(Debug, Default)]
pub struct FutureBlockBuffer<B> {
    pending: BTreeMap<u64, B>,
}

impl<B> FutureBlockBuffer<B> {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, slot: u64, block: B) {
        self.pending.insert(slot, block);
    }

    /// Drops everything more than one round behind `current_slot`.
    pub fn evict_stale(&mut self, current_slot: u64) {
        self.pending.retain(|&slot, _| slot + ROUND_SIZE >= current_slot);
    }

    pub fn take_ready(&mut self, current_slot: u64) -> Option<(u64, B)> {
        let slot = *self.pending.range(..=current_slot).next_back()?.0;
        self.pending.remove(&slot).map(|b| (slot, b))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
