//! Delegate Registry (C2).
//!
//! Tracks delegate identities, names, auxiliary data, and registration
//! expiry. Registration is driven by a [`ClaimName`] transaction output;
//! renewal and resignation mutate an existing entry. Entries are
//! garbage-collected only once resigned *and* unreferenced by any
//! unspent output — the registry itself does not know about outputs, so
//! that final GC step is the coordinator's job (it asks the vote ledger
//! first).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{Amount, Height};

/// Bounded character set for delegate names: lowercase ascii, digits,
/// `-`/`_`, 3-32 bytes (§4.2's "bounded character set", resolved in
/// SPEC_FULL.md §4.2).
pub fn is_valid_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 32 {
        return false;
    }
    name.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Rolling window of non-fee block revenue, feeding the renewal/registration
/// fee (§4.2) and the fee cap (§4.7). Bounded at `REVENUE_WINDOW` entries;
/// averages over however many blocks have been recorded so far before the
/// window fills (SPEC_FULL.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueWindow {
    capacity: usize,
    samples: std::collections::VecDeque<Amount>,
}

impl RevenueWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: std::collections::VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, revenue: Amount) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(revenue);
    }

    /// Mean revenue over the recorded window, or 0 if nothing recorded yet.
    pub fn mean(&self) -> Amount {
        if self.samples.is_empty() {
            return 0;
        }
        let total: u128 = self.samples.iter().map(|&a| a as u128).sum();
        (total / self.samples.len() as u128) as Amount
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A registered delegate's identity and lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub id: u64,
    pub name: String,
    pub data: Vec<u8>,
    pub registered_at: Height,
    pub expires_at: Height,
    pub resigned: bool,
}

impl Delegate {
    /// Eligible for ranking/votes: not resigned, and not expired as of
    /// `current_height` (I5 — expired entries are treated as resigned
    /// for ranking even though their past votes keep tallying).
    pub fn is_eligible(&self, current_height: Height) -> bool {
        !self.resigned && self.expires_at > current_height
    }
}

/// The `ClaimName` transaction output that drives registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimName {
    pub delegate_id: u64,
    pub name: String,
    pub data: Vec<u8>,
    /// Fee burned by the registering transaction.
    pub fee_paid: Amount,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("delegate id {0} is already registered")]
    IdTaken(u64),
    #[error("name '{0}' is already registered")]
    NameTaken(String),
    #[error("name '{0}' does not conform to the bounded character set")]
    InvalidName(String),
    #[error("registration fee {paid} is below the required {required}")]
    InsufficientFee { paid: Amount, required: Amount },
    #[error("delegate {0} is not registered")]
    NotFound(u64),
    #[error("delegate {0} has already resigned")]
    AlreadyResigned(u64),
    #[error("delegate {0} was renewed less than one year ago")]
    RenewalTooSoon(u64),
    #[error("delegate {0} still holds votes on unspent outputs and cannot be garbage-collected")]
    StillReferenced(u64),
}

/// Registry of delegate identities, keyed by id with a secondary unique
/// index on name (I3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegateRegistry {
    by_id: HashMap<u64, Delegate>,
    name_index: HashMap<String, u64>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&Delegate> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Delegate> {
        self.by_id.values()
    }

    /// Registers a new delegate from a `ClaimName` output. `delegate_id
    /// == 0` is rejected here — spec.md §4.2 says id 0 means "registered
    /// but ineligible for votes", which in this model is represented by
    /// `resigned = true` at creation rather than a zero id (ids must stay
    /// globally unique per I3, and 0 is the universal sentinel).
    pub fn register(
        &mut self,
        claim: &ClaimName,
        required_fee: Amount,
        current_height: Height,
        expiry_period: Height,
    ) -> Result<(), RegistryError> {
        if !is_valid_name(&claim.name) {
            return Err(RegistryError::InvalidName(claim.name.clone()));
        }
        if self.by_id.contains_key(&claim.delegate_id) {
            return Err(RegistryError::IdTaken(claim.delegate_id));
        }
        if self.name_index.contains_key(&claim.name) {
            return Err(RegistryError::NameTaken(claim.name.clone()));
        }
        if claim.fee_paid < required_fee {
            return Err(RegistryError::InsufficientFee {
                paid: claim.fee_paid,
                required: required_fee,
            });
        }
        let ineligible = claim.delegate_id == 0;
        let delegate = Delegate {
            id: claim.delegate_id,
            name: claim.name.clone(),
            data: claim.data.clone(),
            registered_at: current_height,
            expires_at: current_height + expiry_period,
            resigned: ineligible,
        };
        self.name_index.insert(delegate.name.clone(), delegate.id);
        self.by_id.insert(delegate.id, delegate);
        Ok(())
    }

    /// Renews a delegate's registration, bumping `expires_at`. Callers
    /// compute `required_fee` beforehand (zero if the delegate was in the
    /// top 100 at month 11, the full fee otherwise — see
    /// [`crate::registry::renewal_fee`]) and pass the amount actually paid.
    pub fn renew(
        &mut self,
        id: u64,
        paid_fee: Amount,
        required_fee: Amount,
        current_height: Height,
        expiry_period: Height,
    ) -> Result<(), RegistryError> {
        let delegate = self.by_id.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if delegate.resigned {
            return Err(RegistryError::AlreadyResigned(id));
        }
        if paid_fee < required_fee {
            return Err(RegistryError::InsufficientFee {
                paid: paid_fee,
                required: required_fee,
            });
        }
        delegate.expires_at = current_height + expiry_period;
        Ok(())
    }

    /// Marks a delegate as resigned. The delegate becomes ineligible for
    /// ranking immediately; any votes still on unspent outputs remain
    /// "stuck" until spent (I5, SPEC_FULL.md §9).
    pub fn resign(&mut self, id: u64) -> Result<(), RegistryError> {
        let delegate = self.by_id.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        if delegate.resigned {
            return Err(RegistryError::AlreadyResigned(id));
        }
        delegate.resigned = true;
        Ok(())
    }

    /// Garbage-collects a resigned, unreferenced delegate. `has_votes`
    /// is supplied by the caller (checked against the vote ledger) since
    /// the registry has no knowledge of outputs.
    pub fn garbage_collect(&mut self, id: u64, has_votes: bool) -> Result<(), RegistryError> {
        let delegate = self.by_id.get(&id).ok_or(RegistryError::NotFound(id))?;
        if !delegate.resigned {
            return Err(RegistryError::AlreadyResigned(id)); // not yet resigned
        }
        if has_votes {
            return Err(RegistryError::StillReferenced(id));
        }
        let delegate = self.by_id.remove(&id).unwrap();
        self.name_index.remove(&delegate.name);
        Ok(())
    }
}

impl crate::vote_ledger::DelegateEligibility for DelegateRegistry {
    fn vote_target_status(&self, magnitude: u64) -> crate::vote_ledger::VoteTargetStatus {
        use crate::vote_ledger::VoteTargetStatus;
        match self.by_id.get(&magnitude) {
            Some(delegate) if delegate.resigned => VoteTargetStatus::Resigned,
            Some(_) => VoteTargetStatus::Eligible,
            None => VoteTargetStatus::Unknown,
        }
    }
}

/// Registration/renewal fee: 100x the rolling average per-block revenue
/// (§4.2), or zero for a renewal from a delegate that held a top-100
/// rank at month 11 of its term.
pub fn registration_fee(revenue_window: &RevenueWindow) -> Amount {
    revenue_window.mean().saturating_mul(100)
}

pub fn renewal_fee(revenue_window: &RevenueWindow, was_top_100_at_month_11: bool) -> Amount {
    if was_top_100_at_month_11 {
        0
    } else {
        registration_fee(revenue_window)
    }
}
