//! Core identifiers and scalar types shared across the consensus core.
//!
//! `DelegateId` carries both a delegate's identity and the polarity of a
//! vote referencing it, as described in the data model: the magnitude
//! names the delegate, the sign says whether the referencing output
//! supports (+) or opposes (-) it. `0` is reserved and means "resigned /
//! ineligible".

use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed delegate reference: `magnitude` identifies the delegate,
/// `sign` is the vote polarity carried by whatever output references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DelegateId(i64);

impl DelegateId {
    /// The reserved sentinel meaning "no delegate" / "resigned".
    pub const NONE: DelegateId = DelegateId(0);

    /// Construct a positive (supporting) reference to `id`.
    ///
    /// # Panics
    /// Panics if `id` is zero or negative; use [`DelegateId::NONE`] for
    /// the sentinel and [`DelegateId::against`] for opposing votes.
    pub fn supporting(id: u64) -> Self {
        assert!(id > 0, "delegate id must be non-zero");
        DelegateId(id as i64)
    }

    /// Construct a negative (opposing) reference to `id`.
    ///
    /// # Panics
    /// Panics if `id` is zero.
    pub fn against(id: u64) -> Self {
        assert!(id > 0, "delegate id must be non-zero");
        DelegateId(-(id as i64))
    }

    /// The underlying delegate identity, independent of polarity.
    pub fn magnitude(self) -> u64 {
        self.0.unsigned_abs()
    }

    /// `true` if this reference supports the delegate (positive polarity).
    pub fn is_supporting(self) -> bool {
        self.0 > 0
    }

    /// `true` if this reference opposes the delegate (negative polarity).
    pub fn is_opposing(self) -> bool {
        self.0 < 0
    }

    /// `true` for the reserved "no delegate" sentinel.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Flip the polarity, keeping the same underlying delegate.
    pub fn flipped(self) -> Self {
        DelegateId(-self.0)
    }

    /// Raw signed value, as carried on the wire.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Reconstruct from a raw signed value (used when decoding transactions).
    pub fn from_raw(raw: i64) -> Self {
        DelegateId(raw)
    }
}

impl fmt::Display for DelegateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary amount, smallest denomination units.
pub type Amount = u64;

/// Chain height (block count since genesis).
pub type Height = u64;

/// Unix-epoch seconds, used for slot arithmetic.
pub type UnixSeconds = u64;
