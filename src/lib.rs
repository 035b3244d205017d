//! A delegated proof-of-stake consensus core: vote accounting, delegate
//! registration, ranking, slot scheduling, local score observation,
//! wallet-side vote selection, and block validation.
//!
//! The core is logically single-writer, multiple-reader (see
//! [`coordinator::Coordinator`]): block application and registry
//! mutation are serialized through one path, while ranking/scheduling
//! reads proceed against the last committed snapshot.

pub mod block_validator;
pub mod clock;
pub mod configuration;
pub mod coordinator;
pub mod ids;
pub mod observer;
pub mod persistence;
pub mod ranking;
pub mod registry;
pub mod rpc;
pub mod scheduler;
pub mod tracing;
pub mod vote_ledger;
pub mod wallet;

pub use coordinator::{Coordinator, NetworkConstants};
pub use ids::{Amount, DelegateId, Height, UnixSeconds};
