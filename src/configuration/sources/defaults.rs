//! Lowest-precedence layer: re-exports the hard-coded defaults so
//! `sources::mod::load` can treat every layer uniformly.

pub use crate::configuration::defaults::defaults;
