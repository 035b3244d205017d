//! Environment-variable overrides, between file and cli in precedence.
//! Every variable is prefixed `DPOS_` and named after its field.

use crate::configuration::types::Configuration;

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

pub fn apply(config: &mut Configuration) {
    if let Some(v) = parse_env::<u64>("DPOS_BLOCK_INTERVAL_SECS") {
        config.block_interval_secs = v;
    }
    if let Some(v) = parse_env::<u32>("DPOS_VOTE_CAP_BP") {
        config.vote_cap_bp = v;
    }
    if let Some(v) = parse_env::<u32>("DPOS_FEE_CAP_FRACTION_BP") {
        config.fee_cap_fraction_bp = v;
    }
    if let Some(v) = parse_env::<usize>("DPOS_REVENUE_WINDOW") {
        config.revenue_window = v;
    }
    if let Some(v) = parse_env::<u64>("DPOS_TOTAL_SUPPLY") {
        config.total_supply = v;
    }
    if let Ok(v) = std::env::var("DPOS_SNAPSHOT_DIR") {
        config.persistence.snapshot_dir = v;
    }
    if let Ok(v) = std::env::var("DPOS_LOG_FILTER") {
        config.logging.env_filter = v;
    }
}
