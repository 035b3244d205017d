//! Configuration value types, layered cli > env > file > defaults
//! (`mod.rs`) the way the teacher's `configuration.rs` layers its `Cli`/
//! `Config` pair, generalized from Cardano network parameters to this
//! spec's §6 "Network constants".

use serde::{Deserialize, Serialize};

use crate::coordinator::NetworkConstants;
use crate::ids::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub renewal_period_blocks: u64,
    pub renewal_grace_blocks: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            renewal_period_blocks: 3_153_600,
            renewal_grace_blocks: 259_200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub env_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub snapshot_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "./data/snapshots".to_string(),
        }
    }
}

/// Fully resolved configuration, after cli/env/file/defaults have been
/// merged and validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub block_interval_secs: u64,
    pub vote_cap_bp: u32,
    pub fee_cap_fraction_bp: u32,
    pub revenue_window: usize,
    pub timestamp_tolerance_secs: u64,
    pub total_supply: Amount,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
    pub persistence: PersistenceConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            block_interval_secs: 10,
            vote_cap_bp: 200,
            fee_cap_fraction_bp: 1_000,
            revenue_window: 100,
            timestamp_tolerance_secs: 10,
            total_supply: 45_000_000_000,
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Configuration {
    pub fn network_constants(&self) -> NetworkConstants {
        NetworkConstants {
            block_interval_secs: self.block_interval_secs,
            vote_cap_bp: self.vote_cap_bp,
            renewal_period_blocks: self.registry.renewal_period_blocks,
            renewal_grace_blocks: self.registry.renewal_grace_blocks,
            fee_cap_fraction_bp: self.fee_cap_fraction_bp,
            revenue_window: self.revenue_window,
            timestamp_tolerance_secs: self.timestamp_tolerance_secs,
        }
    }
}
