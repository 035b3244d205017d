//! YAML config file layer, above defaults and below env/cli.

use std::path::Path;

use crate::configuration::error::ConfigError;
use crate::configuration::types::Configuration;

/// Partial configuration as read from a file: every field optional so a
/// file only needs to name what it overrides.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PartialConfiguration {
    pub block_interval_secs: Option<u64>,
    pub vote_cap_bp: Option<u32>,
    pub fee_cap_fraction_bp: Option<u32>,
    pub revenue_window: Option<usize>,
    pub total_supply: Option<u64>,
    pub snapshot_dir: Option<String>,
    pub log_filter: Option<String>,
}

pub async fn load(path: &Path) -> Result<PartialConfiguration, ConfigError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn apply(partial: &PartialConfiguration, config: &mut Configuration) {
    if let Some(v) = partial.block_interval_secs {
        config.block_interval_secs = v;
    }
    if let Some(v) = partial.vote_cap_bp {
        config.vote_cap_bp = v;
    }
    if let Some(v) = partial.fee_cap_fraction_bp {
        config.fee_cap_fraction_bp = v;
    }
    if let Some(v) = partial.revenue_window {
        config.revenue_window = v;
    }
    if let Some(v) = partial.total_supply {
        config.total_supply = v;
    }
    if let Some(v) = &partial.snapshot_dir {
        config.persistence.snapshot_dir = v.clone();
    }
    if let Some(v) = &partial.log_filter {
        config.logging.env_filter = v.clone();
    }
}
