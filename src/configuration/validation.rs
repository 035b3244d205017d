use super::error::ConfigError;
use super::types::Configuration;

/// Rejects a configuration that would make the rest of the core
/// misbehave silently (zero intervals, an impossible fee cap, etc.)
/// before it's ever handed to a `Coordinator`.
pub fn validate(config: &Configuration) -> Result<(), ConfigError> {
    if config.block_interval_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "block_interval_secs",
            reason: "must be non-zero".to_string(),
        });
    }
    if config.vote_cap_bp == 0 || config.vote_cap_bp > 10_000 {
        return Err(ConfigError::Invalid {
            field: "vote_cap_bp",
            reason: "must be between 1 and 10000".to_string(),
        });
    }
    if config.fee_cap_fraction_bp > 10_000 {
        return Err(ConfigError::Invalid {
            field: "fee_cap_fraction_bp",
            reason: "cannot exceed 10000 (100%)".to_string(),
        });
    }
    if config.revenue_window == 0 {
        return Err(ConfigError::Invalid {
            field: "revenue_window",
            reason: "must be non-zero".to_string(),
        });
    }
    if config.total_supply == 0 {
        return Err(ConfigError::Invalid {
            field: "total_supply",
            reason: "must be non-zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_block_interval() {
        let mut config = Configuration::default();
        config.block_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate(&Configuration::default()).is_ok());
    }
}
