//! CLI overrides, highest precedence. Uses `#[derive(Parser)]`
//! throughout — the teacher's own `sources/cli.rs` mixed in the old
//! clap 2.x builder API even though its `Cargo.toml` declares
//! `clap = { features = ["derive"] }`; this rewrites the surface with
//! the derive macro so it actually matches the declared dependency.

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dpos-node", about = "Delegated proof-of-stake consensus core")]
pub struct CliArgs {
    /// Path to a YAML configuration file.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long)]
    pub block_interval_secs: Option<u64>,

    #[arg(long)]
    pub vote_cap_bp: Option<u32>,

    #[arg(long)]
    pub fee_cap_fraction_bp: Option<u32>,

    #[arg(long)]
    pub revenue_window: Option<usize>,

    #[arg(long)]
    pub total_supply: Option<u64>,

    #[arg(long)]
    pub snapshot_dir: Option<String>,

    #[arg(long)]
    pub log_filter: Option<String>,
}

impl CliArgs {
    pub fn apply(&self, config: &mut super::super::types::Configuration) {
        if let Some(v) = self.block_interval_secs {
            config.block_interval_secs = v;
        }
        if let Some(v) = self.vote_cap_bp {
            config.vote_cap_bp = v;
        }
        if let Some(v) = self.fee_cap_fraction_bp {
            config.fee_cap_fraction_bp = v;
        }
        if let Some(v) = self.revenue_window {
            config.revenue_window = v;
        }
        if let Some(v) = self.total_supply {
            config.total_supply = v;
        }
        if let Some(v) = &self.snapshot_dir {
            config.persistence.snapshot_dir = v.clone();
        }
        if let Some(v) = &self.log_filter {
            config.logging.env_filter = v.clone();
        }
    }
}
