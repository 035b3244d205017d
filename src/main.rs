use std::sync::Arc;

use clap::Parser;
use dpos_core::configuration::{self, sources::cli::CliArgs};
use dpos_core::tracing::{self, TraceEvent, Tracer};
use dpos_core::Coordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = configuration::load(cli).await?;

    let tracer = Tracer::new();
    tracing::init(&tracer, &config.logging.env_filter);
    tracer.trace(TraceEvent::Startup { version: env!("CARGO_PKG_VERSION") });
    tracer.trace(TraceEvent::ConfigLoaded { source: "cli+env+file+defaults" });

    let coordinator = Arc::new(Coordinator::new(
        config.network_constants(),
        config.total_supply,
        tracer.clone(),
    ));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => {
            tracer.trace(TraceEvent::Shutdown);
        }
    }

    let _ = coordinator.height().await;
    Ok(())
}
