//! Structured logging. Pairs the custom [`tracers::Tracer`] event bus
//! with the `tracing`/`tracing-subscriber` crates: [`init`] installs a
//! subscriber and registers a default handler that re-emits every
//! [`tracers::TraceEvent`] as a `tracing` event, so operators get the
//! usual `RUST_LOG`-filterable output while internal code keeps
//! matching on typed event variants instead of parsing strings.

pub mod tracers;

pub use tracers::{TraceEvent, Tracer, TracingError};

/// Installs a global `tracing-subscriber` and wires a default handler
/// onto `tracer` that forwards every event into it. Safe to call once
/// per process; a second call is a no-op error from
/// `tracing_subscriber`, which this function swallows since a subscriber
/// already being installed isn't a failure condition worth propagating.
pub fn init(tracer: &Tracer, env_filter: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let _ = tracer.register_tracer(|event| match event {
        TraceEvent::BlockRejected { .. } | TraceEvent::CapRejected { .. } | TraceEvent::SlotMissed { .. } => {
            tracing::warn!(%event);
        }
        TraceEvent::Shutdown => tracing::info!(%event),
        _ => tracing::debug!(%event),
    });
}
