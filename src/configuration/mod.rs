//! Layered configuration: cli overrides env overrides file overrides
//! defaults, validated before use (§10 of SPEC_FULL.md). Shape ported
//! from the teacher's `configuration/` layering, with `sources::cli`
//! rewritten onto the derive API (see that module's doc comment).

pub mod defaults;
pub mod error;
pub mod sources;
pub mod types;
pub mod validation;

pub use error::ConfigError;
pub use types::Configuration;

use sources::cli::CliArgs;

/// Resolves a fully validated [`Configuration`] from cli args, applying
/// file → env → cli in increasing precedence over the hard-coded
/// defaults.
pub async fn load(cli: CliArgs) -> Result<Configuration, ConfigError> {
    let mut config = defaults::defaults();

    if let Some(path) = &cli.config {
        let partial = sources::file::load(std::path::Path::new(path)).await?;
        sources::file::apply(&partial, &mut config);
    }

    sources::env::apply(&mut config);
    cli.apply(&mut config);

    validation::validate(&config)?;
    Ok(config)
}
